//! Button encoding as an `inline_keyboard` attachment.

use serde_json::{Value, json};

use switchboard_core::{Button, ButtonKind};

/// Encodes buttons as one keyboard row. Link buttons without a URL are
/// skipped.
pub fn inline_keyboard(buttons: &[Button]) -> Option<Value> {
    let row: Vec<Value> = buttons.iter().filter_map(encode).collect();
    if row.is_empty() {
        return None;
    }
    Some(json!({
        "type": "inline_keyboard",
        "payload": { "buttons": [row] },
    }))
}

fn encode(button: &Button) -> Option<Value> {
    let encoded = match button.kind {
        ButtonKind::Callback => json!({
            "type": "callback",
            "text": button.text,
            "payload": button.callback_data(),
        }),
        ButtonKind::Link => json!({
            "type": "link",
            "text": button.text,
            "url": button.url()?,
        }),
        ButtonKind::RequestContact => json!({ "type": "request_contact", "text": button.text }),
        ButtonKind::Location => json!({ "type": "request_geo_location", "text": button.text }),
    };
    Some(encoded)
}
