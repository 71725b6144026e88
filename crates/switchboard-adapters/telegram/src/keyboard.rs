//! Button encoding for `reply_markup`.

use serde_json::{Value, json};

use switchboard_core::{Button, ButtonKind};

/// Telegram accepts at most 64 bytes of callback data.
pub const MAX_CALLBACK_DATA: usize = 64;

/// Encodes buttons as a `reply_markup` object.
///
/// Callback and link buttons form a single inline row. Contact and location
/// requests form a one-time reply keyboard, used only when there are no
/// inline buttons, since a message carries one markup. Link buttons without
/// a URL are skipped.
pub fn reply_markup(buttons: &[Button]) -> Option<Value> {
    let mut inline = Vec::new();
    let mut reply = Vec::new();

    for button in buttons {
        match button.kind {
            ButtonKind::Callback => inline.push(json!({
                "text": button.text,
                "callback_data": callback_data(button),
            })),
            ButtonKind::Link => {
                if let Some(url) = button.url() {
                    inline.push(json!({ "text": button.text, "url": url }));
                }
            }
            ButtonKind::RequestContact => {
                reply.push(json!({ "text": button.text, "request_contact": true }));
            }
            ButtonKind::Location => {
                reply.push(json!({ "text": button.text, "request_location": true }));
            }
        }
    }

    if !inline.is_empty() {
        Some(json!({ "inline_keyboard": [inline] }))
    } else if !reply.is_empty() {
        Some(json!({
            "keyboard": [reply],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        }))
    } else {
        None
    }
}

/// Inline buttons only; edits cannot attach a reply keyboard.
pub fn inline_markup(buttons: &[Button]) -> Option<Value> {
    let markup = reply_markup(buttons)?;
    markup.get("inline_keyboard").is_some().then_some(markup)
}

/// The button's callback data cut to [`MAX_CALLBACK_DATA`] bytes on a
/// character boundary.
pub fn callback_data(button: &Button) -> String {
    let mut data = button.callback_data();
    if data.len() > MAX_CALLBACK_DATA {
        let mut end = MAX_CALLBACK_DATA;
        while !data.is_char_boundary(end) {
            end -= 1;
        }
        data.truncate(end);
    }
    data
}
