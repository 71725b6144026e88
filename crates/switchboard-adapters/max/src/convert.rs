//! Max update → canonical update.

use serde_json::Value;
use tracing::trace;

use switchboard_core::{
    AdapterError, AdapterResult, Callback, CallbackData, CanonicalUpdate, Chat, ChatType,
    Command, Contact, Location, MessageInfo, Sender, UpdatePayload,
};

use crate::model::{self, Attachment, ChatKind};

/// Converts one update.
///
/// `message_created` is a command, contact, location or text, in that
/// order of precedence. `message_callback` is a callback and `bot_started`
/// is a `start` command carrying the start payload. Other update types are
/// unsupported.
pub fn convert(update: model::Update, raw: Value) -> AdapterResult<CanonicalUpdate> {
    let converted = match update {
        model::Update::MessageCreated { message, .. } => convert_message(message)?,
        model::Update::MessageCallback {
            callback, message, ..
        } => convert_callback(callback, message)?,
        model::Update::BotStarted {
            timestamp,
            user,
            payload,
            ..
        } => convert_started(timestamp, &user, payload),
        model::Update::Other => {
            return Err(AdapterError::unsupported("update type is not routed"));
        }
    };

    trace!(kind = %converted.kind(), chat = %converted.chat.id, "converted max update");
    Ok(converted.with_raw(raw))
}

fn convert_message(message: model::Message) -> AdapterResult<CanonicalUpdate> {
    let from = message
        .sender
        .as_ref()
        .ok_or_else(|| AdapterError::unsupported("message without a sender"))?;
    let text = message.body.text.as_deref();

    let payload = if let Some(command) = text.and_then(Command::parse) {
        UpdatePayload::Command(command)
    } else if let Some(card) = message.body.attachments.iter().find_map(contact_payload) {
        UpdatePayload::Contact(contact(card, from)?)
    } else if let Some(location) = message.body.attachments.iter().find_map(location_attachment) {
        UpdatePayload::Location(location)
    } else {
        UpdatePayload::Text
    };

    Ok(CanonicalUpdate::new(sender(from), chat(&message, from), payload)
        .with_message(message_info(&message)))
}

fn convert_callback(
    callback: model::Callback,
    message: Option<model::Message>,
) -> AdapterResult<CanonicalUpdate> {
    let data = callback
        .payload
        .as_deref()
        .ok_or_else(|| AdapterError::unsupported("callback without payload"))?;
    let payload = UpdatePayload::Callback(Callback {
        id: Some(callback.callback_id.clone()),
        data: CallbackData::parse(data),
    });

    let Some(message) = message else {
        let chat = Chat::new(callback.user.user_id).with_kind(ChatType::Private);
        return Ok(CanonicalUpdate::new(sender(&callback.user), chat, payload));
    };
    Ok(
        CanonicalUpdate::new(sender(&callback.user), chat(&message, &callback.user), payload)
            .with_message(message_info(&message)),
    )
}

/// `bot_started` has no message; the update time stands in for its id.
fn convert_started(timestamp: i64, user: &model::User, payload: Option<String>) -> CanonicalUpdate {
    let payload = payload.filter(|p| !p.is_empty());
    let text = match &payload {
        Some(value) => format!("/start {value}"),
        None => "/start".to_owned(),
    };
    let chat = Chat::new(user.user_id).with_kind(ChatType::Private);

    CanonicalUpdate::new(
        sender(user),
        chat,
        UpdatePayload::Command(Command::new("start", payload)),
    )
    .with_message(MessageInfo::new(timestamp, timestamp / 1000).with_text(text))
}

fn contact_payload(attachment: &Attachment) -> Option<&model::ContactPayload> {
    match attachment {
        Attachment::Contact { payload } => Some(payload),
        _ => None,
    }
}

fn contact(card: &model::ContactPayload, from: &model::User) -> AdapterResult<Contact> {
    let phone = card
        .phone()
        .ok_or_else(|| AdapterError::unsupported("contact without a phone number"))?;
    let owner = card.max_info.as_ref();
    Ok(Contact {
        phone: phone.to_owned(),
        is_own: owner.is_some_and(|user| user.user_id == from.user_id),
        first_name: owner.and_then(|user| user.first_name.clone()),
        user_id: owner.map(|user| user.user_id.into()),
    })
}

fn location_attachment(attachment: &Attachment) -> Option<Location> {
    match *attachment {
        Attachment::Location {
            latitude,
            longitude,
        } => Some(Location {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

fn sender(user: &model::User) -> Sender {
    Sender {
        id: user.user_id.into(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        is_bot: Some(user.is_bot),
    }
}

/// Dialogs are addressed by the user, group chats and channels by their
/// (negative) chat id.
fn chat(message: &model::Message, from: &model::User) -> Chat {
    let recipient = &message.recipient;
    match recipient.chat_type {
        ChatKind::Dialog => Chat::new(from.user_id).with_kind(ChatType::Private),
        ChatKind::Chat => Chat::new(recipient.chat_id.unwrap_or(from.user_id))
            .with_kind(ChatType::Group),
        ChatKind::Channel => Chat::new(recipient.chat_id.unwrap_or(from.user_id))
            .with_kind(ChatType::Channel),
    }
}

fn message_info(message: &model::Message) -> MessageInfo {
    let info = MessageInfo::new(message.body.mid.clone(), message.timestamp / 1000);
    match &message.body.text {
        Some(text) => info.with_text(text.clone()),
        None => info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use switchboard_core::{ChatId, MessageId, UpdateKind};

    fn created(chat_type: &str, chat_id: i64, body: Value) -> Value {
        json!({
            "update_type": "message_created",
            "timestamp": 1_700_000_000_123_i64,
            "message": {
                "sender": {"user_id": 7, "first_name": "Ann", "is_bot": false},
                "recipient": {"chat_id": chat_id, "chat_type": chat_type},
                "timestamp": 1_700_000_000_123_i64,
                "body": body
            }
        })
    }

    fn parse(raw: Value) -> AdapterResult<CanonicalUpdate> {
        let update = serde_json::from_value(raw.clone())?;
        convert(update, raw)
    }

    #[test]
    fn test_dialog_text() {
        let update = parse(created("dialog", 555, json!({"mid": "mid.1", "text": "hello"}))).unwrap();
        assert_eq!(update.kind(), UpdateKind::Text);
        assert_eq!(update.chat.id, ChatId::from(7));
        assert_eq!(update.chat.kind, Some(ChatType::Private));

        let message = update.message.as_ref().unwrap();
        assert_eq!(message.id, MessageId::from("mid.1"));
        assert_eq!(message.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_group_command() {
        let update =
            parse(created("chat", -1001, json!({"mid": "m", "text": "/price gold"}))).unwrap();
        let command = update.command().unwrap();
        assert_eq!((command.name.as_str(), command.value.as_deref()), ("price", Some("gold")));
        assert_eq!(update.chat.id, ChatId::from(-1001));
        assert_eq!(update.chat.kind, Some(ChatType::Group));
    }

    #[test]
    fn test_contact_attachment() {
        let body = json!({
            "mid": "m",
            "attachments": [
                {"type": "image", "payload": {"url": "https://x"}},
                {"type": "contact", "payload": {
                    "vcf_info": "BEGIN:VCARD\nTEL:+100\nEND:VCARD",
                    "max_info": {"user_id": 7, "first_name": "Ann"}
                }}
            ]
        });
        let update = parse(created("dialog", 1, body)).unwrap();
        let contact = update.contact().unwrap();
        assert_eq!(contact.phone, "+100");
        assert!(contact.is_own);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_location_attachment() {
        let body = json!({
            "mid": "m",
            "attachments": [{"type": "location", "latitude": 59.93, "longitude": 30.33}]
        });
        let update = parse(created("dialog", 1, body)).unwrap();
        assert_eq!(update.location().unwrap().longitude, 30.33);
    }

    #[test]
    fn test_callback() {
        let raw = json!({
            "update_type": "message_callback",
            "timestamp": 1,
            "callback": {"callback_id": "c1", "payload": "menu:open", "user": {"user_id": 9}},
            "message": {
                "recipient": {"chat_id": -5, "chat_type": "chat"},
                "timestamp": 1000,
                "body": {"mid": "m2", "text": "Menu"}
            }
        });
        let update = parse(raw).unwrap();
        assert_eq!(update.callback().unwrap().data.action().as_deref(), Some("menu:open"));
        assert_eq!(update.chat.id, ChatId::from(-5));
        assert_eq!(update.sender.id, ChatId::from(9));
    }

    #[test]
    fn test_bot_started_is_start_command() {
        let raw = json!({
            "update_type": "bot_started",
            "timestamp": 1_700_000_000_000_i64,
            "chat_id": 12,
            "user": {"user_id": 7},
            "payload": "ref=promo"
        });
        let update = parse(raw).unwrap();
        let command = update.command().unwrap();
        assert_eq!(command.name, "start");
        assert_eq!(command.value.as_deref(), Some("ref=promo"));
        assert_eq!(update.text(), Some("/start ref=promo"));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_image_is_text_without_text() {
        let body = json!({
            "mid": "m",
            "attachments": [{"type": "image", "payload": {"url": "https://x"}}]
        });
        let update = parse(created("dialog", 1, body)).unwrap();
        assert_eq!(update.kind(), UpdateKind::Text);
        assert_eq!(update.text(), None);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(
            parse(json!({"update_type": "message_removed", "timestamp": 1})),
            Err(AdapterError::Unsupported { .. })
        ));
    }
}
