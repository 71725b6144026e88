//! Telegram update → canonical update.

use serde_json::Value;
use tracing::trace;

use switchboard_core::{
    AdapterError, AdapterResult, Callback, CallbackData, CanonicalUpdate, Chat, ChatType,
    Command, Contact, Location, MessageInfo, Sender, UpdatePayload,
};

use crate::model;

/// Classifies and converts one update.
///
/// Callback queries become callbacks. Messages are, in order of precedence,
/// commands (text starting with `/`), contacts, locations or text. Media
/// messages are text updates without text.
pub fn convert(update: model::Update, raw: Value) -> AdapterResult<CanonicalUpdate> {
    let converted = match update {
        model::Update {
            callback_query: Some(query),
            ..
        } => convert_callback(query)?,
        model::Update {
            message: Some(message),
            ..
        }
        | model::Update {
            edited_message: Some(message),
            ..
        } => convert_message(message)?,
        model::Update { update_id, .. } => {
            return Err(AdapterError::unsupported(format!(
                "update {update_id} carries neither a message nor a callback query"
            )));
        }
    };

    trace!(kind = %converted.kind(), chat = %converted.chat.id, "converted telegram update");
    Ok(converted.with_raw(raw))
}

fn convert_message(message: model::Message) -> AdapterResult<CanonicalUpdate> {
    let from = message
        .from
        .as_ref()
        .ok_or_else(|| AdapterError::unsupported("message without a sender"))?;
    let sender = sender(from);
    let chat = chat(&message.chat);

    let payload = if let Some(command) = message.text.as_deref().and_then(Command::parse) {
        UpdatePayload::Command(command)
    } else if let Some(contact) = &message.contact {
        UpdatePayload::Contact(Contact {
            phone: contact.phone_number.clone(),
            is_own: contact.user_id == Some(from.id),
            first_name: contact.first_name.clone(),
            user_id: contact.user_id.map(Into::into),
        })
    } else if let Some(location) = message.location {
        UpdatePayload::Location(Location {
            latitude: location.latitude,
            longitude: location.longitude,
        })
    } else {
        UpdatePayload::Text
    };

    Ok(CanonicalUpdate::new(sender, chat, payload).with_message(message_info(&message)))
}

fn convert_callback(query: model::CallbackQuery) -> AdapterResult<CanonicalUpdate> {
    let data = query
        .data
        .as_deref()
        .ok_or_else(|| AdapterError::unsupported("callback query without data"))?;
    let callback = Callback {
        id: Some(query.id.clone()),
        data: CallbackData::parse(data),
    };

    // Without the backing message the press came from the user's private chat.
    let chat = match &query.message {
        Some(message) => chat(&message.chat),
        None => Chat::new(query.from.id).with_kind(ChatType::Private),
    };
    let update = CanonicalUpdate::new(sender(&query.from), chat, UpdatePayload::Callback(callback));

    Ok(match &query.message {
        Some(message) => update.with_message(message_info(message)),
        None => update,
    })
}

fn sender(user: &model::User) -> Sender {
    Sender {
        id: user.id.into(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        is_bot: Some(user.is_bot),
    }
}

fn chat(chat: &model::Chat) -> Chat {
    let converted = Chat::new(chat.id);
    match chat.kind.as_str() {
        "private" => converted.with_kind(ChatType::Private),
        "group" => converted.with_kind(ChatType::Group),
        "supergroup" => converted.with_kind(ChatType::Supergroup),
        "channel" => converted.with_kind(ChatType::Channel),
        _ => converted,
    }
}

fn message_info(message: &model::Message) -> MessageInfo {
    let info = MessageInfo::new(message.message_id, message.date);
    match message.text.as_ref().or(message.caption.as_ref()) {
        Some(text) => info.with_text(text.clone()),
        None => info,
    }
}
