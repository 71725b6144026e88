//! The canonical update model.
//!
//! Every platform adapter collapses its raw webhook payload into a
//! [`CanonicalUpdate`]. The dispatch core only ever looks at this shape:
//!
//! ```text
//! CanonicalUpdate { sender, chat, message?, payload, raw, matches? }
//!                                           │
//!                 ┌────────────┬────────────┼──────────┬───────────┐
//!              Command     Callback       Text     Contact    Location
//!           {name,value?}   {data}                {phone,..}  {lat,lon}
//! ```
//!
//! `raw` keeps the platform payload for diagnostics and is never consulted
//! by matching. `matches` is the annex filled in when a pattern binding
//! resolves the update.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{UpdateError, UpdateResult};

// =============================================================================
// Identifiers
// =============================================================================

/// A platform identifier.
///
/// Telegram uses integers, other platforms use strings; both survive a
/// round trip through JSON unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformId {
    /// Numeric identifier.
    Int(i64),
    /// Opaque string identifier.
    Str(String),
}

impl PlatformId {
    /// Returns the identifier as an integer when it is one, or parses as one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PlatformId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for PlatformId {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<&str> for PlatformId {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for PlatformId {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Identifier of a conversation.
pub type ChatId = PlatformId;
/// Identifier of a user.
pub type UserId = PlatformId;
/// Identifier of a message within a chat.
pub type MessageId = PlatformId;

// =============================================================================
// Envelope
// =============================================================================

/// Who sent the update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bot: Option<bool>,
}

impl Sender {
    /// Creates a sender with only an id.
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            username: None,
            is_bot: None,
        }
    }
}

/// Conversation kind as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// The conversation an update belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChatType>,
}

impl Chat {
    /// Creates a chat of unknown kind.
    pub fn new(id: impl Into<ChatId>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }

    /// Sets the chat kind.
    pub fn with_kind(mut self, kind: ChatType) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// The message that carried the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
}

impl MessageInfo {
    /// Creates a message without text.
    pub fn new(id: impl Into<MessageId>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            text: None,
            timestamp,
        }
    }

    /// Sets the message text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// A slash command: `/name value`.
///
/// `name` keeps the casing the user typed; [`Command::key`] gives the
/// normalized lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Command {
    /// Creates a command.
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Parses message text of the form `/name[@bot] [value]`.
    ///
    /// Returns `None` when the text is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix('/')?;
        let (head, rest) = match body.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (body, ""),
        };
        let name = head.split_once('@').map_or(head, |(name, _)| name);
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            value: (!rest.is_empty()).then(|| rest.to_owned()),
        })
    }

    /// Returns the lookup key: the leading `[a-zA-Z0-9_-]+` token, lower-cased.
    pub fn key(&self) -> Option<String> {
        let end = self
            .name
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(self.name.len());
        (end > 0).then(|| self.name[..end].to_ascii_lowercase())
    }

    /// Re-derives the command addressed by a `start key=value` deep link.
    ///
    /// Returns `None` unless this is a `start` command whose value contains `=`.
    pub fn deep_link(&self) -> Option<Self> {
        if !self.name.eq_ignore_ascii_case("start") {
            return None;
        }
        let (name, value) = self.value.as_deref()?.split_once('=')?;
        Some(Self {
            name: name.trim().to_owned(),
            value: (!value.is_empty()).then(|| value.to_owned()),
        })
    }
}

/// Data attached to an inline button press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackData {
    /// Plain string payload.
    Opaque(String),
    /// JSON payload, usually an object with an `action` field.
    Structured(Value),
}

impl CallbackData {
    /// Interprets raw callback data: JSON objects and arrays become
    /// [`Structured`](Self::Structured), anything else stays opaque.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Self::Structured(value),
            _ => Self::Opaque(raw.to_owned()),
        }
    }

    /// Returns the action string used for matching.
    ///
    /// Structured data yields its `action` field; opaque data is the action.
    pub fn action(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Opaque(s) => Some(Cow::Borrowed(s)),
            Self::Structured(value) => match value.get("action")? {
                Value::String(s) => Some(Cow::Borrowed(s)),
                Value::Number(n) => Some(Cow::Owned(n.to_string())),
                Value::Bool(b) => Some(Cow::Owned(b.to_string())),
                _ => None,
            },
        }
    }

    /// Returns a field of structured data.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Structured(value) => value.get(key),
            Self::Opaque(_) => None,
        }
    }
}

/// An inline button press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    /// Platform id of the press, used to acknowledge it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub data: CallbackData,
}

/// A shared contact card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    /// The contact is the sender's own.
    pub is_own: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// A shared geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// The classified content of an update. Exactly one per update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdatePayload {
    Command(Command),
    Callback(Callback),
    /// Any other message. Photos, stickers and voice notes carry no text.
    Text,
    Contact(Contact),
    Location(Location),
}

/// Discriminant of [`UpdatePayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Command,
    Callback,
    Text,
    Contact,
    Location,
}

impl UpdateKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Callback => "callback",
            Self::Text => "text",
            Self::Contact => "contact",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Match annex
// =============================================================================

/// Capture groups recorded when a pattern binding resolved an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGroups {
    /// Source of the pattern that matched.
    pub pattern: String,
    /// Positional groups; index 0 is the whole match.
    pub groups: Vec<Option<String>>,
    /// Named groups that participated in the match.
    pub named: BTreeMap<String, String>,
}

impl MatchGroups {
    /// Records the captures of `regex`.
    pub fn from_captures(regex: &Regex, captures: &Captures<'_>) -> Self {
        let groups = captures
            .iter()
            .map(|m| m.map(|m| m.as_str().to_owned()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_owned(), m.as_str().to_owned()))
            })
            .collect();
        Self {
            pattern: regex.as_str().to_owned(),
            groups,
            named,
        }
    }

    /// Returns a positional group.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index)?.as_deref()
    }

    /// Returns a named group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

// =============================================================================
// CanonicalUpdate
// =============================================================================

/// One inbound webhook event, normalized across platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUpdate {
    pub sender: Sender,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageInfo>,
    pub payload: UpdatePayload,
    /// Platform payload the update was converted from.
    #[serde(default)]
    pub raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matches: Option<MatchGroups>,
}

impl CanonicalUpdate {
    /// Creates an update without a message or raw payload.
    pub fn new(sender: Sender, chat: Chat, payload: UpdatePayload) -> Self {
        Self {
            sender,
            chat,
            message: None,
            payload,
            raw: Value::Null,
            matches: None,
        }
    }

    /// Attaches the backing message.
    pub fn with_message(mut self, message: MessageInfo) -> Self {
        self.message = Some(message);
        self
    }

    /// Attaches the raw platform payload.
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn kind(&self) -> UpdateKind {
        match self.payload {
            UpdatePayload::Command(_) => UpdateKind::Command,
            UpdatePayload::Callback(_) => UpdateKind::Callback,
            UpdatePayload::Text => UpdateKind::Text,
            UpdatePayload::Contact(_) => UpdateKind::Contact,
            UpdatePayload::Location(_) => UpdateKind::Location,
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat.id
    }

    /// Text of the backing message.
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref()?.text.as_deref()
    }

    pub fn command(&self) -> Option<&Command> {
        match &self.payload {
            UpdatePayload::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn command_mut(&mut self) -> Option<&mut Command> {
        match &mut self.payload {
            UpdatePayload::Command(command) => Some(command),
            _ => None,
        }
    }

    pub fn callback(&self) -> Option<&Callback> {
        match &self.payload {
            UpdatePayload::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    pub fn contact(&self) -> Option<&Contact> {
        match &self.payload {
            UpdatePayload::Contact(contact) => Some(contact),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match &self.payload {
            UpdatePayload::Location(location) => Some(location),
            _ => None,
        }
    }

    /// Capture groups left by the pattern binding that resolved this update.
    pub fn matches(&self) -> Option<&MatchGroups> {
        self.matches.as_ref()
    }

    /// Records the capture groups of a resolving pattern.
    pub fn attach_matches(&mut self, matches: MatchGroups) {
        self.matches = Some(matches);
    }

    /// Checks the schema contract adapters must honor.
    pub fn validate(&self) -> UpdateResult<()> {
        let kind = self.kind();
        if self.message.is_none() && kind != UpdateKind::Callback {
            return Err(UpdateError::MissingMessage { kind });
        }
        match &self.payload {
            UpdatePayload::Command(command) if command.name.is_empty() => {
                Err(UpdateError::EmptyCommand)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_command_with_value() {
        let command = Command::parse("/foo bar").unwrap();
        assert_eq!(command, Command::new("foo", Some("bar".into())));
    }

    #[test]
    fn test_parse_command_strips_bot_suffix() {
        let command = Command::parse("/Help@shop_bot  how to pay ").unwrap();
        assert_eq!(command.name, "Help");
        assert_eq!(command.value.as_deref(), Some("how to pay"));
        assert_eq!(command.key().as_deref(), Some("help"));
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert!(Command::parse("hello").is_none());
        assert!(Command::parse("/").is_none());
        assert!(Command::parse("/ spaced").is_none());
    }

    #[test]
    fn test_command_key_takes_leading_identifier() {
        assert_eq!(Command::new("Order-42!", None).key().as_deref(), Some("order-42"));
        assert_eq!(Command::new("!oops", None).key(), None);
    }

    #[test]
    fn test_deep_link() {
        let start = Command::new("start", Some("x=y".into()));
        assert_eq!(start.deep_link(), Some(Command::new("x", Some("y".into()))));

        let only_key = Command::new("START", Some("promo=".into()));
        assert_eq!(only_key.deep_link(), Some(Command::new("promo", None)));

        assert!(Command::new("start", Some("plain".into())).deep_link().is_none());
        assert!(Command::new("other", Some("x=y".into())).deep_link().is_none());
    }

    #[test]
    fn test_callback_data_action() {
        let opaque = CallbackData::parse("buy:42");
        assert_eq!(opaque.action().as_deref(), Some("buy:42"));

        let structured = CallbackData::parse(r#"{"action":"buy","id":42}"#);
        assert_eq!(structured.action().as_deref(), Some("buy"));
        assert_eq!(structured.get("id"), Some(&json!(42)));

        let numeric = CallbackData::parse("17");
        assert_eq!(numeric, CallbackData::Opaque("17".into()));

        let no_action = CallbackData::parse(r#"{"id":1}"#);
        assert!(no_action.action().is_none());
    }

    #[test]
    fn test_validate() {
        let text = CanonicalUpdate::new(Sender::new(1), Chat::new(1), UpdatePayload::Text);
        assert_eq!(
            text.validate(),
            Err(UpdateError::MissingMessage {
                kind: UpdateKind::Text
            })
        );

        // Stickers and photos arrive as text updates without text.
        let text = text.with_message(MessageInfo::new(5, 0));
        assert!(text.validate().is_ok());

        let callback = CanonicalUpdate::new(
            Sender::new(1),
            Chat::new(1),
            UpdatePayload::Callback(Callback {
                id: None,
                data: CallbackData::Opaque("ok".into()),
            }),
        );
        assert!(callback.validate().is_ok());
    }

    #[test]
    fn test_platform_id_serde() {
        let ids: Vec<PlatformId> = serde_json::from_value(json!([42, "-100abc"])).unwrap();
        assert_eq!(ids, vec![PlatformId::Int(42), PlatformId::from("-100abc")]);
        assert_eq!(PlatformId::from("-5").as_i64(), Some(-5));
    }

    #[test]
    fn test_match_groups() {
        let regex = Regex::new(r"^buy:(?P<id>\d+)(:x)?$").unwrap();
        let captures = regex.captures("buy:42").unwrap();
        let groups = MatchGroups::from_captures(&regex, &captures);
        assert_eq!(groups.get(0), Some("buy:42"));
        assert_eq!(groups.get(1), Some("42"));
        assert_eq!(groups.get(2), None);
        assert_eq!(groups.name("id"), Some("42"));
    }
}
