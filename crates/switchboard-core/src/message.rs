//! Outbound message options shared by every platform.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Markup dialect of outbound text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    #[default]
    Html,
    Markdown,
    MarkdownV2,
}

/// What pressing a button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    /// Sends the payload back as callback data.
    Callback,
    /// Opens the URL in `payload.url`.
    Link,
    /// Asks the user to share their phone number.
    RequestContact,
    /// Asks the user to share their location.
    Location,
}

/// A keyboard button attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub kind: ButtonKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Button {
    /// A callback button. A missing payload makes the text the callback data.
    pub fn callback(text: impl Into<String>, payload: impl Into<Option<Value>>) -> Self {
        Self {
            kind: ButtonKind::Callback,
            text: text.into(),
            payload: payload.into(),
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::Link,
            text: text.into(),
            payload: Some(json!({ "url": url.into() })),
        }
    }

    pub fn request_contact(text: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::RequestContact,
            text: text.into(),
            payload: None,
        }
    }

    pub fn location(text: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::Location,
            text: text.into(),
            payload: None,
        }
    }

    /// URL of a link button.
    pub fn url(&self) -> Option<&str> {
        self.payload.as_ref()?.get("url")?.as_str().filter(|u| !u.is_empty())
    }

    /// Encodes the payload as callback data.
    ///
    /// Strings are kept, scalars are stringified, other values are JSON
    /// encoded, and a missing payload falls back to the button text.
    pub fn callback_data(&self) -> String {
        match &self.payload {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Null) | None => self.text.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Options for send and edit calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    /// Defaults to HTML where the platform needs a mode.
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub disable_notification: bool,
}

impl MessageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn silent(mut self) -> Self {
        self.disable_notification = true;
        self
    }
}

/// A file to upload or reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFile {
    /// Local file uploaded by the transport.
    Path(PathBuf),
    /// Remote file the platform fetches itself.
    Url(String),
    /// File already stored on the platform.
    Id(String),
}

impl InputFile {
    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::Path(path.as_ref().to_path_buf())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// File name used for media classification, if one is known.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Path(path) => path.file_name()?.to_str(),
            Self::Url(url) => url.rsplit('/').next().filter(|s| !s.is_empty()),
            Self::Id(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_encoding() {
        assert_eq!(Button::callback("Buy", json!("buy:1")).callback_data(), "buy:1");
        assert_eq!(Button::callback("Seven", json!(7)).callback_data(), "7");
        assert_eq!(Button::callback("Menu", None).callback_data(), "Menu");
        assert_eq!(
            Button::callback("Buy", json!({"action": "buy"})).callback_data(),
            r#"{"action":"buy"}"#
        );
    }

    #[test]
    fn test_link_url() {
        assert_eq!(Button::link("Site", "https://example.com").url(), Some("https://example.com"));
        assert_eq!(Button::link("Empty", "").url(), None);
    }

    #[test]
    fn test_input_file_name() {
        assert_eq!(InputFile::path("/tmp/photo.png").file_name(), Some("photo.png"));
        assert_eq!(InputFile::url("https://x.io/a/b.pdf").file_name(), Some("b.pdf"));
        assert_eq!(InputFile::Id("AgAD".into()).file_name(), None);
    }
}
