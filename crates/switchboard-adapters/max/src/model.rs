//! Max Bot API update objects.
//!
//! ```text
//! Update (update_type)
//! ├── message_created  { message: Message { sender, recipient, timestamp, body } }
//! ├── message_callback { callback: Callback { callback_id, payload, user }, message? }
//! ├── bot_started      { chat_id, user, payload? }
//! └── ...              (everything else is not routed)
//! ```
//!
//! Max timestamps are Unix milliseconds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "update_type", rename_all = "snake_case")]
pub enum Update {
    MessageCreated {
        timestamp: i64,
        message: Message,
    },
    MessageCallback {
        timestamp: i64,
        callback: Callback,
        #[serde(default)]
        message: Option<Message>,
    },
    BotStarted {
        timestamp: i64,
        chat_id: i64,
        user: User,
        /// Deep-link payload of the start link.
        #[serde(default)]
        payload: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// `dialog`, `chat` or `channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Dialog,
    Chat,
    Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub chat_id: Option<i64>,
    pub chat_type: ChatKind,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Absent for channel posts.
    #[serde(default)]
    pub sender: Option<User>,
    pub recipient: Recipient,
    pub timestamp: i64,
    pub body: Body,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub mid: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Contact { payload: ContactPayload },
    Location { latitude: f64, longitude: f64 },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPayload {
    /// vCard text; the phone number is on its `TEL` line.
    #[serde(default)]
    pub vcf_info: Option<String>,
    /// Max account behind the contact, if it has one.
    #[serde(default)]
    pub max_info: Option<User>,
}

impl ContactPayload {
    /// Phone number from the vCard `TEL` line.
    pub fn phone(&self) -> Option<&str> {
        self.vcf_info
            .as_deref()?
            .lines()
            .find(|line| {
                line.get(..3)
                    .is_some_and(|key| key.eq_ignore_ascii_case("tel"))
            })
            .and_then(|line| line.rsplit_once(':'))
            .map(|(_, phone)| phone.trim())
            .filter(|phone| !phone.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callback {
    pub callback_id: String,
    #[serde(default)]
    pub payload: Option<String>,
    pub user: User,
}
