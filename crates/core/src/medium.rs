//! Delivery medium names.
//!
//! These must match the values accepted in the `medium` field of publish
//! requests and stored in the `message_log.medium` column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Plain-text + HTML email.
pub const MEDIUM_EMAIL: &str = "email";

/// SMS text message.
pub const MEDIUM_SMS: &str = "sms";

/// Chat webhook post. `chat` is accepted as an alias on input.
pub const MEDIUM_SLACK: &str = "slack";

/// Push notification gateway. `gcm` is accepted as an alias on input.
pub const MEDIUM_PUSH: &str = "push";

/// A delivery channel a message can be published through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    Email,
    Sms,
    #[serde(alias = "chat")]
    Slack,
    #[serde(alias = "gcm")]
    Push,
}

impl Medium {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Email => MEDIUM_EMAIL,
            Medium::Sms => MEDIUM_SMS,
            Medium::Slack => MEDIUM_SLACK,
            Medium::Push => MEDIUM_PUSH,
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            MEDIUM_EMAIL => Ok(Medium::Email),
            MEDIUM_SMS => Ok(Medium::Sms),
            MEDIUM_SLACK | "chat" => Ok(Medium::Slack),
            MEDIUM_PUSH | "gcm" => Ok(Medium::Push),
            other => Err(CoreError::Validation(format!(
                "Unknown medium '{other}' (expected one of: email, sms, slack, push)"
            ))),
        }
    }
}

/// Parse a list of medium names, dropping repeats while keeping first-seen order.
pub fn parse_media<S: AsRef<str>>(names: &[S]) -> Result<Vec<Medium>, CoreError> {
    let mut media = Vec::with_capacity(names.len());
    for name in names {
        let medium: Medium = name.as_ref().parse()?;
        if !media.contains(&medium) {
            media.push(medium);
        }
    }
    Ok(media)
}
