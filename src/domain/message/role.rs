//! Participant roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Who produced an event, and which side of a room a reader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// Customer, signed in or anonymous.
    Guest,
    /// Seller-side human operator.
    Operator,
    /// Automated responder.
    Bot,
}

impl SenderRole {
    /// Roles that read rooms and therefore own unread counters.
    pub const READERS: [SenderRole; 2] = [SenderRole::Guest, SenderRole::Operator];

    /// Fallback display name when a connection did not supply one.
    pub fn default_display_name(&self) -> &'static str {
        match self {
            SenderRole::Guest => "Guest",
            SenderRole::Operator => "Support",
            SenderRole::Bot => "Assistant",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Guest => "guest",
            SenderRole::Operator => "operator",
            SenderRole::Bot => "bot",
        }
    }
}

impl fmt::Display for SenderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SenderRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" | "customer" => Ok(SenderRole::Guest),
            "operator" | "seller" | "admin" => Ok(SenderRole::Operator),
            "bot" => Ok(SenderRole::Bot),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_aliases() {
        assert_eq!("customer".parse::<SenderRole>().unwrap(), SenderRole::Guest);
        assert_eq!("Seller".parse::<SenderRole>().unwrap(), SenderRole::Operator);
        assert_eq!("admin".parse::<SenderRole>().unwrap(), SenderRole::Operator);
        assert_eq!("bot".parse::<SenderRole>().unwrap(), SenderRole::Bot);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("courier".parse::<SenderRole>().is_err());
    }

    #[test]
    fn bot_is_not_a_reader() {
        assert!(!SenderRole::READERS.contains(&SenderRole::Bot));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SenderRole::Operator).unwrap(),
            "\"operator\""
        );
    }
}
