//! Subscription channels for the event stream

use serde::{Serialize, Serializer};
use std::fmt;

/// Wire key of the channel that receives every message
pub const WILDCARD_CHANNEL: &str = "*";

/// A named subscription scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Wildcard channel, receives every published message
    All,
    /// Messages about a single campaign
    Campaign(String),
}

impl Channel {
    /// Parse a wire key
    pub fn from_key(key: &str) -> Self {
        if key == WILDCARD_CHANNEL {
            Channel::All
        } else {
            Channel::Campaign(key.to_string())
        }
    }

    /// Channel requested by a stream client; an absent or empty id means all
    pub fn for_campaign(campaign_id: Option<&str>) -> Self {
        match campaign_id {
            Some(id) if !id.is_empty() => Self::from_key(id),
            _ => Channel::All,
        }
    }

    /// Wire key of this channel
    pub fn key(&self) -> &str {
        match self {
            Channel::All => WILDCARD_CHANNEL,
            Channel::Campaign(id) => id,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Channel::All)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}
