//! Event classification enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

/// Kind of a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Visit,
    Page,
    Custom,
    LoginUserAttributes,
    VisitorAttributes,
    ViewClick,
    ViewChange,
    AppClosed,
    Activate,
    Reengage,
}

impl EventType {
    /// All event types, in tag order.
    pub const ALL: [EventType; 10] = [
        EventType::Visit,
        EventType::Page,
        EventType::Custom,
        EventType::LoginUserAttributes,
        EventType::VisitorAttributes,
        EventType::ViewClick,
        EventType::ViewChange,
        EventType::AppClosed,
        EventType::Activate,
        EventType::Reengage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visit => "VISIT",
            Self::Page => "PAGE",
            Self::Custom => "CUSTOM",
            Self::LoginUserAttributes => "LOGIN_USER_ATTRIBUTES",
            Self::VisitorAttributes => "VISITOR_ATTRIBUTES",
            Self::ViewClick => "VIEW_CLICK",
            Self::ViewChange => "VIEW_CHANGE",
            Self::AppClosed => "APP_CLOSED",
            Self::Activate => "ACTIVATE",
            Self::Reengage => "REENGAGE",
        }
    }

    /// Numeric tag used by the binary codec.
    pub fn tag(&self) -> i32 {
        match self {
            Self::Visit => 1,
            Self::Page => 2,
            Self::Custom => 3,
            Self::LoginUserAttributes => 4,
            Self::VisitorAttributes => 5,
            Self::ViewClick => 6,
            Self::ViewChange => 7,
            Self::AppClosed => 8,
            Self::Activate => 9,
            Self::Reengage => 10,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Default send policy: session starts and install attribution go out
    /// immediately, everything else is batched.
    pub fn default_policy(&self) -> SendPolicy {
        match self {
            Self::Visit | Self::Activate | Self::Reengage => SendPolicy::Instant,
            _ => SendPolicy::Batch,
        }
    }

    /// Queue category the event is grouped under when batching.
    pub fn store_category(&self) -> StoreCategory {
        match self {
            Self::Visit | Self::Activate | Self::Reengage => StoreCategory::Realtime,
            Self::Page | Self::ViewClick | Self::ViewChange => StoreCategory::Autotrack,
            Self::Custom | Self::LoginUserAttributes | Self::VisitorAttributes => {
                StoreCategory::Track
            }
            Self::AppClosed => StoreCategory::Other,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| CodecError::UnknownEventType(s.to_string()))
    }
}

/// How an event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendPolicy {
    /// Attempt delivery right away, fall back to the queue.
    Instant,
    /// Queue and flush on schedule or threshold.
    Batch,
}

impl SendPolicy {
    /// Flush order: instant rows drain before batch rows.
    pub const FLUSH_ORDER: [SendPolicy; 2] = [SendPolicy::Instant, SendPolicy::Batch];

    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Instant => 0,
            Self::Batch => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Instant),
            1 => Some(Self::Batch),
            _ => None,
        }
    }
}

/// Batching group of a queue row. Only rows of one category share a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
    Realtime,
    Autotrack,
    Track,
    Other,
}

impl StoreCategory {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Realtime => 0,
            Self::Autotrack => 1,
            Self::Track => 2,
            Self::Other => 3,
        }
    }

    /// Unknown values map to `Other` so rows written by a newer schema still drain.
    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Self::Realtime,
            1 => Self::Autotrack,
            2 => Self::Track,
            _ => Self::Other,
        }
    }
}

/// Host application lifecycle state at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Foreground,
    Background,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Foreground => "FOREGROUND",
            Self::Background => "BACKGROUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FOREGROUND" => Some(Self::Foreground),
            "BACKGROUND" => Some(Self::Background),
            _ => None,
        }
    }
}
