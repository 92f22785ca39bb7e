use std::time::{SystemTime, UNIX_EPOCH};

/// A published message: UTF-8 text plus an application-defined timestamp.
///
/// Value type with no identity beyond its content. The timestamp is carried
/// verbatim and never validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Message {
    pub text: String,
    pub timestamp: i64,
}

impl Message {
    pub fn new(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }

    /// Stamps the message with the current UNIX time in seconds.
    pub fn now(text: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        Self::new(text, timestamp)
    }

    pub fn text_len(&self) -> usize {
        self.text.len()
    }
}
