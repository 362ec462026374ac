//! # Replies
//!
//! Protocol-neutral view of a command reply. Callers interpret payloads
//! themselves; the facade never decodes values.

/// Reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No value, e.g. a missing bucket or key.
    Nil,
    /// Simple status line such as `OK` or `PONG`.
    Status(String),
    /// Integer reply.
    Integer(i64),
    /// Binary-safe payload.
    Bytes(Vec<u8>),
    /// Nested replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// Returns true for the "no value" reply.
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Borrows the payload of a `Bytes` reply.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Reply::Bytes(data) => Some(data),
            _ => None,
        }
    }

    /// Takes the payload of a `Bytes` reply. `Nil` maps to `None`.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Reply::Bytes(data) => Some(data),
            _ => None,
        }
    }
}

impl From<redis::Value> for Reply {
    fn from(value: redis::Value) -> Self {
        match value {
            redis::Value::Nil => Reply::Nil,
            redis::Value::Int(value) => Reply::Integer(value),
            redis::Value::Data(data) => Reply::Bytes(data),
            redis::Value::Bulk(items) => Reply::Array(items.into_iter().map(Reply::from).collect()),
            redis::Value::Status(text) => Reply::Status(text),
            redis::Value::Okay => Reply::Status("OK".to_string()),
        }
    }
}
