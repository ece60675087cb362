use std::fmt;

#[derive(Debug)]
pub enum OutboxError {
    Database(sqlx::Error),
    Serialization(serde_json::Error),
}

impl fmt::Display for OutboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboxError::Database(e) => write!(f, "outbox database error: {e}"),
            OutboxError::Serialization(e) => write!(f, "outbox payload serialization error: {e}"),
        }
    }
}

impl std::error::Error for OutboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutboxError::Database(e) => Some(e),
            OutboxError::Serialization(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for OutboxError {
    fn from(e: sqlx::Error) -> Self {
        OutboxError::Database(e)
    }
}

impl From<serde_json::Error> for OutboxError {
    fn from(e: serde_json::Error) -> Self {
        OutboxError::Serialization(e)
    }
}
