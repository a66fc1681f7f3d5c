use thiserror::Error;

/// Errors surfaced through the host's database channel.
///
/// `NotFound` is the only database-protocol error; everything else reaches
/// the host as a generic failure.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad resource: {0}")]
    BadResource(String),

    /// Transport or protocol failure in the UPnP client layer.
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

impl DatabaseError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DatabaseError::NotFound(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }
}
