use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] io::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    #[error("Deletion error: {0}")]
    Deletion(#[from] DeletionError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },

    #[error("Missing required value: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),
}

#[derive(thiserror::Error, Debug)]
pub enum ListingError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot listing rejected for project {project}: {message}")]
    Rejected { project: String, message: String },

    #[error("Unreadable snapshot listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Snapshot inventory unavailable: {0}")]
    Unavailable(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeletionError {
    #[error("Snapshot {0} not found")]
    NotFound(String),

    #[error("Permission denied deleting snapshot {0}")]
    PermissionDenied(String),

    #[error("Snapshot {0} is in use")]
    InUse(String),

    #[error("Deletion of snapshot {id} rejected: {message}")]
    Rejected { id: String, message: String },

    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },
}

impl DeletionError {
    /// Classifies a provider error message for snapshot `id`.
    pub fn from_provider_message(id: &str, message: &str) -> Self {
        let lowered = message.to_lowercase();
        let id = id.to_string();
        if lowered.contains("was not found") || lowered.contains("notfound") {
            DeletionError::NotFound(id)
        } else if lowered.contains("permission") || lowered.contains("forbidden") {
            DeletionError::PermissionDenied(id)
        } else if lowered.contains("resourceinusebyanotherresource")
            || lowered.contains("in use")
            || lowered.contains("being used")
        {
            DeletionError::InUse(id)
        } else {
            DeletionError::Rejected {
                id,
                message: message.trim().to_string(),
            }
        }
    }
}
