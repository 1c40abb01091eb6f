//! Error types shared by the store client and the edit flow.
//! Read failures are turned into fallbacks by the caller; validation failures
//! block a commit. Nothing here is fatal to a session.

use thiserror::Error;

/// Failure talking to the remote chart service.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {action} failed: {source}")]
    Network {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{action} returned HTTP {status}")]
    Http {
        action: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("unexpected {action} response: {reason}")]
    Parse { action: &'static str, reason: String },

    /// A successful reply without the data it should carry.
    #[error("{action} response is missing `{field}`")]
    Incomplete { action: &'static str, field: &'static str },

    /// The service answered `success: false`.
    #[error("{action} rejected by server: {message}")]
    Remote { action: &'static str, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl StoreError {
    pub fn parse(action: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Parse {
            action,
            reason: reason.into(),
        }
    }
}

/// Input rejected before anything is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("O nome é obrigatório!")]
    MissingName,

    #[error("Por favor, selecione um arquivo de imagem. ({mime})")]
    NotAnImage { mime: String },

    #[error("A imagem é muito grande ({size} bytes). Por favor, selecione uma imagem menor que {limit} bytes.")]
    PhotoTooLarge { size: u64, limit: u64 },

    #[error("could not read photo {path}: {reason}")]
    UnreadablePhoto { path: String, reason: String },

    #[error("unknown position {0}")]
    UnknownPosition(String),

    #[error("unknown member number {0}")]
    UnknownMember(String),

    #[error("no position is being edited")]
    NotEditing,
}

/// Failure of a whole commit. The session stays open on every variant.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("photo upload failed: {0}")]
    Upload(#[source] StoreError),

    #[error("position update failed: {0}")]
    Update(#[source] StoreError),
}
