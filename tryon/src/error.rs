use crate::catalog::Category;
use std::path::PathBuf;
use tryon_api::ApiError;

pub type Result<T> = std::result::Result<T, TryOnError>;

/// Every way a try-on request can fail. The `Display` text is the message
/// shown to the user as is.
#[derive(thiserror::Error, Debug)]
pub enum TryOnError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown asset: no scene '{scene}' for category {category}")]
    UnknownAsset { category: Category, scene: String },

    #[error("No assets found for category: {0}")]
    NoAssetsForCategory(Category),

    #[error("Category {0} declares no scenes")]
    EmptyCategory(Category),

    #[error("Error: RAPIDAPI_KEY not found.")]
    MissingCredential,

    #[error("API Error ({status}): {body}")]
    RemoteApi { status: u16, body: String },

    #[error("Transport fault: {0}")]
    TransportFault(String),

    #[error("Background removal failed: {0}")]
    BackgroundRemoval(String),

    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Compose error: {0}")]
    Compose(compositor::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<ApiError> for TryOnError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, body } => Self::RemoteApi { status, body },
            ApiError::Transport { .. } | ApiError::Timeout { .. } => {
                Self::TransportFault(e.to_string())
            }
            ApiError::Upload { error, path } if error.kind() == std::io::ErrorKind::NotFound => {
                Self::SourceNotFound(path.into())
            }
            ApiError::Upload { error, .. } => Self::Io(error),
            ApiError::Client(_) | ApiError::InvalidHeader(_) => Self::Config(e.to_string()),
        }
    }
}

impl From<compositor::Error> for TryOnError {
    fn from(e: compositor::Error) -> Self {
        match e {
            compositor::Error::SourceNotFound(path) => Self::SourceNotFound(path),
            compositor::Error::Io(e) => Self::Io(e),
            compositor::Error::Image(e) => Self::Image(e),
            e => Self::Compose(e),
        }
    }
}

impl From<background_remover::Error> for TryOnError {
    fn from(e: background_remover::Error) -> Self {
        Self::BackgroundRemoval(e.to_string())
    }
}
