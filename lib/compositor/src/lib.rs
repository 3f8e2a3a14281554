pub mod bake;
pub mod compose;

pub use bake::{BakeJob, BakeOutcome, bake};
pub use compose::{Anchor, DEFAULT_BOTTOM_PADDING, Layout, Placement, compose, compose_files, placement};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Source image not found: {0}")]
    SourceNotFound(std::path::PathBuf),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image resize error: {0}")]
    ImageResize(#[from] fast_image_resize::ResizeError),

    #[error("Image buffer error: {0}")]
    ImageBufferError(#[from] fast_image_resize::ImageBufferError),
}
