//! Custom error types and result handling for Mihiraki operations.
//!
//! All operations return a [`Result<T>`] which is a type alias for `std::result::Result<T, Error>`.
//! Every error is terminal for the volume it occurred in; [`Error::kind`] maps any error onto
//! the small set of [`ErrorKind`]s reported back to callers in batch mode.
//!
use std::path::PathBuf;

/// Type alias for Results with Mihiraki errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Mihiraki operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image processing errors that were not attributed to a specific stage
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// ZIP archive errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::mihiraki::MihirakiConfigBuilderError),
    /// A source image could not be read or decoded
    #[error("Unreadable image '{0:?}': {1}")]
    UnreadableImage(PathBuf, String),
    /// An image has a shape the pipeline cannot handle (e.g. a spread one pixel wide)
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),
    /// Re-encoding a page image failed
    #[error("Encode failure: {0}")]
    EncodeFailure(String),
    /// Writing a document, copying an image or building the archive failed
    #[error("Packaging failed: {0}")]
    Packaging(String),
    /// A volume had no images to convert
    #[error("No images found: {0}")]
    NoImagesFound(String),
    /// The cancellation flag was raised between two stages
    #[error("Conversion cancelled before stage '{0}'")]
    Cancelled(String),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// Error for failed asynchronous tasks
    #[error("Asynchronous task failed: {0}")]
    AsyncTaskError(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

/// Terminal classification of an [`Error`], as reported for failed volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    UnreadableImage,
    UnsupportedGeometry,
    EncodeFailure,
    PackagingError,
    NoImagesFound,
    Cancelled,
    Other,
}

impl Error {
    /// Returns the terminal kind of this error.
    ///
    /// Raw I/O and ZIP errors only surface from archive assembly, so they count as
    /// packaging failures; a bare `image::ImageError` is an encode-side failure because
    /// decoding is always wrapped into [`Error::UnreadableImage`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnreadableImage(..) => ErrorKind::UnreadableImage,
            Error::UnsupportedGeometry(_) => ErrorKind::UnsupportedGeometry,
            Error::EncodeFailure(_) | Error::Image(_) => ErrorKind::EncodeFailure,
            Error::Packaging(_) | Error::Zip(_) | Error::Io(_) => ErrorKind::PackagingError,
            Error::NoImagesFound(_) => ErrorKind::NoImagesFound,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::Join(_)
            | Error::ConfigBuilder(_)
            | Error::InvalidPath(..)
            | Error::AsyncTaskError(_)
            | Error::Other(_) => ErrorKind::Other,
        }
    }
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
