use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

/// Where a still image comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    File(PathBuf),
    /// Encoded bytes, e.g. a dropped payload or stdin.
    Bytes(Vec<u8>),
    Url(String),
}

impl ImageSource {
    /// Interprets a command-line style argument: `http(s)://` URLs become
    /// [`ImageSource::Url`], anything else a file path.
    pub fn from_arg(arg: &str) -> Self {
        let lower = arg.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Url(arg.to_string())
        } else {
            ImageSource::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::File(path) => write!(f, "{}", path.display()),
            ImageSource::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            ImageSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("image source is empty")]
    Empty,
}

/// Decodes a still image into an RGB frame.
pub trait ImageLoader: Send + Sync {
    fn load(&self, source: &ImageSource) -> Result<Frame, ImageLoadError>;
}
