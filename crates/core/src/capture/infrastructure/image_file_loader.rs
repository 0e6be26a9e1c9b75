use std::time::Duration;

use crate::capture::domain::image_loader::{ImageLoadError, ImageLoader, ImageSource};
use crate::shared::frame::Frame;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Decodes stills with the `image` crate; URLs are fetched with blocking reqwest.
#[derive(Default)]
pub struct ImageFileLoader;

impl ImageFileLoader {
    pub fn new() -> Self {
        Self
    }

    fn read_bytes(&self, source: &ImageSource) -> Result<Vec<u8>, ImageLoadError> {
        match source {
            ImageSource::File(path) => std::fs::read(path).map_err(|e| ImageLoadError::Io {
                path: path.clone(),
                source: e,
            }),
            ImageSource::Bytes(bytes) => Ok(bytes.clone()),
            ImageSource::Url(url) => fetch(url),
        }
    }
}

impl ImageLoader for ImageFileLoader {
    fn load(&self, source: &ImageSource) -> Result<Frame, ImageLoadError> {
        let bytes = self.read_bytes(source)?;
        decode(&bytes)
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, ImageLoadError> {
    let download_err = |source| ImageLoadError::Download {
        url: url.to_string(),
        source,
    };
    log::info!("Fetching image from {url}");
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(download_err)?;
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    Ok(response.bytes().map_err(download_err)?.to_vec())
}

fn decode(bytes: &[u8]) -> Result<Frame, ImageLoadError> {
    if bytes.is_empty() {
        return Err(ImageLoadError::Empty);
    }
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::new(rgb.into_raw(), width, height, 3, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        std::fs::write(&path, png_bytes(30, 20, [50, 100, 200])).unwrap();

        let frame = ImageFileLoader::new().load(&ImageSource::File(path)).unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (30, 20, 3));
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_load_bytes() {
        let frame = ImageFileLoader::new()
            .load(&ImageSource::Bytes(png_bytes(4, 4, [1, 2, 3])))
            .unwrap();
        assert_eq!(frame.width(), 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ImageFileLoader::new().load(&ImageSource::File(PathBuf::from(
            "/nonexistent/face.png",
        )));
        assert!(matches!(result, Err(ImageLoadError::Io { .. })));
    }

    #[test]
    fn test_empty_bytes() {
        let result = ImageFileLoader::new().load(&ImageSource::Bytes(Vec::new()));
        assert!(matches!(result, Err(ImageLoadError::Empty)));
    }

    #[test]
    fn test_garbage_bytes_is_decode_error() {
        let result = ImageFileLoader::new().load(&ImageSource::Bytes(b"not an image".to_vec()));
        assert!(matches!(result, Err(ImageLoadError::Decode(_))));
    }

    #[test]
    fn test_unreachable_url_is_download_error() {
        // Needs DNS; skipped in CI
        if std::env::var("CI").is_ok() {
            return;
        }
        let result = ImageFileLoader::new().load(&ImageSource::Url(
            "http://invalid.nonexistent.example.com/face.png".into(),
        ));
        assert!(matches!(result, Err(ImageLoadError::Download { .. })));
    }

    #[test]
    fn test_refused_connection_is_download_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = ImageFileLoader::new().load(&ImageSource::Url(format!(
            "http://127.0.0.1:{port}/face.png"
        )));
        assert!(matches!(result, Err(ImageLoadError::Download { .. })));
    }
}
