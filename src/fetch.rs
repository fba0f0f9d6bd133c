use crate::{
    error::{ClassifierError, Result},
    preprocess::RgbImage,
};
use kornia_image::{Image, ImageSize, allocator::CpuAllocator};

/// Host serving a random image of the requested size.
pub const RANDOM_IMAGE_HOST: &str = "https://random.imagecdn.app";

/// URL of a random image with the given size.
pub fn image_url(size: ImageSize) -> String {
    format!("{}/{}/{}", RANDOM_IMAGE_HOST, size.width, size.height)
}

/// Decodes a JPEG or PNG payload into an RGB8 image.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let size = ImageSize {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
    };
    Ok(Image::new(size, rgb.into_raw(), CpuAllocator)?)
}

/// Downloads images of a fixed size from a URL.
///
/// Uses a blocking client; do not create or use it from inside an async runtime.
pub struct ImageFetcher {
    client: reqwest::blocking::Client,
    url: String,
    expected_size: ImageSize,
}

impl ImageFetcher {
    pub fn new(url: impl Into<String>, expected_size: ImageSize) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
            expected_size,
        }
    }

    /// Fetches and decodes one image. The request is issued exactly once.
    pub fn fetch(&self) -> Result<RgbImage> {
        fetch_image(&self.client, &self.url, self.expected_size)
    }
}

/// Fetches one image from `url` and checks that it has `expected_size`.
pub fn fetch_image(
    client: &reqwest::blocking::Client,
    url: &str,
    expected_size: ImageSize,
) -> Result<RgbImage> {
    log::debug!("Fetching image from {url}");

    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    let image = decode_image(&bytes)?;

    if image.size() != expected_size {
        log::warn!(
            "Image from {url} is {}x{}, expected {}x{}",
            image.width(),
            image.height(),
            expected_size.width,
            expected_size.height
        );
        return Err(ClassifierError::UnexpectedImageSize {
            expected: expected_size,
            actual: image.size(),
        });
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let buffer = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut bytes = Cursor::new(Vec::new());
        buffer
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn url_template() {
        let size = ImageSize {
            width: 128,
            height: 128,
        };
        assert_eq!(image_url(size), "https://random.imagecdn.app/128/128");
    }

    #[test]
    fn decodes_png_to_rgb8() {
        let image = decode_image(&png_bytes(4, 2, [255, 0, 7])).unwrap();

        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 2);
        assert_eq!(&image.as_slice()[..3], &[255, 0, 7]);
        assert_eq!(image.as_slice().len(), 4 * 2 * 3);
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let Err(err) = decode_image(b"definitely not an image") else {
            panic!("expected decode error");
        };
        assert!(matches!(err, ClassifierError::Decode(_)));
    }
}
