use kornia_classifier::RgbImage;
use kornia_image::{Image, ImageSize, allocator::CpuAllocator};

/// Builds an image filled with a single RGB color.
pub fn solid_image(size: ImageSize, rgb: [u8; 3]) -> RgbImage {
    let data = rgb
        .iter()
        .copied()
        .cycle()
        .take(size.width * size.height * 3)
        .collect();
    Image::new(size, data, CpuAllocator).unwrap()
}
