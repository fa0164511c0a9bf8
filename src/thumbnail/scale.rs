//! Aspect-preserving fit of decoded images into a square box

use image::{imageops, imageops::FilterType, DynamicImage};

use super::Thumbnail;

/// Dimensions of an image of `width` x `height` scaled to fit a
/// `size` x `size` box.
///
/// Portrait images are scaled to the box height, everything else to the box
/// width. Neither side drops below one pixel.
pub fn fit_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (size, size);
    }

    let scaled = |long: u32, short: u32| -> u32 {
        let value = (u64::from(short) * u64::from(size) + u64::from(long) / 2) / u64::from(long);
        value.clamp(1, u64::from(size)) as u32
    };

    if width < height {
        (scaled(height, width), size)
    } else {
        (size, scaled(width, height))
    }
}

/// Scale `img` to fit a `size` x `size` box with bilinear filtering
pub fn scale_to_fit(img: &DynamicImage, size: u32) -> Thumbnail {
    let (width, height) = fit_dimensions(img.width(), img.height(), size);
    imageops::resize(&img.to_rgba8(), width, height, FilterType::Triangle)
}
