//! Post-capture image transform: trim the uniform margin, twice, then frame
//! the result with a solid border.

use crate::{Error, Result};
use image::{imageops, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::Path;

/// Border width in pixels added on every side.
pub const BORDER_WIDTH: u32 = 20;

/// Crop away the margin whose color matches the top-left pixel.
///
/// An image that is a single color throughout is returned unchanged.
pub fn trim(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let margin = *img.get_pixel(0, 0);

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0u32, 0u32);
    for (x, y, px) in img.enumerate_pixels() {
        if *px != margin {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x == u32::MAX {
        return img.clone();
    }

    imageops::crop_imm(img, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

/// Frame `img` with `width` pixels of `color` on every side.
pub fn add_border(img: &RgbaImage, width: u32, color: Rgba<u8>) -> RgbaImage {
    let (w, h) = img.dimensions();
    let mut out = RgbaImage::from_pixel(w + 2 * width, h + 2 * width, color);
    imageops::replace(&mut out, img, i64::from(width), i64::from(width));
    out
}

/// Trim twice, then add the border.
///
/// One trim can leave a residual band when the renderer paints the page
/// margin and the body background in slightly different colors; the second
/// pass removes it.
pub fn snapshot_frame(img: &RgbaImage, color: Rgba<u8>) -> RgbaImage {
    let trimmed = trim(&trim(img));
    add_border(&trimmed, BORDER_WIDTH, color)
}

/// Apply [`snapshot_frame`] to the image at `path`, writing it back in place.
pub fn post_process(path: &Path, color: Rgba<u8>) -> Result<()> {
    let img = ImageReader::open(path)
        .map_err(|e| Error::ImageError(format!("Failed to open {}: {}", path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| Error::ImageError(format!("Failed to read {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| Error::ImageError(format!("Failed to decode {}: {}", path.display(), e)))?;

    let framed = snapshot_frame(&img.to_rgba8(), color);
    log::debug!(
        "Post-processed {}: {}x{} -> {}x{}",
        path.display(),
        img.width(),
        img.height(),
        framed.width(),
        framed.height()
    );
    save(DynamicImage::ImageRgba8(framed), path)
}

// Format follows the extension when an encoder for it is built in, else PNG
fn save(img: DynamicImage, path: &Path) -> Result<()> {
    let format = match ImageFormat::from_path(path) {
        Ok(format) if format.writing_enabled() => format,
        Ok(format) => {
            log::warn!(
                "No {:?} encoder available, writing {} as PNG",
                format,
                path.display()
            );
            ImageFormat::Png
        }
        Err(_) => ImageFormat::Png,
    };
    let img = match format {
        // no alpha channel in JPEG
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };
    img.save_with_format(path, format)
        .map_err(|e| Error::ImageError(format!("Failed to save {}: {}", path.display(), e)))
}
