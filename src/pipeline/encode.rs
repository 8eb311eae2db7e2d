//! Image encoding: `DynamicImage` → base64 PNG wrapped in a [`SlideImage`].
//!
//! Vision APIs accept images as base64 data-URIs embedded in the JSON request
//! body. PNG is chosen over JPEG because it is lossless — text crispness
//! matters far more than file size for reading slide content. `detail: "high"`
//! instructs GPT-4-class models to use the full image tile budget; without it
//! fine print and small diagrams are lost.

use crate::oracle::SlideImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one rasterised slide as a base64 PNG ready for the vision API.
pub fn encode_slide(index: usize, img: &DynamicImage) -> Result<SlideImage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded slide {} → {} bytes base64", index, b64.len());

    Ok(SlideImage {
        index,
        image: ImageData::new(b64, "image/png").with_detail("high"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let slide = encode_slide(3, &img).expect("encode should succeed");
        assert_eq!(slide.index, 3);
        assert_eq!(slide.image.mime_type, "image/png");
        // Verify it's valid base64
        let decoded = STANDARD.decode(&slide.image.data).expect("valid base64");
        assert!(!decoded.is_empty());
    }
}
