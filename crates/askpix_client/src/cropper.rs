//! crates/askpix_client/src/cropper.rs
//!
//! Cuts a pixel rectangle out of a data-URI image and re-encodes it as JPEG.

use askpix_core::crop::PixelRect;
use askpix_core::domain::DataUri;
use askpix_core::ports::{ImageCropper, PortError, PortResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriCropper;

impl DataUriCropper {
    pub fn new() -> Self {
        Self
    }
}

fn invalid(message: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Could not crop the image: {}", message))
}

impl ImageCropper for DataUriCropper {
    fn crop(&self, data_uri: &str, rect: PixelRect) -> PortResult<String> {
        let source = DataUri::parse(data_uri).map_err(invalid)?;
        let bytes = STANDARD.decode(source.data.as_bytes()).map_err(invalid)?;
        let image = image::load_from_memory(&bytes).map_err(invalid)?;

        let (img_w, img_h) = (image.width(), image.height());
        let x = rect.x.min(img_w.saturating_sub(1));
        let y = rect.y.min(img_h.saturating_sub(1));
        let w = rect.width.min(img_w.saturating_sub(x));
        let h = rect.height.min(img_h.saturating_sub(y));
        if w == 0 || h == 0 {
            return Err(invalid("the selection is empty"));
        }

        let cropped = image.crop_imm(x, y, w, h);
        let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());

        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        rgb.write_with_encoder(encoder).map_err(invalid)?;

        Ok(DataUri {
            mime_type: "image/jpeg".to_string(),
            data: STANDARD.encode(&buffer),
        }
        .to_uri())
    }
}
