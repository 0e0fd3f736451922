//! Handing provisioning URIs to an image encoder.
//!
//! The library only produces the URI text. Anything that turns it into pixels
//! implements [`UriRenderer`]; the `qr` feature ships a PNG QR code renderer.

/// Turns a provisioning URI into bytes ready to be written or displayed.
pub trait UriRenderer {
    type Error;

    fn render(&self, uri: &str) -> Result<Vec<u8>, Self::Error>;
}

#[cfg(feature = "qr")]
pub use qr::QrPngRenderer;

#[cfg(feature = "qr")]
mod qr {
    use image::{GrayImage, ImageEncoder, Luma};
    use qrcode::{Color, QrCode};
    use tracing::debug;

    use super::UriRenderer;
    use crate::OtpError;

    /// Quiet-zone border in modules.
    const QUIET_ZONE: u32 = 4;

    /// Renders URIs as black on white PNG QR codes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QrPngRenderer {
        /// Edge length in pixels of a single QR module.
        pub module_px: u32,
    }

    impl Default for QrPngRenderer {
        fn default() -> Self {
            Self { module_px: 8 }
        }
    }

    impl UriRenderer for QrPngRenderer {
        type Error = OtpError;

        fn render(&self, uri: &str) -> Result<Vec<u8>, Self::Error> {
            let code = QrCode::new(uri.as_bytes())
                .map_err(|e| OtpError::Render(format!("QR encode error: {e}")))?;

            let px = self.module_px.max(1);
            let width = code.width() as u32;
            let size = (width + QUIET_ZONE * 2) * px;
            let colors = code.to_colors();

            let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));

            for y in 0..width {
                for x in 0..width {
                    if colors[(y * width + x) as usize] != Color::Dark {
                        continue;
                    }

                    let left = (x + QUIET_ZONE) * px;
                    let top = (y + QUIET_ZONE) * px;
                    for dy in 0..px {
                        for dx in 0..px {
                            img.put_pixel(left + dx, top + dy, Luma([0u8]));
                        }
                    }
                }
            }

            let mut buf = Vec::new();
            image::codecs::png::PngEncoder::new(&mut buf)
                .write_image(img.as_raw(), size, size, image::ExtendedColorType::L8)
                .map_err(|e| OtpError::Render(format!("PNG encode error: {e}")))?;

            debug!(modules = width, pixels = size, "rendered provisioning QR code");

            Ok(buf)
        }
    }

}
