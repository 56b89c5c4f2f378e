//! # Image Processing Module
//!
//! Questo modulo normalizza qualsiasi immagine supportata in uno dei due profili
//! JPEG fissi accettati dal CMS.
//!
//! ## Profili di output
//!
//! | Modalità     | Trasformazione                                   | Output      |
//! |--------------|--------------------------------------------------|-------------|
//! | `square`     | Crop centrato `min(w,h)` × `min(w,h)`, poi resize | 800 × 800   |
//! | `horizontal` | Resize forzato, aspect ratio NON preservato      | 1280 × 720  |
//!
//! ## Pipeline
//!
//! 1. **Decode**: formato rilevato dal contenuto (`image::load_from_memory`)
//! 2. **Geometria**: crop centrato (solo square) + resize con filtro Lanczos3
//! 3. **Colore**: conversione a RGB8, il canale alpha viene scartato
//! 4. **Encode**: JPEG qualità 60 (target indicativo < 200KB, nessun controllo post-encode)
//!
//! ## Error Handling
//!
//! Qualsiasi errore di decode/encode diventa `IngestError::Decode`: il chiamante
//! salta l'item senza interrompere il batch.
//!
//! ## Esempio
//!
//! ```ignore
//! let jpeg = ImageProcessor::normalize("beach.png", &bytes, NormalizeMode::Square)?;
//! let name = NormalizeMode::Square.output_name("beach.png"); // "beach_sq.jpg"
//! ```

use crate::error::{IngestError, Result};
use crate::file_manager::FileManager;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, warn};

/// JPEG quality used for every normalized image
pub const JPEG_QUALITY: u8 = 60;
pub const SQUARE_SIZE: u32 = 800;
pub const HORIZONTAL_SIZE: (u32, u32) = (1280, 720);

/// Geometric profile applied before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Centered square crop, then 800x800
    Square,
    /// Stretch/squash to 1280x720
    #[default]
    Horizontal,
}

impl NormalizeMode {
    pub fn target_size(&self) -> (u32, u32) {
        match self {
            NormalizeMode::Square => (SQUARE_SIZE, SQUARE_SIZE),
            NormalizeMode::Horizontal => HORIZONTAL_SIZE,
        }
    }

    /// Output name for a processed image: `.jpg`, with `_sq` for square mode
    pub fn output_name(&self, original_name: &str) -> String {
        match self {
            NormalizeMode::Square => {
                let jpg = FileManager::with_extension(original_name, "jpg");
                format!("{}_sq.jpg", jpg.strip_suffix(".jpg").unwrap_or(&jpg))
            }
            NormalizeMode::Horizontal => FileManager::with_extension(original_name, "jpg"),
        }
    }
}

/// Centered crop rectangle as `(left, top, side)`.
///
/// The region spans `(⌊(w-s)/2⌋, ⌊(h-s)/2⌋)` to `(⌊(w+s)/2⌋, ⌊(h+s)/2⌋)`
/// with `s = min(w, h)`.
pub fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}

/// Stateless image normalizer
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decode, transform and re-encode `bytes` as JPEG.
    ///
    /// `name` is only used for error reporting.
    pub fn normalize(name: &str, bytes: &[u8], mode: NormalizeMode) -> Result<Vec<u8>> {
        let result = Self::normalize_inner(name, bytes, mode);
        if let Err(ref e) = result {
            warn!("Image processing error: {}", e);
        }
        result
    }

    fn normalize_inner(name: &str, bytes: &[u8], mode: NormalizeMode) -> Result<Vec<u8>> {
        let img = image::load_from_memory(bytes).map_err(|e| IngestError::decode(name, e))?;
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(IngestError::decode(name, "image has zero width or height"));
        }

        let (target_w, target_h) = mode.target_size();
        let resized = match mode {
            NormalizeMode::Square => {
                let (left, top, side) = center_square(width, height);
                debug!(
                    "Square crop of {} ({}x{}): {}x{} at ({}, {})",
                    name, width, height, side, side, left, top
                );
                img.crop_imm(left, top, side, side)
                    .resize_exact(target_w, target_h, FilterType::Lanczos3)
            }
            NormalizeMode::Horizontal => {
                debug!("Stretching {} ({}x{}) to {}x{}", name, width, height, target_w, target_h);
                img.resize_exact(target_w, target_h, FilterType::Lanczos3)
            }
        };

        Self::encode_jpeg(name, resized)
    }

    fn encode_jpeg(name: &str, img: DynamicImage) -> Result<Vec<u8>> {
        let rgb = img.to_rgb8();
        let mut out = Cursor::new(Vec::new());
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder
            .encode_image(&rgb)
            .map_err(|e| IngestError::decode(name, format!("JPEG encode failed: {}", e)))?;

        let bytes = out.into_inner();
        debug!(
            "Encoded {} as {}x{} JPEG ({})",
            name,
            rgb.width(),
            rgb.height(),
            FileManager::format_size(bytes.len() as u64)
        );
        Ok(bytes)
    }
}
