//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file di input e la discovery dei media.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di file media nelle directory passate da CLI
//! - Determinazione tipo di file (immagine vs audio) tramite estensione
//! - Lettura dei file in `RawMedia` (nome originale + bytes)
//! - Calcolo dei nomi di output (`.jpg`, `_sq.jpg`, `.mp3`)
//! - Inferenza MIME per l'upload
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, WebP
//! - **Audio**: MP3, WAV, M4A, OGG
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::find_media_files(&paths, MediaKind::Image)?;
//! let raw = FileManager::read_media(&files).await?;
//! ```

use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg"];

/// Media kind a pending batch is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_EXTENSIONS,
            MediaKind::Audio => AUDIO_EXTENSIONS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Audio => "audio files",
        }
    }
}

/// Raw user-submitted media: original filename plus bytes
#[derive(Debug, Clone)]
pub struct RawMedia {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawMedia {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Expand files and directories into the supported media files of `kind`.
    ///
    /// Explicit file arguments are kept even with an unsupported extension so
    /// they show up as a per-item failure instead of vanishing.
    pub fn find_media_files(inputs: &[PathBuf], kind: MediaKind) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_file() {
                files.push(input.clone());
                continue;
            }

            if !input.is_dir() {
                return Err(IngestError::Validation(format!(
                    "Input path does not exist: {}",
                    input.display()
                )));
            }

            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| Self::has_extension(p, kind.extensions()))
                .collect();
            found.sort();
            files.extend(found);
        }

        Ok(files)
    }

    /// Read every file into memory, keeping only the file name
    pub async fn read_media(paths: &[PathBuf]) -> Result<Vec<RawMedia>> {
        let mut media = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            media.push(RawMedia::new(name, bytes));
        }
        Ok(media)
    }

    /// Lower-cased extension of a file name, if any
    pub fn extension_of(name: &str) -> Option<String> {
        Path::new(name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    pub fn is_image(path: &Path) -> bool {
        Self::has_extension(path, IMAGE_EXTENSIONS)
    }

    pub fn is_audio(path: &Path) -> bool {
        Self::has_extension(path, AUDIO_EXTENSIONS)
    }

    fn has_extension(path: &Path, allowed: &[&str]) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                allowed.contains(&ext_lower.as_str())
            }
            None => false,
        }
    }

    /// Original name with its extension replaced by `new_extension`
    pub fn with_extension(name: &str, new_extension: &str) -> String {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| name.to_string());
        format!("{}.{}", stem, new_extension)
    }

    /// MIME type used for the multipart upload, by extension only
    pub fn mime_for(filename: &str) -> &'static str {
        if filename.ends_with(".jpg") || filename.ends_with(".jpeg") {
            "image/jpeg"
        } else if filename.ends_with(".mp3") {
            "audio/mpeg"
        } else {
            "application/octet-stream"
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mime_inference() {
        assert_eq!(FileManager::mime_for("photo.jpg"), "image/jpeg");
        assert_eq!(FileManager::mime_for("photo.jpeg"), "image/jpeg");
        assert_eq!(FileManager::mime_for("song.mp3"), "audio/mpeg");
        assert_eq!(FileManager::mime_for("clip.wav"), "application/octet-stream");
        assert_eq!(FileManager::mime_for("PHOTO.JPG"), "application/octet-stream");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(FileManager::with_extension("beach.png", "jpg"), "beach.jpg");
        assert_eq!(FileManager::with_extension("my.song.m4a", "mp3"), "my.song.mp3");
        assert_eq!(FileManager::with_extension("noext", "jpg"), "noext.jpg");
    }

    #[test]
    fn test_kind_detection() {
        assert!(FileManager::is_image(Path::new("a/B.WEBP")));
        assert!(!FileManager::is_image(Path::new("a/b.gif")));
        assert!(FileManager::is_audio(Path::new("a/b.Ogg")));
        assert!(!FileManager::is_audio(Path::new("a/b.flac")));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
    }

    #[tokio::test]
    async fn test_find_and_read_media() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp_dir.path().join("b.png"), b"png").unwrap();
        std::fs::write(nested.join("a.jpg"), b"jpg").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"txt").unwrap();
        std::fs::write(temp_dir.path().join("song.mp3"), b"mp3").unwrap();

        let files = FileManager::find_media_files(&[temp_dir.path().to_path_buf()], MediaKind::Image).unwrap();
        assert_eq!(files.len(), 2);

        let media = FileManager::read_media(&files).await.unwrap();
        let names: Vec<&str> = media.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"a.jpg"));
        assert!(names.contains(&"b.png"));

        let missing = FileManager::find_media_files(&[temp_dir.path().join("nope")], MediaKind::Audio);
        assert!(missing.is_err());
    }
}
