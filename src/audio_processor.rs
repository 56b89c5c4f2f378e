//! # Audio Processing Module
//!
//! Questo modulo gestisce la compressione di tutti i formati audio supportati
//! in MP3 a bitrate fisso.
//!
//! ## Responsabilità:
//! - Inferenza del formato di input dall'estensione del nome file (nessuno sniffing)
//! - Staging dei bytes su file temporanei con nome univoco (`tempfile`)
//! - Transcodifica con FFmpeg: 64 kbps, 1 o 2 canali, overwrite dell'output
//! - Cleanup garantito dei file temporanei su ogni percorso di uscita
//! - Verifica del channel mode del primo frame MP3 prodotto
//!
//! ## Formati supportati:
//! - **Input**: MP3, WAV, M4A, OGG
//! - **Output**: MP3 (libmp3lame) 64 kbps
//!
//! ## Pipeline di transcodifica:
//! 1. Valida l'estensione e crea i due file temporanei (`ingest-in-*.<ext>`, `ingest-out-*.mp3`)
//! 2. Scrive i bytes di input
//! 3. Esegue ffmpeg con timeout (default 600s), kill del processo allo scadere
//! 4. Rilegge l'output e controlla il numero di canali
//! 5. I `TempPath` vengono rimossi al drop, gli errori di rimozione sono ignorati
//!
//! ## Errori:
//! - Estensione non supportata → `Decode`
//! - ffmpeg con exit code != 0, timeout, output non MP3 → `Transcode`
//! - Spawn fallito o I/O sui file temporanei → `Io`
//!
//! ## Dipendenze richieste:
//! - `ffmpeg` (con encoder libmp3lame)
//!
//! ## Esempio:
//! ```ignore
//! let processor = AudioProcessor::new(&config);
//! let mp3 = processor.transcode("voice.m4a", &bytes, Channels::Mono).await?;
//! ```

use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::file_manager::FileManager;
use crate::platform::PlatformCommands;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, warn};

/// Fixed output bitrate
pub const AUDIO_BITRATE: &str = "64k";

/// Requested output channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    #[default]
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(&self) -> u8 {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }

    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(Channels::Mono),
            2 => Some(Channels::Stereo),
            _ => None,
        }
    }
}

/// Input container, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    M4a,
    Ogg,
}

impl AudioFormat {
    pub fn from_filename(name: &str) -> Option<Self> {
        match FileManager::extension_of(name)?.as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "m4a" => Some(AudioFormat::M4a),
            "ogg" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
        }
    }
}

/// Output name for a transcoded file
pub fn output_name(original_name: &str) -> String {
    FileManager::with_extension(original_name, "mp3")
}

/// Handles audio transcoding through ffmpeg
pub struct AudioProcessor {
    timeout: Duration,
    /// Transcoder binary; `PlatformCommands` resolution when unset
    program: Option<PathBuf>,
    /// Staging directory for temp files; the system temp dir when unset
    temp_dir: Option<PathBuf>,
}

impl AudioProcessor {
    pub fn new(config: &Config) -> Self {
        Self::with_timeout(config.transcode_timeout())
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            program: None,
            temp_dir: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Transcode `bytes` to a 64 kbps MP3 with the requested channel count
    pub async fn transcode(&self, name: &str, bytes: &[u8], channels: Channels) -> Result<Vec<u8>> {
        let result = self.transcode_inner(name, bytes, channels).await;
        if let Err(ref e) = result {
            warn!("Audio processing error: {}", e);
        }
        result
    }

    async fn transcode_inner(&self, name: &str, bytes: &[u8], channels: Channels) -> Result<Vec<u8>> {
        let format = AudioFormat::from_filename(name)
            .ok_or_else(|| IngestError::decode(name, "unsupported audio extension"))?;

        // Both paths are deleted when they go out of scope, whatever happens below
        let staging = self.temp_dir.as_deref();
        let input = temp_path(staging, "ingest-in-", &format!(".{}", format.extension()))?;
        let output = temp_path(staging, "ingest-out-", ".mp3")?;

        tokio::fs::write(&input, bytes).await?;
        self.run_ffmpeg(name, &input, &output, channels).await?;

        let mp3 = tokio::fs::read(&output).await?;
        match mp3_channel_count(&mp3) {
            Some(count) if count == channels.count() => {}
            Some(count) => {
                return Err(IngestError::transcode(
                    name,
                    format!("expected {} channel(s), ffmpeg produced {}", channels.count(), count),
                ))
            }
            None => return Err(IngestError::transcode(name, "output contains no MP3 frame")),
        }

        debug!(
            "Transcoded {} to {} channel MP3 ({})",
            name,
            channels.count(),
            FileManager::format_size(mp3.len() as u64)
        );
        Ok(mp3)
    }

    async fn run_ffmpeg(&self, name: &str, input: &Path, output: &Path, channels: Channels) -> Result<()> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => PlatformCommands::instance().program("ffmpeg"),
        };

        let mut cmd = Command::new(&program);
        cmd.args(ffmpeg_args(input, output, channels)).kill_on_drop(true);

        debug!("🔄 Running {:?} for {}", program, name);
        let start_time = Instant::now();

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                IngestError::transcode(name, format!("ffmpeg timed out after {}s", self.timeout.as_secs()))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IngestError::transcode(
                name,
                format!("ffmpeg exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        debug!("✅ ffmpeg finished {} in {:.1}s", name, start_time.elapsed().as_secs_f64());
        Ok(())
    }

    /// Check if required tools are available
    pub fn check_dependencies() -> Result<()> {
        if PlatformCommands::instance().is_command_available("ffmpeg") {
            Ok(())
        } else {
            Err(IngestError::MissingDependency(
                "ffmpeg is required for audio processing".to_string(),
            ))
        }
    }
}

fn temp_path(dir: Option<&Path>, prefix: &str, suffix: &str) -> Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(suffix);
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    Ok(file.into_temp_path())
}

/// Argument list for one ffmpeg invocation
pub fn ffmpeg_args(input: &Path, output: &Path, channels: Channels) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vn".to_string(),
        "-ac".to_string(),
        channels.count().to_string(),
        "-codec:a".to_string(),
        "libmp3lame".to_string(),
        "-b:a".to_string(),
        AUDIO_BITRATE.to_string(),
        "-f".to_string(),
        "mp3".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Channel count of the first MPEG-1/2 Layer III frame, skipping an ID3v2 tag.
///
/// Returns `None` when no plausible frame header is found.
pub fn mp3_channel_count(bytes: &[u8]) -> Option<u8> {
    let mut offset = 0usize;
    if bytes.len() >= 10 && &bytes[..3] == b"ID3" {
        // Syncsafe size: 4 bytes, 7 bits each
        let size = bytes[6..10]
            .iter()
            .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7f));
        offset = 10 + size;
        if bytes[5] & 0x10 != 0 {
            offset += 10;
        }
    }

    let header = bytes.get(offset..)?.windows(4).find(|h| is_layer3_header(h))?;
    // Channel mode 0b11 is single channel
    Some(if header[3] >> 6 == 0b11 { 1 } else { 2 })
}

fn is_layer3_header(h: &[u8]) -> bool {
    let version = (h[1] >> 3) & 0b11;
    let layer = (h[1] >> 1) & 0b11;
    let bitrate = h[2] >> 4;
    let sample_rate = (h[2] >> 2) & 0b11;

    h[0] == 0xFF
        && h[1] & 0xE0 == 0xE0
        && version != 0b01
        && layer == 0b01
        && bitrate != 0b1111
        && bitrate != 0
        && sample_rate != 0b11
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    // MPEG-1 Layer III, 64 kbps, 44.1 kHz
    fn frame_header(mono: bool) -> [u8; 4] {
        [0xFF, 0xFB, 0x50, if mono { 0xC4 } else { 0x44 }]
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(AudioFormat::from_filename("a.WAV"), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::from_filename("b.m4a"), Some(AudioFormat::M4a));
        assert_eq!(AudioFormat::from_filename("c.ogg"), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::from_filename("d.flac"), None);
        assert_eq!(AudioFormat::from_filename("noext"), None);
    }

    #[test]
    fn test_ffmpeg_args() {
        let args = ffmpeg_args(&PathBuf::from("/tmp/in.wav"), &PathBuf::from("/tmp/out.mp3"), Channels::Stereo);
        let joined = args.join(" ");
        assert!(joined.contains("-ac 2"));
        assert!(joined.contains("-b:a 64k"));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.mp3"));
    }

    #[test]
    fn test_channels() {
        assert_eq!(Channels::Mono.count(), 1);
        assert_eq!(Channels::from_count(2), Some(Channels::Stereo));
        assert_eq!(Channels::from_count(3), None);
        assert_eq!(output_name("take 1.wav"), "take 1.mp3");
    }

    #[test]
    fn test_mp3_channel_count() {
        let mut mono = vec![0u8; 16];
        mono.extend_from_slice(&frame_header(true));
        assert_eq!(mp3_channel_count(&mono), Some(1));

        // ID3v2 tag with a 4 byte body that must be skipped
        let mut tagged = b"ID3\x04\x00\x00\x00\x00\x00\x04".to_vec();
        tagged.extend_from_slice(&[0xFF, 0xFB, 0x50, 0xC4]);
        tagged.extend_from_slice(&frame_header(false));
        assert_eq!(mp3_channel_count(&tagged), Some(2));

        assert_eq!(mp3_channel_count(b"RIFF....WAVEfmt "), None);
    }

    #[tokio::test]
    async fn test_unsupported_extension_fails_before_spawn() {
        let processor = AudioProcessor::with_timeout(Duration::from_secs(5));
        let err = processor
            .transcode("notes.txt", b"hello", Channels::Mono)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    fn leftover_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_temp_files_removed_when_spawn_fails() {
        let staging = tempfile::TempDir::new().unwrap();
        let processor = AudioProcessor::with_timeout(Duration::from_secs(5))
            .with_program(staging.path().join("no-such-ffmpeg"))
            .with_temp_dir(staging.path());

        let err = processor
            .transcode("voice.wav", b"RIFF", Channels::Mono)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(leftover_files(staging.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_files_removed_on_transcoder_failure() {
        // `false` exits non-zero, `true` exits zero without writing any MP3
        for program in ["false", "true"] {
            let staging = tempfile::TempDir::new().unwrap();
            let processor = AudioProcessor::with_timeout(Duration::from_secs(5))
                .with_program(program)
                .with_temp_dir(staging.path());

            let err = processor
                .transcode("voice.ogg", b"OggS", Channels::Stereo)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Transcode, "program {}", program);
            assert!(leftover_files(staging.path()).is_empty(), "program {}", program);
        }
    }
}
