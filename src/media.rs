//! Media items, payload parts, and uploaded-file handles.
//!
//! The resolver classifies each document attachment exactly once into a
//! [`MediaItem`] variant; nothing downstream re-infers the kind from shape.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// One media attachment of a document, decided at resolution time.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaItem {
    /// Raw image bytes with their MIME type.
    Image { bytes: Vec<u8>, mime_type: String },
    /// Decoded audio samples with their sampling rate.
    Audio(AudioClip),
    /// Path of a video file on local storage.
    Video { path: PathBuf },
}

impl MediaItem {
    pub fn image(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self::Video { path: path.into() }
    }
}

/// A mono audio buffer with its sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sampling_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sampling_rate: u32) -> Self {
        Self {
            samples,
            sampling_rate,
        }
    }

    /// Encode the clip into a standard WAV container (32-bit float mono).
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sampling_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

/// Opaque reference to a resource uploaded to the remote file service.
///
/// Held only for the duration of one request's API call; video handles are
/// deleted remotely once the call resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

impl Default for FileState {
    fn default() -> Self {
        Self::Unknown
    }
}

/// One element of an ordered payload sequence sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A text segment.
    Text(String),
    /// An inline blob (image bytes, WAV audio bytes).
    Inline { mime_type: String, data: Vec<u8> },
    /// A remotely uploaded resource.
    File(FileHandle),
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Inline {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Guess a video MIME type from a file extension. The service requires one
/// on upload; unknown extensions fall back to MP4.
pub fn video_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("mpg") | Some("mpeg") => "video/mpeg",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_encoding_header() {
        let clip = AudioClip::new(vec![0.0, 0.5, -0.5, 0.25], 16_000);
        let bytes = clip.to_wav_bytes().unwrap();
        // RIFF....WAVE container magic
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 4 samples * 4 bytes each must be present after the headers
        assert!(bytes.len() > 44);
    }

    #[test]
    fn test_wav_round_trip() {
        let clip = AudioClip::new(vec![0.1, -0.2, 0.3], 22_050);
        let bytes = clip.to_wav_bytes().unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_video_mime_type() {
        assert_eq!(video_mime_type(Path::new("clip.webm")), "video/webm");
        assert_eq!(video_mime_type(Path::new("clip.MOV")), "video/quicktime");
        assert_eq!(video_mime_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(video_mime_type(Path::new("clip")), "video/mp4");
    }

    #[test]
    fn test_file_state_deserialization() {
        let handle: FileHandle = serde_json::from_str(
            r#"{"name":"files/abc123","uri":"https://x/files/abc123","mimeType":"video/mp4","state":"PROCESSING"}"#,
        )
        .unwrap();
        assert_eq!(handle.state, FileState::Processing);
        assert_eq!(handle.mime_type, "video/mp4");
    }
}
