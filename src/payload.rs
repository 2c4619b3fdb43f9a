//! Payload construction: flat and interleaved layouts, plus the explicit
//! positional-tag template helpers.
//!
//! Two layouts are supported for the main generation path:
//! - **flat** — the text context followed by all resolved media parts;
//! - **interleaved** — the context carries `<media_N>` placeholders that are
//!   substituted in place by the Nth resolved part.
//!
//! The template helpers use 1-based `[img{N}]` / `[audio{N}]` / `[video{N}]`
//! tags instead of the generic placeholder scheme. Note the asymmetric
//! failure policy: the main path drops a video whose upload failed, while
//! [`video_audio_text_message`] short-circuits to `None` — callers must
//! check before treating the return value as a payload.

use crate::client::GeminiClient;
use crate::media::{video_mime_type, Part};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

static MEDIA_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<media_(\d+)>").unwrap());
static HELPER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<image>|<audio>|<video>").unwrap());

/// Flat layout: the context followed by all resolved media parts.
pub fn flat(context: &str, media: Vec<Part>) -> Vec<Part> {
    let mut parts = Vec::with_capacity(media.len() + 1);
    parts.push(Part::text(context));
    parts.extend(media);
    parts
}

/// Interleaved layout: split the context on `<media_N>` placeholders and
/// substitute the Nth resolved part in place. Empty text segments adjacent
/// to placeholders are dropped. A placeholder index past the end of the
/// media list (e.g. after a dropped upload) is logged and skipped.
pub fn interleaved(context: &str, media: &[Part]) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut cursor = 0;
    for caps in MEDIA_TAG.captures_iter(context) {
        let m = caps.get(0).expect("capture 0 always present");
        let text = &context[cursor..m.start()];
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        cursor = m.end();

        let index: usize = match caps[1].parse() {
            Ok(i) => i,
            Err(_) => continue,
        };
        match media.get(index) {
            Some(part) => parts.push(part.clone()),
            None => warn!(index, available = media.len(), "media placeholder out of range"),
        }
    }
    let tail = &context[cursor..];
    if !tail.is_empty() {
        parts.push(Part::text(tail));
    }
    parts
}

/// Build an interleaved message from image paths, audio paths, and a
/// question template using explicit 1-based `[img{N}]` / `[audio{N}]` tags.
/// Images are loaded from disk as inline parts; audio files as raw
/// WAV-bytes inline parts.
pub fn image_audio_text_message(
    image_paths: &[PathBuf],
    audio_paths: &[PathBuf],
    question: &str,
) -> Result<Vec<Part>> {
    let mut text = question.to_string();
    for index in 1..=image_paths.len() {
        text = text.replace(&format!("[img{index}]"), "<image>");
    }
    for index in 1..=audio_paths.len() {
        text = text.replace(&format!("[audio{index}]"), "<audio>");
    }

    let mut parts = Vec::new();
    let mut image_counter = 0;
    let mut audio_counter = 0;
    for segment in split_on_helper_tags(&text) {
        match segment {
            "<image>" => {
                let path = image_paths
                    .get(image_counter)
                    .ok_or_else(|| Error::configuration("more image tags than image paths"))?;
                parts.push(Part::inline(image_mime_type(path), std::fs::read(path)?));
                image_counter += 1;
            }
            "<audio>" => {
                let path = audio_paths
                    .get(audio_counter)
                    .ok_or_else(|| Error::configuration("more audio tags than audio paths"))?;
                parts.push(Part::inline("audio/wav", std::fs::read(path)?));
                audio_counter += 1;
            }
            other => {
                if other.is_empty() || other == " " {
                    continue;
                }
                parts.push(Part::text(other));
            }
        }
    }
    Ok(parts)
}

/// Analogue of [`image_audio_text_message`] for `[video{N}]` tags. Videos
/// are uploaded inline with processing-poll handling; if any upload ends in
/// a failed state the whole call resolves to `Ok(None)` rather than a
/// partial payload.
pub async fn video_audio_text_message(
    client: &GeminiClient,
    video_paths: &[PathBuf],
    audio_paths: &[PathBuf],
    question: &str,
) -> Result<Option<Vec<Part>>> {
    let mut text = question.to_string();
    for index in 1..=video_paths.len() {
        text = text.replace(&format!("[video{index}]"), "<video>");
    }
    for index in 1..=audio_paths.len() {
        text = text.replace(&format!("[audio{index}]"), "<audio>");
    }

    let mut parts = Vec::new();
    let mut video_counter = 0;
    let mut audio_counter = 0;
    for segment in split_on_helper_tags(&text) {
        match segment {
            "<video>" => {
                let path = video_paths
                    .get(video_counter)
                    .ok_or_else(|| Error::configuration("more video tags than video paths"))?;
                video_counter += 1;
                match upload_video(client, path).await {
                    Ok(handle) => parts.push(Part::File(handle)),
                    Err(Error::UploadFailed { name }) => {
                        warn!(%name, path = %path.display(), "video upload failed, dropping message");
                        return Ok(None);
                    }
                    Err(other) => return Err(other),
                }
            }
            "<audio>" => {
                let path = audio_paths
                    .get(audio_counter)
                    .ok_or_else(|| Error::configuration("more audio tags than audio paths"))?;
                parts.push(Part::inline("audio/wav", std::fs::read(path)?));
                audio_counter += 1;
            }
            other => {
                if other.is_empty() || other == " " {
                    continue;
                }
                parts.push(Part::text(other));
            }
        }
    }
    Ok(Some(parts))
}

/// Upload a video file and wait until the service finishes processing it.
pub async fn upload_video(client: &GeminiClient, path: &Path) -> Result<crate::media::FileHandle> {
    let bytes = tokio::fs::read(path).await?;
    let display_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video");
    let handle = client
        .upload_file(bytes, video_mime_type(path), display_name)
        .await?;
    client.wait_until_active(handle).await
}

/// Split text into alternating plain segments and helper tags, both yielded
/// in order.
fn split_on_helper_tags(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for m in HELPER_TAG.find_iter(text) {
        segments.push(&text[cursor..m.start()]);
        segments.push(m.as_str());
        cursor = m.end();
    }
    segments.push(&text[cursor..]);
    segments
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::FileState;
    use std::io::Write;
    use tempfile::tempdir;

    fn marker(n: u8) -> Part {
        Part::inline("image/png", vec![n])
    }

    #[test]
    fn test_interleaved_basic() {
        let media = vec![marker(0), marker(1)];
        let parts = interleaved("look at <media_0> and <media_1>", &media);
        assert_eq!(
            parts,
            vec![
                Part::text("look at "),
                marker(0),
                Part::text(" and "),
                marker(1),
            ]
        );
    }

    #[test]
    fn test_interleaved_no_empty_boundary_segments() {
        let media = vec![marker(0)];
        let parts = interleaved("<media_0>", &media);
        assert_eq!(parts, vec![marker(0)]);

        let parts = interleaved("<media_0> trailing", &media);
        assert_eq!(parts, vec![marker(0), Part::text(" trailing")]);
    }

    #[test]
    fn test_interleaved_out_of_range_placeholder_skipped() {
        let media = vec![marker(0)];
        let parts = interleaved("a <media_0> b <media_3> c", &media);
        assert_eq!(
            parts,
            vec![
                Part::text("a "),
                marker(0),
                Part::text(" b "),
                Part::text(" c"),
            ]
        );
    }

    #[test]
    fn test_interleaved_without_placeholders() {
        let parts = interleaved("plain question", &[]);
        assert_eq!(parts, vec![Part::text("plain question")]);
    }

    #[test]
    fn test_flat_layout() {
        let parts = flat("describe", vec![marker(0), marker(1)]);
        assert_eq!(
            parts,
            vec![Part::text("describe"), marker(0), marker(1)]
        );
    }

    #[test]
    fn test_image_audio_text_message_tags() {
        let dir = tempdir().unwrap();
        let img = dir.path().join("frame.jpg");
        let wav = dir.path().join("speech.wav");
        std::fs::File::create(&img).unwrap().write_all(b"jpgdata").unwrap();
        std::fs::File::create(&wav).unwrap().write_all(b"wavdata").unwrap();

        let parts = image_audio_text_message(
            &[img],
            &[wav],
            "[img1] What is said in [audio1]?",
        )
        .unwrap();
        assert_eq!(
            parts,
            vec![
                Part::inline("image/jpeg", b"jpgdata".to_vec()),
                Part::text(" What is said in "),
                Part::inline("audio/wav", b"wavdata".to_vec()),
                Part::text("?"),
            ]
        );
    }

    #[test]
    fn test_single_space_segments_dropped() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"A").unwrap();
        std::fs::write(&b, b"B").unwrap();

        let parts = image_audio_text_message(&[a, b], &[], "[img1] [img2]").unwrap();
        assert_eq!(
            parts,
            vec![
                Part::inline("image/png", b"A".to_vec()),
                Part::inline("image/png", b"B".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_video_helper_sentinel_on_failed_upload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Regex("^/upload/v1beta/files".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"file":{"name":"files/bad","state":"FAILED"}}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"notavideo").unwrap();

        let client = GeminiClient::new(
            server.url(),
            std::time::Duration::from_secs(5),
            std::time::Duration::ZERO,
        )
        .unwrap();
        let result = video_audio_text_message(&client, &[video], &[], "[video1] what happens?")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_video_helper_successful_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", mockito::Matcher::Regex("^/upload/v1beta/files".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"file":{"name":"files/ok","uri":"https://svc/files/ok","mimeType":"video/mp4","state":"ACTIVE"}}"#,
            )
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"notavideo").unwrap();

        let client = GeminiClient::new(
            server.url(),
            std::time::Duration::from_secs(5),
            std::time::Duration::ZERO,
        )
        .unwrap();
        let parts = video_audio_text_message(&client, &[video], &[], "[video1] what happens?")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parts.len(), 2);
        match &parts[0] {
            Part::File(handle) => assert_eq!(handle.state, FileState::Active),
            other => panic!("expected file part, got {other:?}"),
        }
        assert_eq!(parts[1], Part::text(" what happens?"));
    }
}
