use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Storage for recorded answers. Returns the public reference of the saved
/// asset.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn save(&self, audio: &[u8], mime_type: &str) -> Result<String>;
}

/// File extension for a recorded-audio MIME type. Parameters such as
/// `;codecs=opus` are ignored; unknown types are stored as webm.
pub fn audio_extension(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/ogg" => "ogg",
        _ => "webm",
    }
}

/// Writes `<uuid>.<ext>` files into a local directory served under
/// `/uploads`.
#[derive(Clone)]
pub struct LocalAudioStore {
    dir: PathBuf,
}

impl LocalAudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AudioStore for LocalAudioStore {
    async fn save(&self, audio: &[u8], mime_type: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::BadRequest("Empty audio upload".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await.map_err(Error::Io)?;
        let filename = format!("{}.{}", Uuid::new_v4(), audio_extension(mime_type));
        tokio::fs::write(self.dir.join(&filename), audio)
            .await
            .map_err(Error::Io)?;
        Ok(format!("/uploads/{}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_under_uploads_reference() {
        let dir = std::env::temp_dir().join(format!("practice-audio-{}", Uuid::new_v4()));
        let store = LocalAudioStore::new(&dir);

        let reference = store.save(b"fake-webm", "audio/webm").await.unwrap();
        assert!(reference.starts_with("/uploads/"));
        assert!(reference.ends_with(".webm"));

        let name = reference.trim_start_matches("/uploads/");
        let written = tokio::fs::read(dir.join(name)).await.unwrap();
        assert_eq!(written, b"fake-webm");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn extension_follows_mime_type() {
        let dir = std::env::temp_dir().join(format!("practice-audio-{}", Uuid::new_v4()));
        let store = LocalAudioStore::new(&dir);

        let mp3 = store.save(b"id3", "audio/mpeg").await.unwrap();
        assert!(mp3.ends_with(".mp3"), "{}", mp3);
        let opus = store.save(b"ogg", "audio/ogg; codecs=opus").await.unwrap();
        assert!(opus.ends_with(".ogg"), "{}", opus);
        let unknown = store.save(b"raw", "application/octet-stream").await.unwrap();
        assert!(unknown.ends_with(".webm"), "{}", unknown);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn mime_parameters_and_case_are_ignored() {
        assert_eq!(audio_extension("audio/webm;codecs=opus"), "webm");
        assert_eq!(audio_extension("Audio/X-WAV"), "wav");
        assert_eq!(audio_extension("audio/mp4"), "m4a");
    }

    #[tokio::test]
    async fn rejects_empty_audio() {
        let store = LocalAudioStore::new(std::env::temp_dir());
        assert!(store.save(b"", "audio/webm").await.is_err());
    }
}
