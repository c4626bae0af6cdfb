//! Encoding of user files into transportable payloads.

use super::error::{GenerationError, ValidationError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file encoded for transport: base64 data plus its name and MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Infers an image MIME type from a file extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Reads and encodes a single image file.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<Attachment, GenerationError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime_type =
        mime_type_for(path).ok_or_else(|| ValidationError::UnsupportedMediaType(name.clone()))?;

    let bytes = tokio::fs::read(path).await?;
    tracing::debug!(file = %name, size = bytes.len(), "Encoded attachment");
    Ok(Attachment::from_bytes(name, mime_type, &bytes))
}

/// Encodes all files, failing if any one of them fails. Order is preserved.
pub async fn encode_files<P>(paths: &[P]) -> Result<Vec<Attachment>, GenerationError>
where
    P: AsRef<Path>,
{
    try_join_all(paths.iter().map(encode_file)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_encodes_base64() {
        let attachment = Attachment::from_bytes("a.png", "image/png", b"hello");
        assert_eq!(attachment.data, "aGVsbG8=");
        assert!(attachment.is_image());
        assert!(!Attachment::from_bytes("a.pdf", "application/pdf", b"").is_image());
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("shoe.PNG")), Some("image/png"));
        assert_eq!(mime_type_for(Path::new("x/y.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type_for(Path::new("notes.txt")), None);
        assert_eq!(mime_type_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_encode_files_preserves_order() {
        let dir = std::env::temp_dir().join(format!("creative-ai-encode-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let first = dir.join("first.png");
        let second = dir.join("second.jpg");
        tokio::fs::write(&first, b"one").await.unwrap();
        tokio::fs::write(&second, b"two").await.unwrap();

        let encoded = encode_files(&[&first, &second]).await.unwrap();
        assert_eq!(encoded[0].name, "first.png");
        assert_eq!(encoded[0].data, STANDARD.encode(b"one"));
        assert_eq!(encoded[1].mime_type, "image/jpeg");

        let err = encode_files(&[dir.join("missing.png")]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Io(_)));

        let err = encode_file(dir.join("notes.txt")).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Validation(ValidationError::UnsupportedMediaType(_))
        ));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
