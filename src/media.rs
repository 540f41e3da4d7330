use crate::error::UnsupportedMediaError;
use crate::types::Attachment;
use std::fs;
use std::path::Path;

const ACCEPTED_PREFIXES: &[&str] = &["image/", "video/", "audio/", "text/"];
const TEXT_SNIFF_LEN: usize = 512;

/// An accepted attachment with its bytes, read before the request leaves the
/// owning thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentPayload {
    pub attachment: Attachment,
    pub bytes: Vec<u8>,
}

impl AttachmentPayload {
    pub fn mime_type(&self) -> &str {
        &self.attachment.mime_type
    }

    /// The payload as text, for backends that only accept text.
    pub fn as_text(&self) -> Option<&str> {
        if self.attachment.mime_type.starts_with("text/") {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }
}

pub fn is_accepted_mime(mime_type: &str) -> bool {
    ACCEPTED_PREFIXES
        .iter()
        .any(|prefix| mime_type.starts_with(prefix))
        || mime_type == "application/pdf"
}

/// No NUL in the first 512 bytes and the whole file decodes as UTF-8.
pub fn looks_like_text(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    !head.contains(&0) && std::str::from_utf8(bytes).is_ok()
}

/// Classifies a file purely from its name; `None` means no guess.
pub fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|mime| mime.to_string())
}

/// Runs the MIME gate and reads the file.
pub fn load_attachment(path: &Path) -> Result<AttachmentPayload, UnsupportedMediaError> {
    let guessed = guess_mime(path);
    if let Some(mime_type) = &guessed
        && !is_accepted_mime(mime_type)
    {
        return Err(UnsupportedMediaError::UnsupportedType {
            path: path.to_path_buf(),
            mime_type: mime_type.clone(),
        });
    }

    let bytes = fs::read(path).map_err(|source| UnsupportedMediaError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mime_type = match guessed {
        Some(mime_type) => mime_type,
        None if looks_like_text(&bytes) => "text/plain".to_string(),
        None => {
            return Err(UnsupportedMediaError::NotText {
                path: path.to_path_buf(),
            });
        }
    };

    tracing::debug!(path = %path.display(), %mime_type, size = bytes.len(), "attachment accepted");
    Ok(AttachmentPayload {
        attachment: Attachment::new(mime_type, path),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_mime_types() {
        assert!(is_accepted_mime("image/png"));
        assert!(is_accepted_mime("text/csv"));
        assert!(is_accepted_mime("application/pdf"));
        assert!(!is_accepted_mime("application/zip"));
    }

    #[test]
    fn test_text_detection() {
        assert!(looks_like_text(b"a,b,c\n1,2,3\n"));
        assert!(!looks_like_text(b"MZ\x90\x00\x03"));
        assert!(!looks_like_text(&[0xff, 0xfe, 0x41]));
    }

    #[test]
    fn test_guess_from_extension() {
        assert_eq!(guess_mime(Path::new("photo.png")).as_deref(), Some("image/png"));
        assert_eq!(guess_mime(Path::new("no_extension")), None);
    }
}
