use mime::Mime;

/// Blob store for uploaded model papers.
pub trait PaperStorage: Send + Sync {
    /// Persists `bytes` under `key` and returns the public URL.
    fn store(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access paper storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("paper storage unavailable: {0}")]
    Unavailable(String),
}

/// Media type for an uploaded paper, or `None` when the type is not accepted.
///
/// PDF, Word, plain text, and raster images are allowed; detection is by
/// extension. SVG is refused since it can carry script.
pub fn paper_media_type(file_name: &str) -> Option<Mime> {
    let guessed = mime_guess::from_path(file_name).first()?;
    let allowed = guessed == mime::APPLICATION_PDF
        || guessed == mime::TEXT_PLAIN
        || (guessed.type_() == mime::IMAGE && guessed != mime::IMAGE_SVG)
        || matches!(
            guessed.essence_str(),
            "application/msword"
                | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    allowed.then_some(guessed)
}

/// Extension used for the stored object, taken from the display name.
pub fn paper_extension(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documents_and_images_only() {
        for name in ["paper.pdf", "notes.TXT", "set.docx", "old.doc", "scan.png", "a.jpeg"] {
            assert!(paper_media_type(name).is_some(), "{name}");
        }
        for name in ["archive.zip", "script.sh", "noextension", "sheet.xlsx", "logo.svg"] {
            assert!(paper_media_type(name).is_none(), "{name}");
        }
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(paper_extension("Paper.PDF").as_deref(), Some("pdf"));
        assert_eq!(paper_extension("paper"), None);
    }
}
