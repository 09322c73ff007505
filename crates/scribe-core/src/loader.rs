//! Background loading.
//!
//! A [`Loader`] collects raw bytes, typically on a reader thread, and is then moved to the
//! editing thread and turned into a [`DocumentHandle`]. Until conversion it holds no shared
//! state, so it is `Send`; the document it produces is not.

use crate::config::DocumentOptions;
use crate::document::{Document, DocumentHandle};
use crate::error::{CoreError, CoreResult};

/// Result of [`Loader::add_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The chunk was buffered.
    Ok,
    /// The chunk would exceed the size limit and was discarded.
    TooLarge,
}

/// Accumulates document bytes before a document exists.
#[derive(Debug, Clone)]
pub struct Loader {
    data: Vec<u8>,
    limit: Option<usize>,
    options: DocumentOptions,
    failed: bool,
}

impl Loader {
    /// A loader reserving `capacity` bytes for documents built with `options`.
    pub fn new(capacity: usize, options: DocumentOptions) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            limit: None,
            options,
            failed: false,
        }
    }

    /// Refuse data beyond `limit` bytes.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` before any data arrived.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a chunk.
    ///
    /// Once a chunk is refused the loader stays failed and conversion reports
    /// [`CoreError::LoadFailed`].
    pub fn add_data(&mut self, bytes: &[u8]) -> LoadStatus {
        if self.failed {
            return LoadStatus::TooLarge;
        }
        if let Some(limit) = self.limit
            && self.data.len() + bytes.len() > limit
        {
            tracing::warn!(target: "scribe.loader", buffered = self.data.len(), chunk = bytes.len(), limit, "load size limit exceeded");
            self.failed = true;
            return LoadStatus::TooLarge;
        }
        self.data.extend_from_slice(bytes);
        LoadStatus::Ok
    }

    /// Build a document from the buffered bytes.
    ///
    /// The text must be UTF-8. The new document has an empty undo history and sits at its
    /// save point.
    pub fn convert_to_document(self) -> CoreResult<DocumentHandle> {
        if self.failed {
            return Err(CoreError::LoadFailed("data exceeded the load size limit".to_string()));
        }
        let text = std::str::from_utf8(&self.data)?;
        let mut document = Document::new(&self.options);
        document.load_text(text)?;
        tracing::debug!(
            target: "scribe.loader",
            bytes = self.data.len(),
            lines = document.line_count(),
            "converted loaded data to document"
        );
        Ok(DocumentHandle::new(document))
    }

    /// Abandon the load.
    pub fn release(self) {
        tracing::debug!(target: "scribe.loader", bytes = self.data.len(), "released loader");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_become_document() {
        let mut loader = Loader::new(16, DocumentOptions::default());
        assert_eq!(loader.add_data(b"one\r\n"), LoadStatus::Ok);
        assert_eq!(loader.add_data(b"two"), LoadStatus::Ok);
        assert_eq!(loader.len(), 8);
        let handle = loader.convert_to_document().unwrap();
        let doc = handle.borrow();
        assert_eq!(doc.text(), "one\ntwo");
        assert_eq!(doc.line_count(), 2);
        assert!(doc.is_save_point());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_limit_and_invalid_utf8() {
        let mut loader = Loader::new(0, DocumentOptions::default()).with_limit(4);
        assert_eq!(loader.add_data(b"abc"), LoadStatus::Ok);
        assert_eq!(loader.add_data(b"de"), LoadStatus::TooLarge);
        assert_eq!(loader.add_data(b"d"), LoadStatus::TooLarge);
        assert!(matches!(loader.convert_to_document(), Err(CoreError::LoadFailed(_))));

        let mut loader = Loader::new(0, DocumentOptions::default());
        loader.add_data(&[0x66, 0xFF]);
        assert!(matches!(loader.convert_to_document(), Err(CoreError::InvalidUtf8(_))));
    }

    #[test]
    fn test_loader_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Loader>();
    }
}
