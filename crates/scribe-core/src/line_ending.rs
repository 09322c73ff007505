//! Line ending helpers.
//!
//! Buffers store LF (`'\n'`) line endings only. Text loaded with CRLF (`"\r\n"`) is normalised
//! on the way in, and the detected ending is remembered so it can be restored on save.

use serde::{Deserialize, Serialize};

/// The newline sequence used when saving a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Detect the line ending of a source text: CRLF if any `"\r\n"` occurs, LF otherwise.
    pub fn detect_in_bytes(bytes: &[u8]) -> Self {
        if bytes.windows(2).any(|pair| pair == b"\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// Detect the line ending of a source text.
    pub fn detect_in_text(text: &str) -> Self {
        Self::detect_in_bytes(text.as_bytes())
    }

    /// The newline sequence itself.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
        }
    }

    /// Convert LF-normalised text to this line ending.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            Self::Crlf => text.replace('\n', "\r\n"),
        }
    }
}

/// Replace every `"\r\n"` with `'\n'`. Lone `'\r'` bytes are kept.
pub fn normalize_to_lf(text: &str) -> String {
    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text.to_string()
    }
}
