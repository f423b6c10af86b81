//! Input validation: make sure the path names a readable PDF.
//!
//! pdfium reports every failure as an opaque load error. Checking existence,
//! permissions and the `%PDF` magic bytes first gives callers a precise error
//! and guarantees a missing file fails before any model call is made.

use crate::error::BankParserError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes at the start of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate a local PDF path and return it as an owned `PathBuf`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, BankParserError> {
    if !path.exists() {
        return Err(BankParserError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BankParserError::Extraction {
                path: path.to_path_buf(),
                detail: "permission denied".into(),
            });
        }
        Err(e) => {
            return Err(BankParserError::Extraction {
                path: path.to_path_buf(),
                detail: e.to_string(),
            });
        }
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != PDF_MAGIC {
        return Err(BankParserError::Extraction {
            path: path.to_path_buf(),
            detail: format!("not a PDF file (first bytes: {magic:?})"),
        });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path.to_path_buf())
}
