// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document validator — size policy and PDF signature checks, run in that order
// before anything is parsed.

use pagecraft_core::SessionPolicy;
use pagecraft_core::error::{PagecraftError, Result};
use tracing::{debug, instrument, warn};

/// Every PDF starts with this header at byte offset 0.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Gatekeeper for raw buffers entering the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct DocumentValidator {
    max_size_bytes: u64,
}

impl DocumentValidator {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    pub fn from_policy(policy: &SessionPolicy) -> Self {
        Self::new(policy.max_file_size_bytes)
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Reject a file whose declared size is over the limit.
    ///
    /// Runs before a `SourceDocument` exists: a rejected file never enters
    /// the document list.
    pub fn check_size(&self, file: &str, size_bytes: u64) -> Result<()> {
        if size_bytes > self.max_size_bytes {
            warn!(file, size_bytes, limit = self.max_size_bytes, "file over size policy");
            return Err(PagecraftError::OversizedInput {
                file: file.to_string(),
                size_bytes,
                limit_bytes: self.max_size_bytes,
            });
        }
        Ok(())
    }

    /// Require the PDF magic bytes at offset 0.
    pub fn check_signature(&self, file: &str, bytes: &[u8]) -> Result<()> {
        if !bytes.starts_with(PDF_SIGNATURE) {
            warn!(file, "missing PDF header signature");
            return Err(PagecraftError::InvalidSignature {
                file: file.to_string(),
            });
        }
        Ok(())
    }

    /// Both checks, in order. The larger of the declared and actual sizes is
    /// held against the limit so an understated declaration cannot slip by.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn validate(&self, file: &str, declared_size: u64, bytes: &[u8]) -> Result<()> {
        let size = declared_size.max(bytes.len() as u64);
        self.check_size(file, size)?;
        self.check_signature(file, bytes)?;
        debug!(file, size, "signature and size accepted");
        Ok(())
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::from_policy(&SessionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_header_within_limit() {
        let validator = DocumentValidator::new(64);
        assert!(validator.validate("a.pdf", 9, b"%PDF-1.7\n").is_ok());
    }

    #[test]
    fn size_is_checked_before_signature() {
        let validator = DocumentValidator::new(4);
        let err = validator.validate("big.txt", 100, b"hello").unwrap_err();
        assert!(matches!(err, PagecraftError::OversizedInput { size_bytes: 100, .. }));
    }

    #[test]
    fn understated_declared_size_uses_actual_length() {
        let validator = DocumentValidator::new(8);
        let err = validator.validate("liar.pdf", 1, b"%PDF-1.7 and more").unwrap_err();
        assert!(matches!(err, PagecraftError::OversizedInput { size_bytes: 17, .. }));
    }

    #[test]
    fn header_must_be_at_offset_zero() {
        let validator = DocumentValidator::default();
        let err = validator.check_signature("shifted.pdf", b"  %PDF-1.4").unwrap_err();
        assert!(matches!(err, PagecraftError::InvalidSignature { ref file } if file == "shifted.pdf"));
    }

    #[test]
    fn empty_buffer_fails_signature() {
        let validator = DocumentValidator::default();
        assert!(validator.check_signature("empty.pdf", b"").is_err());
    }

    #[test]
    fn limit_is_inclusive() {
        let validator = DocumentValidator::new(10);
        assert!(validator.check_size("edge.pdf", 10).is_ok());
        assert!(validator.check_size("edge.pdf", 11).is_err());
    }
}
