// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session policy: size and timeout limits plus preview settings.

use serde::{Deserialize, Serialize};

use crate::error::{PagecraftError, Result};

/// 15 MiB, the default per-file ingestion limit.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 15 * 1024 * 1024;

/// Seconds between completion and automatic purge.
pub const DEFAULT_PURGE_AFTER_SECS: u32 = 300;

/// Policy values fixed at session construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Files larger than this are rejected before any parse is attempted.
    pub max_file_size_bytes: u64,
    /// Countdown start value once an operation completes.
    pub purge_after_secs: u32,
    /// PDF points to preview pixels.
    pub thumbnail_scale: f32,
    /// Longest preview edge in pixels, whatever the page size.
    pub thumbnail_max_edge: u32,
    /// JPEG quality for previews (1-100).
    pub thumbnail_jpeg_quality: u8,
    /// First component of generated output filenames.
    pub output_prefix: String,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            purge_after_secs: DEFAULT_PURGE_AFTER_SECS,
            thumbnail_scale: 0.3,
            thumbnail_max_edge: 512,
            thumbnail_jpeg_quality: 80,
            output_prefix: "pagecraft".to_string(),
        }
    }
}

impl SessionPolicy {
    /// Parse a policy from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(PagecraftError::InvalidPolicy(
                "max_file_size_bytes must be positive".into(),
            ));
        }
        if self.purge_after_secs == 0 {
            return Err(PagecraftError::InvalidPolicy(
                "purge_after_secs must be positive".into(),
            ));
        }
        if !(self.thumbnail_scale > 0.0 && self.thumbnail_scale.is_finite()) {
            return Err(PagecraftError::InvalidPolicy(format!(
                "thumbnail_scale must be a positive number, got {}",
                self.thumbnail_scale
            )));
        }
        if self.thumbnail_max_edge == 0 {
            return Err(PagecraftError::InvalidPolicy(
                "thumbnail_max_edge must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnail_jpeg_quality) {
            return Err(PagecraftError::InvalidPolicy(format!(
                "thumbnail_jpeg_quality must be within 1..=100, got {}",
                self.thumbnail_jpeg_quality
            )));
        }
        Ok(())
    }

    /// The size limit in whole MiB, for user-facing messages.
    pub fn max_file_size_mib(&self) -> u64 {
        self.max_file_size_bytes / (1024 * 1024)
    }
}
