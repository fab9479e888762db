// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every user-visible failure names the offending file or operation and a cause
// category. Nothing is retried automatically: the user resubmits.

use crate::error::PagecraftError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user can fix this (remove a file, add another, reset).
    ActionRequired,
    /// The input itself is unusable; retrying will not help.
    Permanent,
    /// Cosmetic only; the pipeline carried on.
    Degraded,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary naming the file or operation.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Stable cause category, e.g. "file too large".
    pub category: &'static str,
    /// Always false for file and operation errors.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `PagecraftError` into a `HumanError`.
pub fn humanize_error(err: &PagecraftError) -> HumanError {
    match err {
        PagecraftError::OversizedInput {
            file, limit_bytes, ..
        } => HumanError {
            message: format!(
                "\"{file}\" exceeds the {} MB processing limit.",
                limit_bytes / (1024 * 1024)
            ),
            suggestion: "Use a smaller file, or split it first.".into(),
            category: "file too large",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::InvalidSignature { file } => HumanError {
            message: format!("\"{file}\" is not a PDF file."),
            suggestion: "Only PDF documents can be added. Remove it and choose a PDF.".into(),
            category: "not a PDF",
            retriable: false,
            severity: Severity::Permanent,
        },

        PagecraftError::CorruptDocument { file, detail } => {
            let protected = detail.to_ascii_lowercase().contains("password");
            HumanError {
                message: if protected {
                    format!("\"{file}\" is password-protected.")
                } else {
                    format!("Failed to load \"{file}\".")
                },
                suggestion: "The file might be corrupted, password-protected, or not a valid PDF. Remove it and try another copy.".into(),
                category: "damaged or protected file",
                retriable: false,
                severity: Severity::Permanent,
            }
        }

        PagecraftError::AssemblyPrecondition { operation, reason } => HumanError {
            message: format!("{operation} can't start yet: {reason}."),
            suggestion: "Add or fix the input documents, then run it again.".into(),
            category: "not enough input",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::AssemblyFailure { operation, .. } => HumanError {
            message: format!("{operation} failed. No output was produced."),
            suggestion: "Please ensure your PDFs are valid and not password protected.".into(),
            category: "processing failed",
            retriable: false,
            severity: Severity::Permanent,
        },

        PagecraftError::RenderFailure { page_index, .. } => HumanError {
            message: format!("No preview for page {}.", page_index + 1),
            suggestion: "The page is still included in the output.".into(),
            category: "preview unavailable",
            retriable: false,
            severity: Severity::Degraded,
        },

        PagecraftError::SessionBusy { status } => HumanError {
            message: format!("The workspace is {status}."),
            suggestion: "Wait for processing to finish, or reset the workspace first.".into(),
            category: "workspace busy",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::UnknownDocument(_) | PagecraftError::UnknownPage(_) => HumanError {
            message: "That item is no longer in the workspace.".into(),
            suggestion: "It may have been removed or purged. Refresh the view.".into(),
            category: "stale reference",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::PositionOutOfRange { position, len } => HumanError {
            message: format!("Position {position} is outside the list of {len} items."),
            suggestion: "Choose a position inside the list.".into(),
            category: "invalid position",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::UnknownTool(id) => HumanError {
            message: format!("There is no tool called \"{id}\"."),
            suggestion: "Pick a tool from the catalogue.".into(),
            category: "unknown tool",
            retriable: false,
            severity: Severity::Permanent,
        },

        PagecraftError::InvalidPolicy(detail) => HumanError {
            message: "The session policy is invalid.".into(),
            suggestion: format!("Fix the policy file and start again. ({detail})"),
            category: "invalid configuration",
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PagecraftError::Internal(_) => HumanError {
            message: "Something went wrong inside the engine.".into(),
            suggestion: "Reset the workspace and try again. If this keeps happening, please report it.".into(),
            category: "internal error",
            retriable: false,
            severity: Severity::Permanent,
        },

        PagecraftError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    category: "file missing",
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied while reading or writing a file.".into(),
                    suggestion: "Check the file permissions, or choose another location.".into(),
                    category: "permission denied",
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Check the path and free space, then try again.".into(),
                    category: "file I/O",
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        PagecraftError::Serialization(_) => HumanError {
            message: "A configuration or report file could not be parsed.".into(),
            suggestion: "Check that the file is valid JSON.".into(),
            category: "invalid JSON",
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
