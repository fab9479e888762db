// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagecraft-session — The single live assembly session.
//
// Owns everything a user has handed over (source documents, the ordered page
// model, the operation result) and the lifecycle that releases it all again:
// Idle -> Processing -> Completed -> purge after the countdown, or on reset.

pub mod document;
pub mod events;
pub mod lifecycle;
pub mod page_model;
pub mod session;
pub mod snapshot;

pub use document::{DocumentList, SourceDocument};
pub use events::SessionEvent;
pub use lifecycle::{Lifecycle, Tick};
pub use page_model::{PageModel, PageReference};
pub use session::{FileOutcome, IncomingFile, IngestReport, Session};
pub use snapshot::SessionSnapshot;
