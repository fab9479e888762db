// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — opening documents for page-level access, copying pages between
// documents, and assembling output documents.

pub mod assemble;
pub mod copy;
pub mod reader;

pub use assemble::{AssemblyEngine, AssemblyRequest, PagePick};
pub use reader::{OpenedDocument, PdfReader};
