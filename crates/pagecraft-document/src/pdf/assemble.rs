// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Assembly engine — produce one output document from the session's inputs.
//
// Three variants: whole-document concatenation (merge), page-level
// recomposition (organize), and the passthrough placeholder for tools that have
// no algorithm yet. All are deterministic, never touch their inputs, and either
// return a complete buffer or an error; there is no partial output.

use std::sync::Arc;

use pagecraft_core::ToolKind;
use pagecraft_core::error::{PagecraftError, Result};
use tracing::{debug, info, instrument, warn};

use super::copy::{OutputDocument, SourceCopyState};
use super::reader::OpenedDocument;

/// One output page: page `page_index` of `documents[document]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePick {
    pub document: usize,
    pub page_index: usize,
}

impl PagePick {
    pub fn new(document: usize, page_index: usize) -> Self {
        Self {
            document,
            page_index,
        }
    }
}

/// A fully resolved assembly job, detached from session state so it can run
/// on a blocking thread.
#[derive(Debug, Clone)]
pub enum AssemblyRequest {
    /// Every page of every document, documents in list order.
    Concatenate { documents: Vec<Arc<OpenedDocument>> },
    /// Exactly the picked pages, in pick order.
    Recompose {
        documents: Vec<Arc<OpenedDocument>>,
        picks: Vec<PagePick>,
    },
    /// Placeholder for tools with no algorithm: emits `document` unchanged.
    Passthrough {
        tool: ToolKind,
        document: Arc<OpenedDocument>,
    },
}

impl AssemblyRequest {
    /// The tool this request is run on behalf of.
    pub fn tool(&self) -> ToolKind {
        match self {
            Self::Concatenate { .. } => ToolKind::Merge,
            Self::Recompose { .. } => ToolKind::Organize,
            Self::Passthrough { tool, .. } => *tool,
        }
    }
}

/// Stateless executor for [`AssemblyRequest`]s.
pub struct AssemblyEngine;

impl AssemblyEngine {
    /// Run a request. Blocking; run it off the async executor.
    pub fn run(request: &AssemblyRequest) -> Result<Vec<u8>> {
        match request {
            AssemblyRequest::Concatenate { documents } => Self::concatenate(documents),
            AssemblyRequest::Recompose { documents, picks } => Self::recompose(documents, picks),
            AssemblyRequest::Passthrough { tool, document } => Ok(Self::passthrough(*tool, document)),
        }
    }

    /// Merge whole documents in list order. Requires at least two.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn concatenate(documents: &[Arc<OpenedDocument>]) -> Result<Vec<u8>> {
        let operation = ToolKind::Merge.id();
        if documents.len() < ToolKind::Merge.min_documents() {
            return Err(PagecraftError::AssemblyPrecondition {
                operation: operation.into(),
                reason: format!(
                    "at least {} documents are required, got {}",
                    ToolKind::Merge.min_documents(),
                    documents.len()
                ),
            });
        }

        info!(
            documents = documents.len(),
            pages = documents.iter().map(|doc| doc.page_count()).sum::<usize>(),
            "Merging PDFs"
        );

        let mut output = OutputDocument::new();
        for document in documents {
            let reader = document.reader();
            let mut state = SourceCopyState::new(reader);
            for page_index in 0..reader.page_count() {
                output
                    .append_page(reader, page_index, &mut state)
                    .map_err(|err| failure(operation, document.name(), err))?;
            }
        }

        let bytes = output
            .finish()
            .map_err(|err| failure(operation, "output", err))?;
        debug!(output_bytes = bytes.len(), "Merge complete");
        Ok(bytes)
    }

    /// Build a document from individual pages drawn from any of `documents`.
    /// Requires at least one pick.
    #[instrument(skip_all, fields(documents = documents.len(), pages = picks.len()))]
    pub fn recompose(documents: &[Arc<OpenedDocument>], picks: &[PagePick]) -> Result<Vec<u8>> {
        let operation = ToolKind::Organize.id();
        if picks.is_empty() {
            return Err(PagecraftError::AssemblyPrecondition {
                operation: operation.into(),
                reason: "the page list is empty".into(),
            });
        }

        info!(pages = picks.len(), "Recomposing pages");

        let mut states: Vec<SourceCopyState> = documents
            .iter()
            .map(|document| SourceCopyState::new(document.reader()))
            .collect();
        let mut output = OutputDocument::new();

        for pick in picks {
            let document = documents.get(pick.document).ok_or_else(|| {
                PagecraftError::AssemblyFailure {
                    operation: operation.into(),
                    detail: format!("page refers to missing source #{}", pick.document + 1),
                }
            })?;
            let reader = document.reader();
            if pick.page_index >= reader.page_count() {
                return Err(PagecraftError::AssemblyFailure {
                    operation: operation.into(),
                    detail: format!(
                        "\"{}\" has {} pages, page {} requested",
                        document.name(),
                        reader.page_count(),
                        pick.page_index + 1
                    ),
                });
            }
            output
                .append_page(reader, pick.page_index, &mut states[pick.document])
                .map_err(|err| failure(operation, document.name(), err))?;
        }

        let bytes = output
            .finish()
            .map_err(|err| failure(operation, "output", err))?;
        debug!(output_bytes = bytes.len(), "Recomposition complete");
        Ok(bytes)
    }

    /// Placeholder for tools without a dedicated algorithm: returns the input
    /// bytes unchanged. This is not a transformation.
    pub fn passthrough(tool: ToolKind, document: &OpenedDocument) -> Vec<u8> {
        warn!(
            tool = tool.id(),
            file = document.name(),
            "tool has no algorithm; emitting the first input unchanged"
        );
        document.bytes().to_vec()
    }
}

fn failure(operation: &str, file: &str, err: PagecraftError) -> PagecraftError {
    PagecraftError::AssemblyFailure {
        operation: operation.into(),
        detail: format!("{}: {}", file, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn open(name: &str, labels: &[&str]) -> Arc<OpenedDocument> {
        let bytes: Arc<[u8]> = fixtures::labelled_pdf(labels).into();
        Arc::new(OpenedDocument::open(name, bytes).unwrap())
    }

    #[test]
    fn merge_keeps_document_order_and_every_page() {
        let a = open("a.pdf", &["a1", "a2"]);
        let b = open("b.pdf", &["b1"]);
        let c = open("c.pdf", &["c1", "c2", "c3"]);

        let out = AssemblyEngine::concatenate(&[b.clone(), a.clone(), c.clone()]).unwrap();
        assert_eq!(
            fixtures::page_labels(&out),
            vec!["b1", "a1", "a2", "c1", "c2", "c3"]
        );
    }

    #[test]
    fn merge_refuses_a_single_document() {
        let a = open("a.pdf", &["a1"]);
        let err = AssemblyEngine::concatenate(&[a]).unwrap_err();
        assert!(matches!(err, PagecraftError::AssemblyPrecondition { ref operation, .. } if operation == "merge"));
    }

    #[test]
    fn recompose_interleaves_sources() {
        let a = open("a.pdf", &["a1", "a2", "a3"]);
        let b = open("b.pdf", &["b1", "b2"]);
        let picks = [
            PagePick::new(1, 1),
            PagePick::new(0, 2),
            PagePick::new(1, 0),
            PagePick::new(0, 0),
        ];

        let out = AssemblyEngine::recompose(&[a, b], &picks).unwrap();
        assert_eq!(fixtures::page_labels(&out), vec!["b2", "a3", "b1", "a1"]);
    }

    #[test]
    fn recompose_is_byte_identical_across_runs() {
        let a = open("a.pdf", &["a1", "a2"]);
        let b = open("b.pdf", &["b1"]);
        let request = AssemblyRequest::Recompose {
            documents: vec![a, b],
            picks: vec![PagePick::new(1, 0), PagePick::new(0, 1)],
        };

        let first = AssemblyEngine::run(&request).unwrap();
        let second = AssemblyEngine::run(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn recompose_rejects_empty_page_list() {
        let a = open("a.pdf", &["a1"]);
        let err = AssemblyEngine::recompose(&[a], &[]).unwrap_err();
        assert!(matches!(err, PagecraftError::AssemblyPrecondition { .. }));
    }

    #[test]
    fn recompose_fails_atomically_on_bad_page_index() {
        let a = open("a.pdf", &["a1"]);
        let err = AssemblyEngine::recompose(&[a], &[PagePick::new(0, 0), PagePick::new(0, 5)])
            .unwrap_err();
        assert!(matches!(err, PagecraftError::AssemblyFailure { .. }));
    }

    #[test]
    fn merge_does_not_mutate_inputs() {
        let a = open("a.pdf", &["a1"]);
        let b = open("b.pdf", &["b1"]);
        let before = (a.bytes().to_vec(), b.bytes().to_vec());

        AssemblyEngine::concatenate(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(before, (a.bytes().to_vec(), b.bytes().to_vec()));
        assert_eq!(a.page_count(), 1);
    }

    #[test]
    fn passthrough_returns_input_unchanged() {
        let a = open("a.pdf", &["a1", "a2"]);
        let request = AssemblyRequest::Passthrough {
            tool: ToolKind::Compress,
            document: a.clone(),
        };
        assert_eq!(request.tool(), ToolKind::Compress);
        assert_eq!(AssemblyEngine::run(&request).unwrap(), a.bytes());
    }
}
