// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end session behaviour: ingestion, edits, execution, and the purge.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use pagecraft_core::{PagecraftError, RenderState, SessionPolicy, SessionStatus, ToolKind, ValidationStatus};
use pagecraft_document::fixtures::{labelled_pdf, page_labels};
use pagecraft_document::{OpenedDocument, PageRenderer, SketchRenderer};
use pagecraft_session::{FileOutcome, IncomingFile, Session, SessionEvent};
use tokio::sync::broadcast::Receiver;

fn session_with(tool: ToolKind, policy: SessionPolicy) -> Session {
    Session::new(tool, policy, Arc::new(SketchRenderer)).unwrap()
}

fn session(tool: ToolKind) -> Session {
    session_with(tool, SessionPolicy::default())
}

fn pdf(name: &str, labels: &[&str]) -> IncomingFile {
    IncomingFile::new(name, labelled_pdf(labels))
}

/// Sketches every page except one, where it panics.
struct PanicsOnPage(usize);

impl PageRenderer for PanicsOnPage {
    fn render(
        &self,
        source: &OpenedDocument,
        page_index: usize,
        scale: f32,
    ) -> pagecraft_core::error::Result<DynamicImage> {
        if page_index == self.0 {
            panic!("renderer crashed on page {page_index}");
        }
        SketchRenderer.render(source, page_index, scale)
    }

    fn name(&self) -> &'static str {
        "panics-on-page"
    }
}

fn drain(events: &mut Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn oversized_files_never_enter_the_list() {
    let policy = SessionPolicy {
        max_file_size_bytes: 1024 * 1024,
        ..SessionPolicy::default()
    };
    let session = session_with(ToolKind::Merge, policy);
    let mut events = session.subscribe();

    let huge = pdf("huge.pdf", &["x"]).with_declared_size(20 * 1024 * 1024);
    let report = session.ingest(vec![huge, pdf("ok.pdf", &["y"])]).await.unwrap();

    assert!(matches!(report.outcomes[0], FileOutcome::Rejected { .. }));
    assert!(report.outcomes[1].is_indexed());

    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].name, "ok.pdf");

    let rejected = drain(&mut events).into_iter().any(|event| {
        matches!(event, SessionEvent::DocumentRejected { ref name, category, .. }
            if name == "huge.pdf" && category == "file too large")
    });
    assert!(rejected);
}

#[tokio::test]
async fn bad_signature_does_not_block_siblings() {
    let session = session(ToolKind::Merge);
    let report = session
        .ingest(vec![
            pdf("a.pdf", &["a"]),
            IncomingFile::new("notes.txt", b"just some notes".to_vec()),
            pdf("b.pdf", &["b"]),
        ])
        .await
        .unwrap();

    assert!(report.outcomes[0].is_indexed());
    assert!(matches!(report.outcomes[1], FileOutcome::Invalid { .. }));
    assert!(report.outcomes[2].is_indexed());

    let snapshot = session.snapshot().unwrap();
    let statuses: Vec<_> = snapshot.documents.iter().map(|doc| doc.status).collect();
    assert_eq!(
        statuses,
        vec![ValidationStatus::Valid, ValidationStatus::Invalid, ValidationStatus::Valid]
    );
    assert!(snapshot.documents[1].error.is_some());
}

#[tokio::test]
async fn invalid_documents_block_execution_until_removed() {
    let session = session(ToolKind::Merge);
    let report = session
        .ingest(vec![
            pdf("a.pdf", &["a"]),
            IncomingFile::new("broken.pdf", b"%PDF-1.7 not really".to_vec()),
            pdf("b.pdf", &["b"]),
        ])
        .await
        .unwrap();

    let err = session.execute().await.unwrap_err();
    assert!(matches!(err, PagecraftError::AssemblyPrecondition { .. }));
    assert_eq!(session.status(), SessionStatus::Idle);

    let broken = report.outcomes[1].document().unwrap();
    session.remove_document(broken).unwrap();
    session.settle().await.unwrap();

    let result = session.execute().await.unwrap();
    assert_eq!(page_labels(&result.output), vec!["a", "b"]);
}

#[tokio::test]
async fn merge_follows_document_order() {
    let session = session(ToolKind::Merge);
    let report = session
        .ingest(vec![pdf("a.pdf", &["a1", "a2"]), pdf("b.pdf", &["b1"])])
        .await
        .unwrap();
    let b = report.indexed()[1];
    session.move_document(b, 0).unwrap();
    session.settle().await.unwrap();

    let result = session.execute().await.unwrap();
    assert_eq!(page_labels(&result.output), vec!["b1", "a1", "a2"]);
    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(
        session
            .result_file_name()
            .unwrap()
            .starts_with("pagecraft_merge_")
    );
}

#[tokio::test]
async fn merge_with_one_document_never_processes() {
    let session = session(ToolKind::Merge);
    let mut events = session.subscribe();
    session.ingest(vec![pdf("only.pdf", &["x"])]).await.unwrap();
    session.settle().await.unwrap();

    let err = session.execute().await.unwrap_err();
    assert!(matches!(err, PagecraftError::AssemblyPrecondition { .. }));
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(
        !drain(&mut events)
            .iter()
            .any(|event| matches!(event, SessionEvent::ProcessingStarted { .. }))
    );
}

#[tokio::test]
async fn empty_session_cannot_execute() {
    let session = session(ToolKind::Compress);
    let err = session.execute().await.unwrap_err();
    assert!(matches!(err, PagecraftError::AssemblyPrecondition { .. }));
    assert!(session.result().is_none());
}

#[tokio::test]
async fn organize_writes_the_page_model_order() {
    let session = session(ToolKind::Organize);
    session
        .ingest(vec![pdf("a.pdf", &["a1", "a2"]), pdf("b.pdf", &["b1", "b2"])])
        .await
        .unwrap();
    session.settle().await.unwrap();

    let pages = session.ordered_pages();
    assert_eq!(pages.len(), 4);
    // a1 a2 b1 b2 -> b2 a1 b1 (a2 removed)
    session.move_page(pages[3], 0).unwrap();
    session.remove_page(pages[1]).unwrap();

    let result = session.execute().await.unwrap();
    assert_eq!(page_labels(&result.output), vec!["b2", "a1", "b1"]);
}

#[tokio::test]
async fn removing_a_document_cascades_and_keeps_order() {
    let session = session(ToolKind::Organize);
    let report = session
        .ingest(vec![pdf("a.pdf", &["a1", "a2"]), pdf("b.pdf", &["b1", "b2"])])
        .await
        .unwrap();
    let pages = session.ordered_pages();
    session.move_page(pages[2], 0).unwrap(); // b1 a1 a2 b2

    let a = report.indexed()[0];
    session.remove_document(a).unwrap();
    assert_eq!(session.ordered_pages(), vec![pages[2], pages[3]]);
    assert_eq!(session.documents().len(), 1);

    session.settle().await.unwrap();
    let result = session.execute().await.unwrap();
    assert_eq!(page_labels(&result.output), vec!["b1", "b2"]);
}

#[tokio::test]
async fn reruns_are_byte_identical() {
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let session = session(ToolKind::Merge);
        session
            .ingest(vec![pdf("a.pdf", &["a"]), pdf("b.pdf", &["b1", "b2"])])
            .await
            .unwrap();
        session.settle().await.unwrap();
        outputs.push(session.execute().await.unwrap());
    }
    assert_eq!(outputs[0].output, outputs[1].output);
    assert_eq!(outputs[0].sha256, outputs[1].sha256);
}

#[tokio::test]
async fn passthrough_tools_return_the_first_document() {
    let session = session(ToolKind::Compress);
    let original = labelled_pdf(&["p1", "p2"]);
    session
        .ingest(vec![IncomingFile::new("in.pdf", original.clone())])
        .await
        .unwrap();
    session.settle().await.unwrap();

    let result = session.execute().await.unwrap();
    assert_eq!(result.output, original);
}

#[tokio::test]
async fn edits_are_refused_once_completed() {
    let session = session(ToolKind::Organize);
    session.ingest(vec![pdf("a.pdf", &["1", "2"])]).await.unwrap();
    session.settle().await.unwrap();
    let pages = session.ordered_pages();
    session.execute().await.unwrap();

    assert!(matches!(
        session.remove_page(pages[0]),
        Err(PagecraftError::SessionBusy { status: SessionStatus::Completed })
    ));
    assert!(matches!(
        session.move_page(pages[0], 1),
        Err(PagecraftError::SessionBusy { .. })
    ));
    assert!(matches!(
        session.execute().await,
        Err(PagecraftError::SessionBusy { .. })
    ));
    assert_eq!(session.ordered_pages(), pages);
}

#[tokio::test]
async fn ingesting_into_a_completed_session_starts_over() {
    let session = session(ToolKind::Merge);
    session
        .ingest(vec![pdf("a.pdf", &["a"]), pdf("b.pdf", &["b"])])
        .await
        .unwrap();
    session.settle().await.unwrap();
    session.execute().await.unwrap();
    let mut events = session.subscribe();

    session.ingest(vec![pdf("c.pdf", &["c"])]).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.result().is_none());
    let snapshot = session.snapshot().unwrap();
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].name, "c.pdf");
    assert!(matches!(drain(&mut events).first(), Some(SessionEvent::Reset)));
}

#[tokio::test]
async fn out_of_range_ingest_at_leaves_a_completed_session_alone() {
    let session = session(ToolKind::Merge);
    session
        .ingest(vec![pdf("a.pdf", &["a"]), pdf("b.pdf", &["b"])])
        .await
        .unwrap();
    session.settle().await.unwrap();
    session.execute().await.unwrap();
    let mut events = session.subscribe();

    let err = session.ingest_at(2, vec![pdf("c.pdf", &["c"])]).await.unwrap_err();
    assert!(matches!(err, PagecraftError::PositionOutOfRange { position: 2, len: 0 }));
    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(session.result().is_some());
    assert_eq!(session.documents().len(), 2);
    assert!(drain(&mut events).is_empty());

    session.ingest_at(0, vec![pdf("c.pdf", &["c"])]).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.result().is_none());
    let names: Vec<_> = session
        .snapshot()
        .unwrap()
        .documents
        .into_iter()
        .map(|doc| doc.name)
        .collect();
    assert_eq!(names, vec!["c.pdf"]);
}

#[tokio::test]
async fn a_crashing_renderer_costs_only_its_own_page() {
    for broken in [0, 1] {
        let session = Session::new(
            ToolKind::Organize,
            SessionPolicy::default(),
            Arc::new(PanicsOnPage(broken)),
        )
        .unwrap();
        let mut events = session.subscribe();
        let report = session
            .ingest(vec![pdf("a.pdf", &["1", "2", "3"])])
            .await
            .unwrap();
        session.settle().await.unwrap();

        let document = report.indexed()[0];
        assert_eq!(session.preview(document).unwrap().is_placeholder(), broken == 0);
        for (index, page) in session.ordered_pages().into_iter().enumerate() {
            let thumbnail = session.thumbnail(page).unwrap();
            assert_eq!(thumbnail.is_placeholder(), index == broken, "page {index}");
        }
        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.pages.iter().all(|page| page.render_state == RenderState::Ready));

        let seen = drain(&mut events);
        assert!(seen.iter().any(|event| matches!(event, SessionEvent::PreviewReady { .. })));
        let thumbnails = seen
            .iter()
            .filter(|event| matches!(event, SessionEvent::ThumbnailReady { .. }))
            .count();
        assert_eq!(thumbnails, 3);
    }
}

#[tokio::test(start_paused = true)]
async fn completed_session_purges_after_countdown() {
    let session = session(ToolKind::Merge);
    session
        .ingest(vec![pdf("a.pdf", &["a"]), pdf("b.pdf", &["b"])])
        .await
        .unwrap();
    session.settle().await.unwrap();
    session.execute().await.unwrap();
    assert_eq!(session.countdown(), 300);
    let mut events = session.subscribe();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(session.countdown() <= 291);

    tokio::time::sleep(Duration::from_secs(291)).await;
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.countdown(), 0);
    assert!(session.result().is_none());
    assert!(session.snapshot().unwrap().is_empty());
    assert!(
        drain(&mut events)
            .iter()
            .any(|event| matches!(event, SessionEvent::Purged))
    );
}

#[tokio::test(start_paused = true)]
async fn reset_stops_the_countdown() {
    let session = session(ToolKind::Merge);
    session
        .ingest(vec![pdf("a.pdf", &["a"]), pdf("b.pdf", &["b"])])
        .await
        .unwrap();
    session.settle().await.unwrap();
    session.execute().await.unwrap();

    session.reset().unwrap();
    let mut events = session.subscribe();
    tokio::time::sleep(Duration::from_secs(400)).await;

    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.snapshot().unwrap().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn snapshot_serialises_without_buffers() {
    let session = session(ToolKind::Organize);
    session.ingest(vec![pdf("a.pdf", &["1"])]).await.unwrap();
    session.settle().await.unwrap();

    let json = session.snapshot().unwrap().to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["tool"], "organize");
    assert_eq!(value["status"], "idle");
    assert_eq!(value["documents"][0]["page_count"], 1);
    assert_eq!(value["pages"][0]["render_state"], "ready");
    assert!(value["documents"][0].get("bytes").is_none());
}
