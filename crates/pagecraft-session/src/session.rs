// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The session handle — ingestion, page and document edits, execution, and the
// purge timer, over one shared state.
//
// State lives behind a `std::sync::Mutex` that is only ever held inside
// synchronous helpers, never across an `.await`. Parsing, rendering, and
// assembly run on blocking threads; their results are applied afterwards only
// if the session generation and the target id are both still current.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use pagecraft_core::error::{PagecraftError, Result};
use pagecraft_core::human_errors::{HumanError, humanize_error};
use pagecraft_core::{
    DocumentId, OperationResult, PageId, SessionPolicy, SessionStatus, Thumbnail, ToolKind,
    ValidationStatus,
};
use pagecraft_document::integrity::hash_bytes;
use pagecraft_document::{
    AssemblyEngine, AssemblyRequest, DocumentValidator, OpenedDocument, PagePick, PageRenderer,
    ThumbnailRenderer,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::document::{DocumentList, SourceDocument};
use crate::events::SessionEvent;
use crate::lifecycle::{Lifecycle, Tick};
use crate::page_model::{PageModel, PageReference};
use crate::snapshot::{DocumentSummary, PageSummary, ResultSummary, SessionSnapshot};

/// Events buffered per subscriber before slow receivers start lagging.
const EVENT_CAPACITY: usize = 256;

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A file handed over by the host: name, declared size, and contents.
#[derive(Clone)]
pub struct IncomingFile {
    name: String,
    declared_size: u64,
    bytes: Arc<[u8]>,
}

impl IncomingFile {
    /// Declared size defaults to the buffer length.
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            declared_size: bytes.len() as u64,
            bytes,
        }
    }

    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }

    /// Read a file from disk, named after its final path component.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }
}

impl std::fmt::Debug for IncomingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingFile")
            .field("name", &self.name)
            .field("declared_size", &self.declared_size)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// What happened to one file of an ingestion batch.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Valid; pages are indexed and previews are on their way.
    Indexed {
        file: String,
        document: DocumentId,
        page_count: usize,
    },
    /// Over the size policy; never entered the document list.
    Rejected { file: String, error: HumanError },
    /// In the document list but unusable until removed.
    Invalid {
        file: String,
        document: DocumentId,
        error: HumanError,
    },
    /// The session was reset, or the document removed, before loading finished.
    Discarded { file: String },
}

impl FileOutcome {
    pub fn file(&self) -> &str {
        match self {
            Self::Indexed { file, .. }
            | Self::Rejected { file, .. }
            | Self::Invalid { file, .. }
            | Self::Discarded { file } => file,
        }
    }

    pub fn document(&self) -> Option<DocumentId> {
        match self {
            Self::Indexed { document, .. } | Self::Invalid { document, .. } => Some(*document),
            _ => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

/// Per-file results of one `ingest` call, in submission order.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub outcomes: Vec<FileOutcome>,
}

impl IngestReport {
    pub fn indexed(&self) -> Vec<DocumentId> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_indexed())
            .filter_map(FileOutcome::document)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_indexed())
    }

    pub fn all_indexed(&self) -> bool {
        self.outcomes.iter().all(FileOutcome::is_indexed)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct State {
    documents: DocumentList,
    pages: PageModel,
    lifecycle: Lifecycle,
    result: Option<Arc<OperationResult>>,
    render_tasks: Vec<JoinHandle<()>>,
    purge_timer: Option<JoinHandle<()>>,
}

impl State {
    /// Release every buffer and return to a fresh `Idle`.
    fn purge(&mut self, abort_timer: bool) {
        self.documents.clear();
        self.pages.clear();
        self.result = None;
        // Stale render tasks notice the new generation and stop on their own.
        self.render_tasks.clear();
        if let Some(timer) = self.purge_timer.take() {
            if abort_timer {
                timer.abort();
            }
        }
        self.lifecycle.reset();
    }
}

enum Admission {
    Rejected(FileOutcome),
    Admitted { document: DocumentId, file: IncomingFile },
}

/// Thumbnails still owed for one indexed document.
struct RenderJob {
    generation: u64,
    document: DocumentId,
    opened: Arc<OpenedDocument>,
    /// Page references to fill, in natural page order.
    pages: Vec<(PageId, usize)>,
}

struct Shared {
    tool: ToolKind,
    policy: SessionPolicy,
    validator: DocumentValidator,
    thumbnails: ThumbnailRenderer,
    events: broadcast::Sender<SessionEvent>,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| PagecraftError::Internal("session state lock poisoned".into()))
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // -- Ingestion ------------------------------------------------------------

    /// Size-check every file and add the survivors to the document list as
    /// `Pending`. Purges first if the session holds a completed result.
    fn admit(&self, position: Option<usize>, files: Vec<IncomingFile>) -> Result<(u64, Vec<Admission>)> {
        let mut state = self.lock()?;
        let status = state.lifecycle.status();
        if status == SessionStatus::Processing {
            return Err(PagecraftError::SessionBusy { status });
        }

        // A completed session is purged below, so a position is checked
        // against the empty lists it will have by then.
        let mut document_cursor = None;
        if let Some(position) = position {
            let len = match status {
                SessionStatus::Completed => 0,
                _ if self.tool.is_page_level() => state.pages.len(),
                _ => state.documents.len(),
            };
            if position > len {
                return Err(PagecraftError::PositionOutOfRange { position, len });
            }
            if !self.tool.is_page_level() {
                document_cursor = Some(position);
            }
        }

        if status == SessionStatus::Completed {
            info!("new files for a completed session; purging the previous result first");
            state.purge(true);
            self.emit(SessionEvent::Reset);
        }

        let mut admissions = Vec::with_capacity(files.len());
        for file in files {
            let size = file.declared_size.max(file.bytes.len() as u64);
            if let Err(err) = self.validator.check_size(&file.name, size) {
                let human = humanize_error(&err);
                self.emit(SessionEvent::DocumentRejected {
                    name: file.name.clone(),
                    reason: err.to_string(),
                    category: human.category,
                });
                admissions.push(Admission::Rejected(FileOutcome::Rejected {
                    file: file.name,
                    error: human,
                }));
                continue;
            }

            let document = SourceDocument::pending(
                file.name.clone(),
                size,
                Arc::clone(&file.bytes),
                hash_bytes(&file.bytes),
            );
            let id = document.id;
            match document_cursor.as_mut() {
                Some(at) => {
                    state.documents.insert(*at, document)?;
                    *at += 1;
                }
                None => state.documents.push(document),
            }
            debug!(document = %id, file = %file.name, size, "document admitted");
            self.emit(SessionEvent::DocumentAdded {
                document: id,
                name: file.name.clone(),
                size_bytes: size,
            });
            admissions.push(Admission::Admitted { document: id, file });
        }

        Ok((state.lifecycle.generation(), admissions))
    }

    /// Record the outcome of parsing one admitted document. Valid documents get
    /// page references (page-level tools) and a render task.
    fn apply_index(
        self: &Arc<Self>,
        generation: u64,
        document: DocumentId,
        file: String,
        parsed: Result<OpenedDocument>,
        page_cursor: &mut Option<usize>,
    ) -> Result<FileOutcome> {
        let mut state = self.lock()?;
        if state.lifecycle.generation() != generation || !state.documents.contains(document) {
            debug!(%document, "document gone before indexing finished; discarding");
            return Ok(FileOutcome::Discarded { file });
        }

        let opened = match parsed {
            Ok(opened) => Arc::new(opened),
            Err(err) => {
                warn!(file = %file, %err, "document rejected as invalid");
                let human = humanize_error(&err);
                if let Some(entry) = state.documents.get_mut(document) {
                    entry.mark_invalid(err.to_string());
                }
                self.emit(SessionEvent::DocumentInvalid {
                    document,
                    name: file.clone(),
                    reason: err.to_string(),
                    category: human.category,
                });
                return Ok(FileOutcome::Invalid {
                    file,
                    document,
                    error: human,
                });
            }
        };

        let page_count = opened.page_count();
        if let Some(entry) = state.documents.get_mut(document) {
            entry.mark_valid(Arc::clone(&opened));
        }

        let mut pages = Vec::new();
        if self.tool.is_page_level() {
            let refs = PageReference::for_document(document, page_count);
            pages = refs.iter().map(|page| (page.id, page.page_index)).collect();
            match page_cursor.as_mut() {
                Some(at) => {
                    // Concurrent removals may have shortened the model meanwhile.
                    let position = (*at).min(state.pages.len());
                    state.pages.insert(position, refs)?;
                    *at = position + page_count;
                }
                None => state.pages.append(refs)?,
            }
        }

        info!(file = %file, %document, page_count, "document indexed");
        self.emit(SessionEvent::PagesIndexed {
            document,
            page_count,
            pages: pages.iter().map(|(id, _)| *id).collect(),
        });

        let job = RenderJob {
            generation,
            document,
            opened,
            pages,
        };
        state.render_tasks.retain(|task| !task.is_finished());
        state.render_tasks.push(tokio::spawn(Arc::clone(self).render(job)));

        Ok(FileOutcome::Indexed {
            file,
            document,
            page_count,
        })
    }

    // -- Rendering ------------------------------------------------------------

    /// Preview first, then every page thumbnail, one page at a time.
    async fn render(self: Arc<Self>, job: RenderJob) {
        let preview = self.render_page(&job.opened, 0).await;
        if !self.apply_preview(job.generation, job.document, preview.clone()) {
            return;
        }

        for (page, page_index) in job.pages {
            if !self.is_current(job.generation) {
                return;
            }
            if !self.page_exists(page) {
                continue;
            }
            let thumbnail = if page_index == 0 {
                preview.clone()
            } else {
                self.render_page(&job.opened, page_index).await
            };
            self.apply_thumbnail(job.generation, page, thumbnail);
        }
    }

    /// One thumbnail off the executor. A renderer that panics costs only its
    /// own page, which gets a placeholder.
    async fn render_page(&self, opened: &Arc<OpenedDocument>, page_index: usize) -> Thumbnail {
        let renderer = self.thumbnails.clone();
        let opened = Arc::clone(opened);
        match tokio::task::spawn_blocking(move || renderer.render_thumbnail(&opened, page_index)).await {
            Ok(thumbnail) => thumbnail,
            Err(err) => {
                warn!(page_index, %err, "render task did not finish, using placeholder");
                Thumbnail::placeholder()
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock()
            .map(|state| state.lifecycle.generation() == generation)
            .unwrap_or(false)
    }

    fn page_exists(&self, page: PageId) -> bool {
        self.lock()
            .map(|state| state.pages.contains(page))
            .unwrap_or(false)
    }

    fn apply_preview(&self, generation: u64, document: DocumentId, preview: Thumbnail) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        if state.lifecycle.generation() != generation {
            return false;
        }
        let placeholder = preview.is_placeholder();
        match state.documents.get_mut(document) {
            Some(entry) => {
                entry.preview = Some(preview);
                self.emit(SessionEvent::PreviewReady {
                    document,
                    placeholder,
                });
                true
            }
            None => {
                debug!(%document, "preview for removed document discarded");
                false
            }
        }
    }

    fn apply_thumbnail(&self, generation: u64, page: PageId, thumbnail: Thumbnail) {
        let Ok(mut state) = self.lock() else {
            return;
        };
        if state.lifecycle.generation() != generation {
            return;
        }
        let placeholder = thumbnail.is_placeholder();
        if state.pages.set_thumbnail(page, thumbnail) {
            self.emit(SessionEvent::ThumbnailReady { page, placeholder });
        } else {
            debug!(%page, "thumbnail for removed page discarded");
        }
    }

    // -- Execution ------------------------------------------------------------

    /// Check the operation's preconditions and move to `Processing`.
    fn prepare(&self) -> Result<(u64, AssemblyRequest)> {
        let mut state = self.lock()?;
        state.lifecycle.ensure_editable()?;

        let operation = self.tool.id();
        let precondition = |reason: String| PagecraftError::AssemblyPrecondition {
            operation: operation.into(),
            reason,
        };

        if state.documents.is_empty() {
            return Err(precondition("no documents have been added".into()));
        }
        if let Some(entry) = state.documents.first_unready() {
            let reason = match entry.status {
                ValidationStatus::Pending => format!("\"{}\" is still being checked", entry.name),
                _ => format!("\"{}\" is not a usable PDF; remove it first", entry.name),
            };
            return Err(precondition(reason));
        }

        let documents: Vec<Arc<OpenedDocument>> = state
            .documents
            .iter()
            .filter_map(|entry| entry.opened.clone())
            .collect();

        let request = match self.tool {
            ToolKind::Merge => {
                let needed = ToolKind::Merge.min_documents();
                if documents.len() < needed {
                    return Err(precondition(format!(
                        "at least {} documents are required, got {}",
                        needed,
                        documents.len()
                    )));
                }
                AssemblyRequest::Concatenate { documents }
            }
            ToolKind::Organize => {
                if state.pages.is_empty() {
                    return Err(precondition("the page list is empty".into()));
                }
                let slots: HashMap<DocumentId, usize> = state
                    .documents
                    .iter()
                    .enumerate()
                    .map(|(slot, entry)| (entry.id, slot))
                    .collect();
                let picks = state
                    .pages
                    .iter()
                    .map(|page| {
                        slots
                            .get(&page.document_id)
                            .map(|slot| PagePick::new(*slot, page.page_index))
                            .ok_or_else(|| {
                                PagecraftError::Internal(format!(
                                    "page {} refers to a missing document",
                                    page.id
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                AssemblyRequest::Recompose { documents, picks }
            }
            tool => {
                let document = documents
                    .into_iter()
                    .next()
                    .ok_or_else(|| precondition("no documents have been added".into()))?;
                AssemblyRequest::Passthrough { tool, document }
            }
        };

        state.lifecycle.begin()?;
        self.emit(SessionEvent::ProcessingStarted { tool: self.tool });
        Ok((state.lifecycle.generation(), request))
    }

    /// Apply the engine's outcome: `Completed` with a result and a running
    /// countdown, or back to `Idle` with an error.
    fn finish(self: &Arc<Self>, generation: u64, outcome: Result<Vec<u8>>) -> Result<Arc<OperationResult>> {
        let mut state = self.lock()?;
        if state.lifecycle.generation() != generation {
            info!("session reset while processing; output discarded");
            return Err(PagecraftError::AssemblyFailure {
                operation: self.tool.id().into(),
                detail: "the session was reset before the output was ready".into(),
            });
        }

        match outcome {
            Ok(output) => {
                let sha256 = hash_bytes(&output);
                let result = Arc::new(OperationResult::new(self.tool, output, sha256));
                state.lifecycle.complete()?;
                state.result = Some(Arc::clone(&result));

                let file_name = result.file_name(&self.policy.output_prefix);
                info!(file_name = %file_name, bytes = result.len(), "operation complete");
                self.emit(SessionEvent::Completed {
                    tool: self.tool,
                    file_name,
                    size_bytes: result.len(),
                    sha256: result.sha256.clone(),
                });

                state.purge_timer = Some(tokio::spawn(countdown(Arc::downgrade(self), generation)));
                Ok(result)
            }
            Err(err) => {
                state.lifecycle.fail()?;
                warn!(%err, "operation failed; inputs kept");
                let human = humanize_error(&err);
                self.emit(SessionEvent::Failed {
                    tool: self.tool,
                    reason: err.to_string(),
                    category: human.category,
                });
                Err(err)
            }
        }
    }

    // -- Countdown ------------------------------------------------------------

    /// One countdown second. Returns false once the timer should stop.
    fn tick(&self, generation: u64) -> bool {
        let Ok(mut state) = self.lock() else {
            return false;
        };
        if state.lifecycle.generation() != generation {
            return false;
        }
        match state.lifecycle.tick() {
            Tick::Remaining(remaining_secs) => {
                self.emit(SessionEvent::CountdownTick { remaining_secs });
                true
            }
            Tick::Expired => {
                state.purge(false);
                info!("countdown expired; session purged");
                self.emit(SessionEvent::CountdownTick { remaining_secs: 0 });
                self.emit(SessionEvent::Purged);
                false
            }
            Tick::Inactive => false,
        }
    }
}

/// The purge timer: the session's only background actor.
async fn countdown(shared: Weak<Shared>, generation: u64) {
    let mut interval = tokio::time::interval(COUNTDOWN_STEP);
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if !shared.tick(generation) {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Handle to the single live session for one tool.
///
/// Cheap to clone; all clones share the same state. Must be used from within
/// a tokio runtime.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Create an idle session. The renderer is the injected rasterisation
    /// service used for every preview.
    pub fn new(tool: ToolKind, policy: SessionPolicy, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        policy.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let lifecycle = Lifecycle::new(policy.purge_after_secs);
        info!(tool = %tool, renderer = renderer.name(), "session created");
        Ok(Self {
            shared: Arc::new(Shared {
                tool,
                validator: DocumentValidator::from_policy(&policy),
                thumbnails: ThumbnailRenderer::new(renderer, &policy),
                policy,
                events,
                state: Mutex::new(State {
                    documents: DocumentList::new(),
                    pages: PageModel::new(),
                    lifecycle,
                    result: None,
                    render_tasks: Vec::new(),
                    purge_timer: None,
                }),
            }),
        })
    }

    pub fn tool(&self) -> ToolKind {
        self.shared.tool
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.shared.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // -- Ingestion ------------------------------------------------------------

    /// Ingest a batch, appending new pages at the end.
    pub async fn ingest(&self, files: Vec<IncomingFile>) -> Result<IngestReport> {
        self.ingest_inner(None, files).await
    }

    /// Ingest a batch, placing the new material at `position`: in the page
    /// model for page-level tools, in the document list otherwise.
    pub async fn ingest_at(&self, position: usize, files: Vec<IncomingFile>) -> Result<IngestReport> {
        self.ingest_inner(Some(position), files).await
    }

    #[instrument(skip_all, fields(tool = %self.shared.tool, files = files.len()))]
    async fn ingest_inner(&self, position: Option<usize>, files: Vec<IncomingFile>) -> Result<IngestReport> {
        let shared = &self.shared;
        let (generation, admissions) = shared.admit(position, files)?;

        let mut page_cursor = if shared.tool.is_page_level() { position } else { None };
        let mut report = IngestReport::default();
        for admission in admissions {
            let outcome = match admission {
                Admission::Rejected(outcome) => outcome,
                Admission::Admitted { document, file } => {
                    let parsed = Self::parse(&shared.validator, &file).await;
                    shared.apply_index(generation, document, file.name, parsed, &mut page_cursor)?
                }
            };
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    /// Signature check, then a structural parse on a blocking thread.
    async fn parse(validator: &DocumentValidator, file: &IncomingFile) -> Result<OpenedDocument> {
        validator.check_signature(&file.name, &file.bytes)?;
        let name = file.name.clone();
        let bytes = Arc::clone(&file.bytes);
        tokio::task::spawn_blocking(move || OpenedDocument::open(name, bytes))
            .await
            .map_err(|err| PagecraftError::Internal(format!("parse task did not finish: {}", err)))?
    }

    /// Wait until every outstanding preview and thumbnail has been applied.
    pub async fn settle(&self) -> Result<()> {
        loop {
            let pending = {
                let mut state = self.shared.lock()?;
                std::mem::take(&mut state.render_tasks)
            };
            if pending.is_empty() {
                return Ok(());
            }
            for task in pending {
                if let Err(err) = task.await {
                    warn!(%err, "render task ended abnormally");
                }
            }
        }
    }

    // -- Edits ----------------------------------------------------------------

    pub fn remove_page(&self, page: PageId) -> Result<()> {
        let mut state = self.shared.lock()?;
        state.lifecycle.ensure_editable()?;
        state.pages.remove(page)?;
        self.shared.emit(SessionEvent::PageRemoved { page });
        Ok(())
    }

    pub fn move_page(&self, page: PageId, position: usize) -> Result<()> {
        let mut state = self.shared.lock()?;
        state.lifecycle.ensure_editable()?;
        state.pages.move_to(page, position)?;
        self.shared.emit(SessionEvent::PageMoved { page, position });
        Ok(())
    }

    /// Remove a document together with every page that refers to it.
    pub fn remove_document(&self, document: DocumentId) -> Result<()> {
        let mut state = self.shared.lock()?;
        state.lifecycle.ensure_editable()?;
        let removed = state.documents.remove(document)?;
        let pages = state.pages.remove_document(document);
        info!(file = %removed.name, pages = pages.len(), "document removed");
        self.shared.emit(SessionEvent::DocumentRemoved {
            document,
            pages_removed: pages.len(),
        });
        Ok(())
    }

    pub fn move_document(&self, document: DocumentId, position: usize) -> Result<()> {
        let mut state = self.shared.lock()?;
        state.lifecycle.ensure_editable()?;
        state.documents.move_to(document, position)?;
        self.shared.emit(SessionEvent::DocumentMoved { document, position });
        Ok(())
    }

    // -- Execution ------------------------------------------------------------

    /// Run the session's tool over the current inputs.
    ///
    /// Preconditions are checked before anything changes; a failed check
    /// leaves the session `Idle`. On success the result is held and the purge
    /// countdown starts.
    #[instrument(skip_all, fields(tool = %self.shared.tool))]
    pub async fn execute(&self) -> Result<Arc<OperationResult>> {
        let (generation, request) = self.shared.prepare()?;
        let outcome = tokio::task::spawn_blocking(move || AssemblyEngine::run(&request))
            .await
            .unwrap_or_else(|err| {
                Err(PagecraftError::Internal(format!("assembly task did not finish: {}", err)))
            });
        self.shared.finish(generation, outcome)
    }

    /// Release everything and return to `Idle`.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.shared.lock()?;
        state.purge(true);
        self.shared.emit(SessionEvent::Reset);
        Ok(())
    }

    // -- Inspection -----------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        self.shared
            .lock()
            .map(|state| state.lifecycle.status())
            .unwrap_or(SessionStatus::Idle)
    }

    /// Seconds until the purge; zero unless `Completed`.
    pub fn countdown(&self) -> u32 {
        self.shared
            .lock()
            .map(|state| state.lifecycle.countdown())
            .unwrap_or(0)
    }

    pub fn result(&self) -> Option<Arc<OperationResult>> {
        self.shared
            .lock()
            .ok()
            .and_then(|state| state.result.clone())
    }

    /// Download name for the current result.
    pub fn result_file_name(&self) -> Option<String> {
        self.result()
            .map(|result| result.file_name(&self.shared.policy.output_prefix))
    }

    pub fn ordered_pages(&self) -> Vec<PageId> {
        self.shared
            .lock()
            .map(|state| state.pages.ordered_ids())
            .unwrap_or_default()
    }

    pub fn documents(&self) -> Vec<DocumentId> {
        self.shared
            .lock()
            .map(|state| state.documents.iter().map(|entry| entry.id).collect())
            .unwrap_or_default()
    }

    /// The (document, page index) a page reference resolves to.
    pub fn resolve(&self, page: PageId) -> Option<(DocumentId, usize)> {
        self.shared.lock().ok().and_then(|state| state.pages.resolve(page))
    }

    pub fn thumbnail(&self, page: PageId) -> Option<Thumbnail> {
        self.shared
            .lock()
            .ok()
            .and_then(|state| state.pages.get(page).and_then(|entry| entry.thumbnail.clone()))
    }

    pub fn preview(&self, document: DocumentId) -> Option<Thumbnail> {
        self.shared
            .lock()
            .ok()
            .and_then(|state| state.documents.get(document).and_then(|entry| entry.preview.clone()))
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        let state = self.shared.lock()?;
        let prefix = &self.shared.policy.output_prefix;
        Ok(SessionSnapshot {
            tool: self.shared.tool,
            status: state.lifecycle.status(),
            countdown_secs: state.lifecycle.countdown(),
            documents: state
                .documents
                .iter()
                .map(|entry| DocumentSummary {
                    id: entry.id,
                    name: entry.name.clone(),
                    size_bytes: entry.size_bytes,
                    status: entry.status,
                    page_count: entry.page_count(),
                    has_preview: entry.preview.is_some(),
                    error: entry.error.clone(),
                    sha256: entry.sha256.clone(),
                })
                .collect(),
            pages: state
                .pages
                .iter()
                .map(|page| PageSummary {
                    id: page.id,
                    document: page.document_id,
                    page_index: page.page_index,
                    render_state: page.render_state,
                })
                .collect(),
            page_model_version: state.pages.version(),
            result: state.result.as_ref().map(|result| ResultSummary {
                file_name: result.file_name(prefix),
                content_type: result.content_type,
                size_bytes: result.len(),
                sha256: result.sha256.clone(),
                created_at: result.created_at,
            }),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tool", &self.shared.tool)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_document::SketchRenderer;
    use pagecraft_document::fixtures::labelled_pdf;

    fn session(tool: ToolKind) -> Session {
        Session::new(tool, SessionPolicy::default(), Arc::new(SketchRenderer)).unwrap()
    }

    #[test]
    fn incoming_file_declared_size_defaults_to_length() {
        let file = IncomingFile::new("a.pdf", vec![0u8; 10]);
        assert_eq!(file.declared_size(), 10);
        assert_eq!(file.with_declared_size(99).declared_size(), 99);
    }

    #[test]
    fn invalid_policy_refuses_construction() {
        let policy = SessionPolicy {
            purge_after_secs: 0,
            ..SessionPolicy::default()
        };
        let err = Session::new(ToolKind::Merge, policy, Arc::new(SketchRenderer)).unwrap_err();
        assert!(matches!(err, PagecraftError::InvalidPolicy(_)));
    }

    #[test]
    fn report_helpers() {
        let document = DocumentId::new();
        let report = IngestReport {
            outcomes: vec![
                FileOutcome::Indexed {
                    file: "a.pdf".into(),
                    document,
                    page_count: 2,
                },
                FileOutcome::Discarded { file: "b.pdf".into() },
            ],
        };
        assert_eq!(report.indexed(), vec![document]);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.all_indexed());
        assert_eq!(report.outcomes[1].file(), "b.pdf");
    }

    #[tokio::test]
    async fn ingest_at_inserts_documents_in_place() {
        let session = session(ToolKind::Merge);
        session
            .ingest(vec![
                IncomingFile::new("a.pdf", labelled_pdf(&["a"])),
                IncomingFile::new("c.pdf", labelled_pdf(&["c"])),
            ])
            .await
            .unwrap();
        let report = session
            .ingest_at(1, vec![IncomingFile::new("b.pdf", labelled_pdf(&["b"]))])
            .await
            .unwrap();
        assert!(report.all_indexed());

        let names: Vec<_> = session
            .snapshot()
            .unwrap()
            .documents
            .into_iter()
            .map(|doc| doc.name)
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);

        let err = session.ingest_at(9, Vec::new()).await.unwrap_err();
        assert!(matches!(err, PagecraftError::PositionOutOfRange { position: 9, len: 3 }));
    }

    #[tokio::test]
    async fn page_level_ingest_at_splices_pages() {
        let session = session(ToolKind::Organize);
        session
            .ingest(vec![IncomingFile::new("a.pdf", labelled_pdf(&["a1", "a2"]))])
            .await
            .unwrap();
        session
            .ingest_at(1, vec![IncomingFile::new("b.pdf", labelled_pdf(&["b1"]))])
            .await
            .unwrap();

        let pages: Vec<_> = session
            .ordered_pages()
            .into_iter()
            .filter_map(|page| session.resolve(page))
            .map(|(_, index)| index)
            .collect();
        assert_eq!(pages, vec![0, 0, 1]);
        assert_eq!(session.documents().len(), 2);
    }

    #[tokio::test]
    async fn settle_fills_every_thumbnail() {
        let session = session(ToolKind::Organize);
        let report = session
            .ingest(vec![IncomingFile::new("a.pdf", labelled_pdf(&["1", "2", "3"]))])
            .await
            .unwrap();
        session.settle().await.unwrap();

        let document = report.indexed()[0];
        assert!(session.preview(document).is_some());
        for page in session.ordered_pages() {
            let thumbnail = session.thumbnail(page).unwrap();
            assert!(!thumbnail.is_placeholder());
        }
    }

    async fn ready_merge() -> Session {
        let session = session(ToolKind::Merge);
        session
            .ingest(vec![
                IncomingFile::new("a.pdf", labelled_pdf(&["a"])),
                IncomingFile::new("b.pdf", labelled_pdf(&["b"])),
            ])
            .await
            .unwrap();
        session.settle().await.unwrap();
        session
    }

    #[tokio::test]
    async fn failed_assembly_returns_to_idle_and_keeps_inputs() {
        let session = ready_merge().await;
        let mut events = session.subscribe();

        let (generation, _request) = session.shared.prepare().unwrap();
        assert_eq!(session.status(), SessionStatus::Processing);
        let engine_error = PagecraftError::AssemblyFailure {
            operation: "merge".into(),
            detail: "page 0 of \"b.pdf\" could not be copied".into(),
        };
        let err = session.shared.finish(generation, Err(engine_error)).unwrap_err();

        assert!(matches!(err, PagecraftError::AssemblyFailure { .. }));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.result().is_none());
        assert_eq!(session.countdown(), 0);
        assert_eq!(session.documents().len(), 2);
        assert_eq!(session.ordered_pages().len(), 2);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(matches!(seen.first(), Some(SessionEvent::ProcessingStarted { .. })));
        assert!(matches!(seen.last(), Some(SessionEvent::Failed { tool: ToolKind::Merge, .. })));

        // Inputs are intact, so the same session can run again.
        let result = session.execute().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
        assert!(!result.output.is_empty());
    }

    #[tokio::test]
    async fn reset_while_processing_discards_the_output() {
        let session = ready_merge().await;
        let (generation, request) = session.shared.prepare().unwrap();
        let output = AssemblyEngine::run(&request).unwrap();

        session.reset().unwrap();
        let mut events = session.subscribe();
        let err = session.shared.finish(generation, Ok(output)).unwrap_err();

        assert!(matches!(err, PagecraftError::AssemblyFailure { .. }));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.result().is_none());
        assert!(session.snapshot().unwrap().is_empty());
        assert!(session.shared.lock().unwrap().purge_timer.is_none());
        assert!(events.try_recv().is_err());
    }
}
