// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagecraft — local, in-memory PDF assembly
//
// Command-line host. Each invocation runs one session: the given files are
// ingested, optionally rearranged, assembled, written out, and purged again.

mod order;

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use pagecraft_core::human_errors::{HumanError, humanize_error};
use pagecraft_core::{DocumentId, SessionPolicy, ToolKind};
use pagecraft_document::PageRenderer;
use pagecraft_session::{FileOutcome, IncomingFile, IngestReport, Session};
use tracing_subscriber::EnvFilter;

use order::PageOrder;

#[derive(Parser)]
#[command(name = "pagecraft")]
#[command(version)]
#[command(about = "Validate, preview, merge, and reorder PDF files without leaving the machine", long_about = None)]
struct Cli {
    /// Session policy as JSON (size limit, purge window, preview settings)
    #[arg(long, global = true, env = "PAGECRAFT_POLICY", value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Print the final session snapshot as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check files and report page counts
    Inspect {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Write a JPEG thumbnail of every page into this directory
        #[arg(long, value_name = "DIR")]
        thumbnails: Option<PathBuf>,
    },

    /// Concatenate whole files in the order given
    Merge {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Build one file from selected pages in a chosen order
    Organize {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Zero-based `file:page` pairs, e.g. `1:0,0:0,0:2`; natural order if omitted
        #[arg(long, value_name = "LIST")]
        order: Option<PageOrder>,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Run any catalogue tool by id
    Run {
        /// Tool id, e.g. `merge`, `organize`, `compress`
        tool: String,

        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let policy = load_policy(cli.policy.as_deref()).await?;

    match cli.command {
        Command::Inspect { files, thumbnails } => {
            inspect(policy, &files, thumbnails.as_deref(), cli.json).await
        }
        Command::Merge { files, output } => {
            let session = open_session(ToolKind::Merge, policy)?;
            ingest(&session, &files).await?;
            execute(&session, &output, cli.json).await
        }
        Command::Organize {
            files,
            order,
            output,
        } => {
            let session = open_session(ToolKind::Organize, policy)?;
            let report = ingest(&session, &files).await?;
            if let Some(order) = order {
                let documents: Vec<DocumentId> =
                    report.outcomes.iter().filter_map(FileOutcome::document).collect();
                apply_order(&session, &documents, &order)?;
            }
            execute(&session, &output, cli.json).await
        }
        Command::Run {
            tool,
            files,
            output,
        } => {
            let tool = ToolKind::from_id(&tool)?;
            let session = open_session(tool, policy)?;
            ingest(&session, &files).await?;
            execute(&session, &output, cli.json).await
        }
    }
}

async fn load_policy(path: Option<&Path>) -> Result<SessionPolicy> {
    let Some(path) = path else {
        return Ok(SessionPolicy::default());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading policy {}", path.display()))?;
    SessionPolicy::from_json_str(&json).with_context(|| format!("loading policy {}", path.display()))
}

fn renderer() -> Arc<dyn PageRenderer> {
    #[cfg(feature = "pdfium")]
    {
        use pagecraft_document::PdfiumRenderer;
        match std::env::var_os("PDFIUM_LIBRARY_DIR") {
            Some(dir) => Arc::new(PdfiumRenderer::with_library_dir(dir)),
            None => Arc::new(PdfiumRenderer::new()),
        }
    }
    #[cfg(not(feature = "pdfium"))]
    {
        Arc::new(pagecraft_document::SketchRenderer)
    }
}

fn open_session(tool: ToolKind, policy: SessionPolicy) -> Result<Session> {
    Ok(Session::new(tool, policy, renderer())?)
}

fn print_human(subject: &str, error: &HumanError) {
    eprintln!("{subject}: {} {}", error.message, error.suggestion);
}

/// Read and ingest every file. Fails after reporting each unusable file.
async fn ingest(session: &Session, files: &[PathBuf]) -> Result<IngestReport> {
    let report = ingest_all(session, files).await?;
    let failed = report_failures(&report);
    if failed > 0 {
        bail!("{failed} of {} files could not be used", files.len());
    }
    Ok(report)
}

async fn ingest_all(session: &Session, files: &[PathBuf]) -> Result<IngestReport> {
    let mut incoming = Vec::with_capacity(files.len());
    for path in files {
        let file = IncomingFile::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        incoming.push(file);
    }
    Ok(session.ingest(incoming).await?)
}

fn report_failures(report: &IngestReport) -> usize {
    let mut failed = 0;
    for outcome in report.failures() {
        failed += 1;
        match outcome {
            FileOutcome::Rejected { file, error } | FileOutcome::Invalid { file, error, .. } => {
                print_human(file, error)
            }
            other => eprintln!("{}: discarded before it was checked", other.file()),
        }
    }
    failed
}

/// Rearrange the page model to exactly the listed pages.
fn apply_order(session: &Session, documents: &[DocumentId], order: &PageOrder) -> Result<()> {
    let lookup: HashMap<(DocumentId, usize), _> = session
        .ordered_pages()
        .into_iter()
        .filter_map(|page| session.resolve(page).map(|at| (at, page)))
        .collect();

    let mut keep = Vec::with_capacity(order.0.len());
    for &(file, page) in &order.0 {
        let document = documents.get(file).ok_or_else(|| {
            anyhow!("--order names file {file}, but only {} were given", documents.len())
        })?;
        let id = lookup
            .get(&(*document, page))
            .copied()
            .ok_or_else(|| anyhow!("--order names page {page} of file {file}, which does not exist"))?;
        keep.push(id);
    }

    for (position, page) in keep.iter().enumerate() {
        session.move_page(*page, position)?;
    }
    let kept: HashSet<_> = keep.into_iter().collect();
    for page in session.ordered_pages() {
        if !kept.contains(&page) {
            session.remove_page(page)?;
        }
    }
    Ok(())
}

async fn execute(session: &Session, output: &Path, json: bool) -> Result<()> {
    let result = match session.execute().await {
        Ok(result) => result,
        Err(err) => {
            print_human(session.tool().id(), &humanize_error(&err));
            return Err(err.into());
        }
    };

    tokio::fs::write(output, &result.output)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    if json {
        println!("{}", session.snapshot()?.to_json_pretty()?);
    } else {
        println!(
            "wrote {} ({} bytes, sha256 {})",
            output.display(),
            result.len(),
            result.sha256
        );
    }

    // Nothing outlives the command.
    session.reset()?;
    Ok(())
}

async fn inspect(policy: SessionPolicy, files: &[PathBuf], thumbnails: Option<&Path>, json: bool) -> Result<()> {
    let session = open_session(ToolKind::Organize, policy)?;
    let report = ingest_all(&session, files).await?;
    session.settle().await?;
    let snapshot = session.snapshot()?;

    if json {
        println!("{}", snapshot.to_json_pretty()?);
    } else {
        for document in &snapshot.documents {
            let pages = document
                .page_count
                .map(|count| format!("{count} pages"))
                .unwrap_or_else(|| "-".into());
            println!(
                "{}\t{:?}\t{}\t{} bytes\tsha256 {}",
                document.name, document.status, pages, document.size_bytes, document.sha256
            );
        }
    }

    if let Some(dir) = thumbnails {
        write_thumbnails(&session, &snapshot, dir).await?;
    }

    let failed = report_failures(&report);
    session.reset()?;
    if failed > 0 {
        bail!("{failed} of {} files could not be used", files.len());
    }
    Ok(())
}

async fn write_thumbnails(
    session: &Session,
    snapshot: &pagecraft_session::SessionSnapshot,
    dir: &Path,
) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;

    let names: HashMap<DocumentId, String> = snapshot
        .documents
        .iter()
        .enumerate()
        .map(|(position, document)| (document.id, thumbnail_prefix(position, &document.name)))
        .collect();

    for page in &snapshot.pages {
        let Some(thumbnail) = session.thumbnail(page.id) else {
            continue;
        };
        if thumbnail.is_placeholder() {
            tracing::warn!(page = page.page_index, "no preview available; skipped");
            continue;
        }
        let prefix = names.get(&page.document).map(String::as_str).unwrap_or("page");
        let path = dir.join(thumbnail_name(prefix, page.page_index));
        tokio::fs::write(&path, &thumbnail.jpeg)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// `<input position>-<file stem>`; the position keeps same-named inputs from
/// different directories apart.
fn thumbnail_prefix(position: usize, name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_owned());
    format!("{position}-{stem}")
}

/// File name of one page's thumbnail; pages count from 1.
fn thumbnail_name(prefix: &str, page_index: usize) -> String {
    format!("{}-{}.jpg", prefix, page_index + 1)
}
