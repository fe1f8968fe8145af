use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::{SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use karpdocs::{
    DataDir,
    DocsService,
    DocumentStore,
    MetaDb,
    cli::{self, Cli, Command},
    error,
    fetch,
    indexer::{IndexMode, IndexReport, Indexer},
    mcp,
    meta_db::RunRecord,
    service::ReadOutcome,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("KARPDOCS_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> error::Result<()> {
    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let index_dir = cli.database.unwrap_or_else(|| data_dir.index_dir());

    match cli.command {
        Command::Index(args) => cmd_index(&data_dir, &index_dir, &args)?,
        Command::Stats(args) => cmd_stats(&data_dir, &index_dir, args.json)?,
        Command::Search(args) => {
            let service = open_service(&index_dir)?;
            let response = service.search_documentation(
                &args.query,
                args.section.as_deref(),
                Some(args.limit),
            )?;
            print_json(&response)?;
        }
        Command::Read(args) => {
            let service = open_service(&index_dir)?;
            let outcome = service.read_documentation(&args.path)?;
            print_json(&outcome)?;
            if let ReadOutcome::NotFound { path } = outcome {
                tracing::warn!(%path, "document not found");
            }
        }
        Command::Mcp => mcp::run_mcp(open_service(&index_dir)?)?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn open_service(index_dir: &Path) -> error::Result<DocsService> {
    Ok(DocsService::new(DocumentStore::open_existing(index_dir)?))
}

fn print_json(value: &impl Serialize) -> error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_index(
    data_dir: &DataDir,
    index_dir: &Path,
    args: &cli::IndexArgs,
) -> error::Result<()> {
    let store = DocumentStore::open(index_dir)?;
    let indexer = Indexer::new(&store);
    let mode = if args.rebuild {
        IndexMode::Rebuild
    } else {
        IndexMode::Upsert
    };

    let (source, report) = match &args.path {
        Some(path) => {
            let root = fetch::resolve_docs_root(path);
            let report = indexer.index_from_path(&root, mode)?;
            (path.display().to_string(), report)
        }
        None => {
            // The checkout lives only as long as this run.
            let checkout =
                tempfile::Builder::new().prefix("karpdocs-").tempdir()?;
            let repo = checkout.path().join("repo");
            let docs = fetch::clone_docs(&args.branch, &repo)?;
            let report = indexer.index_from_path(&docs, mode)?;
            (format!("git:{}", args.branch), report)
        }
    };

    let meta = MetaDb::open(&data_dir.meta_db())?;
    meta.record_run(&run_record(source, mode, &report))?;

    eprintln!(
        "Indexed {} of {} documents into {}",
        report.indexed,
        report.discovered,
        index_dir.display()
    );
    if !report.failures.is_empty() {
        eprintln!("Skipped {} file(s):", report.failed());
        for failure in &report.failures {
            eprintln!(
                "  {}: {}",
                failure.relative_path.display(),
                failure.reason
            );
        }
    }
    Ok(())
}

fn run_record(
    source: String,
    mode: IndexMode,
    report: &IndexReport,
) -> RunRecord {
    let finished_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    RunRecord {
        source,
        mode: mode.as_str().to_string(),
        finished_at,
        discovered: report.discovered,
        indexed: report.indexed,
        failures: report
            .failures
            .iter()
            .map(|f| {
                (
                    f.relative_path.to_string_lossy().replace('\\', "/"),
                    f.reason.to_string(),
                )
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
struct Stats {
    data_dir: PathBuf,
    index_dir: PathBuf,
    documents: u64,
    segments: usize,
    sections: Vec<SectionCount>,
    last_run: Option<LastRun>,
}

#[derive(Debug, Serialize)]
struct SectionCount {
    section: String,
    documents: u64,
}

#[derive(Debug, Serialize)]
struct LastRun {
    source: String,
    mode: String,
    finished_at: u64,
    discovered: usize,
    indexed: usize,
    failed: usize,
    failures: Vec<FailureEntry>,
}

#[derive(Debug, Serialize)]
struct FailureEntry {
    path: String,
    reason: String,
}

impl From<RunRecord> for LastRun {
    fn from(run: RunRecord) -> Self {
        Self {
            failed: run.failures.len(),
            failures: run
                .failures
                .into_iter()
                .map(|(path, reason)| FailureEntry { path, reason })
                .collect(),
            source: run.source,
            mode: run.mode,
            finished_at: run.finished_at,
            discovered: run.discovered,
            indexed: run.indexed,
        }
    }
}

fn cmd_stats(
    data_dir: &DataDir,
    index_dir: &Path,
    json: bool,
) -> error::Result<()> {
    let store = DocumentStore::open_existing(index_dir)?;
    let meta = MetaDb::open(&data_dir.meta_db())?;

    let stats = Stats {
        data_dir: data_dir.root().to_path_buf(),
        index_dir: index_dir.to_path_buf(),
        documents: store.count()?,
        segments: store.segment_count()?,
        sections: store
            .list_sections()?
            .into_iter()
            .map(|(section, documents)| SectionCount { section, documents })
            .collect(),
        last_run: meta.last_run()?.map(LastRun::from),
    };

    if json {
        return print_json(&stats);
    }

    println!("Data directory: {}", stats.data_dir.display());
    println!("Index: {}", stats.index_dir.display());
    println!(
        "Documents: {} in {} segment(s)",
        stats.documents, stats.segments
    );
    for entry in &stats.sections {
        println!("  {}: {}", entry.section, entry.documents);
    }
    match &stats.last_run {
        Some(run) => {
            println!(
                "Last run: {} ({}) at {}",
                run.source, run.mode, run.finished_at
            );
            println!(
                "  discovered {}, indexed {}, failed {}",
                run.discovered, run.indexed, run.failed
            );
            for failure in &run.failures {
                println!("  {}: {}", failure.path, failure.reason);
            }
        }
        None => println!("Last run: never"),
    }
    Ok(())
}
