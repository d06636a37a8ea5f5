use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_editor_core::doc_model::{Page, TextFragment};
use pdf_editor_core::{EditorConfig, EditorSession, Progress, SearchMatch};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "butterpaper-cli")]
#[command(about = "ButterPaper CLI")]
pub struct Cli {
    /// Editor configuration overrides (JSON).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the text fragments found on the source pages.
    Fragments {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Only this page (1-based).
        #[arg(long)]
        page: Option<usize>,
    },
    /// Print every case-insensitive match of a term.
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        term: String,
    },
    /// Replace every match of a term and save the result.
    Replace {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        term: String,
        replacement: String,
        #[arg(long)]
        output: PathBuf,
    },
    /// Save a JSON page model against the source document.
    Apply {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "MODEL")]
        edits: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: usize,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    width: f32,
    height: f32,
    rotation: u16,
    fragment_count: usize,
}

#[derive(Debug, Serialize)]
struct PageFragments<'a> {
    page: usize,
    fragments: &'a [TextFragment],
}

#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    term: &'a str,
    matches: &'a [SearchMatch],
}

#[derive(Debug, Serialize)]
struct SaveOutput {
    output: String,
    page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced: Option<usize>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file } => run_info(&file, config),
        Commands::Fragments { file, page } => run_fragments(&file, page, config),
        Commands::Search { file, term } => run_search(&file, &term, config),
        Commands::Replace { file, term, replacement, output } => {
            run_replace(&file, &term, &replacement, &output, config)
        }
        Commands::Apply { file, edits, output } => run_apply(&file, &edits, &output, config),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EditorConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

fn open_session(file: &Path, config: EditorConfig) -> Result<EditorSession> {
    ensure_pdf_exists(file)?;
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    EditorSession::open(&bytes, config).context("failed to open PDF")
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    println!("{json}");
    Ok(())
}

fn run_info(file: &Path, config: EditorConfig) -> Result<()> {
    let session = open_session(file, config)?;

    let pages = session
        .pages()
        .iter()
        .enumerate()
        .map(|(index, page)| {
            Ok(PageOutput {
                width: page.geometry.width,
                height: page.geometry.height,
                rotation: page.effective_rotation().degrees(),
                fragment_count: session.fragments(index)?.len(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    print_json(&InfoOutput { path: file.display().to_string(), page_count: pages.len(), pages })
}

fn run_fragments(file: &Path, page: Option<usize>, config: EditorConfig) -> Result<()> {
    let session = open_session(file, config)?;

    let indices: Vec<usize> = match page {
        Some(0) => anyhow::bail!("--page is 1-based and must be >= 1"),
        Some(page) => vec![page - 1],
        None => (0..session.page_count()).collect(),
    };

    let listing = indices
        .into_iter()
        .map(|index| Ok(PageFragments { page: index + 1, fragments: session.fragments(index)? }))
        .collect::<Result<Vec<_>>>()?;

    print_json(&listing)
}

fn run_search(file: &Path, term: &str, config: EditorConfig) -> Result<()> {
    let mut session = open_session(file, config)?;
    session.search(term);
    print_json(&SearchOutput { term, matches: session.search_results() })
}

fn run_replace(
    file: &Path,
    term: &str,
    replacement: &str,
    output: &Path,
    config: EditorConfig,
) -> Result<()> {
    let mut session = open_session(file, config)?;
    session.search(term);
    let replaced = session.replace_all(replacement)?;
    log::info!("replaced {replaced} occurrences of {term:?}");

    save_session(&mut session, output, Some(replaced))
}

fn run_apply(file: &Path, edits: &Path, output: &Path, config: EditorConfig) -> Result<()> {
    let mut session = open_session(file, config)?;

    let json = fs::read_to_string(edits)
        .with_context(|| format!("failed to read page model {}", edits.display()))?;
    let pages: Vec<Page> = serde_json::from_str(&json)
        .with_context(|| format!("invalid page model {}", edits.display()))?;
    session.replace_pages(pages).context("page model does not fit the source document")?;

    save_session(&mut session, output, None)
}

fn save_session(session: &mut EditorSession, output: &Path, replaced: Option<usize>) -> Result<()> {
    let bytes = session
        .save(&mut |progress: Progress| {
            log::debug!("saved page {}/{}", progress.completed, progress.total)
        })
        .context("failed to save PDF")?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))?;

    print_json(&SaveOutput { output: output.display().to_string(), page_count: session.page_count(), replaced })
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
