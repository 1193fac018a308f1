use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harlowe_l10n::document::{filter_by_name, parse_name_filter};
use harlowe_l10n::loader::{load_document, load_skeleton, load_sources, write_json};
use harlowe_l10n::validate::findings_by_passage;
use harlowe_l10n::{
    Document, MergeOptions, RenderMode, Skeleton, build_skeleton, extract_document, merge,
    render_document, validate,
};

#[derive(Parser)]
#[command(
    name = "harlowe-l10n",
    version,
    about = "Localization round trip for Harlowe (Twine 2) story passages"
)]
struct Cli {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SharedArgs {
    /// Only process these passages (repeatable, comma-separated)
    #[arg(long = "name", global = true, value_name = "PASSAGE")]
    names: Vec<String>,

    /// JSON indent; 0 writes minified output
    #[arg(long, global = true, default_value_t = 2)]
    indent: usize,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Tokenize a passage source map into an extraction document
    Extract {
        /// JSON map of passage name to Harlowe body
        sources: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Flatten the translatable fields of an extraction into a skeleton
    Skeleton {
        extract: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Keep entries whose source text is empty or whitespace
        #[arg(long)]
        keep_empty: bool,
    },
    /// Merge a translated skeleton back into an extraction
    Merge {
        extract: PathBuf,
        skeleton: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Exit non-zero if any entry could not be applied
        #[arg(long)]
        strict: bool,
        /// Apply empty translations instead of skipping them
        #[arg(long)]
        apply_empty: bool,
    },
    /// Render a (merged) extraction back to passage text
    Render {
        merged: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Emit plain Harlowe source instead of entity-escaped text
        #[arg(long)]
        raw: bool,
    },
    /// Compare a translated extraction against the original
    Validate {
        original: PathBuf,
        translated: PathBuf,
        /// Exit non-zero on errors or untranslated fields
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let default_level = if cli.shared.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let names = parse_name_filter(&cli.shared.names);
    let indent = cli.shared.indent;

    match cli.command {
        Command::Extract { sources, out } => {
            let sources = select("source map", &load_sources(&sources)?, names.as_ref());
            let document = extract_document(sources);
            info!(passages = document.len(), "extracted");
            write_json(&document, out.as_deref(), indent)?;
        }
        Command::Skeleton {
            extract,
            out,
            keep_empty,
        } => {
            let document = select_document(load_document(&extract)?, names.as_ref());
            let skeleton = build_skeleton(&document, keep_empty);
            info!(
                passages = skeleton.0.len(),
                entries = skeleton.len(),
                "built skeleton"
            );
            write_json(&skeleton, out.as_deref(), indent)?;
        }
        Command::Merge {
            extract,
            skeleton,
            out,
            strict,
            apply_empty,
        } => {
            let document = load_document(&extract)?;
            let skeleton = Skeleton(select("skeleton", &load_skeleton(&skeleton)?.0, names.as_ref()));
            let outcome = merge(&document, &skeleton, MergeOptions { strict, apply_empty });
            info!(
                applied = outcome.applied,
                issues = outcome.issues.len(),
                "merged"
            );
            write_json(&outcome.document, out.as_deref(), indent)?;
            if !outcome.is_clean() {
                eprintln!("Merge finished with {} problem(s)", outcome.problems);
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Render { merged, out, raw } => {
            let document = select_document(load_document(&merged)?, names.as_ref());
            let mode = if raw { RenderMode::Raw } else { RenderMode::Escaped };
            let rendered = render_document(&document, mode);
            info!(passages = rendered.len(), raw, "rendered");
            write_json(&rendered, out.as_deref(), indent)?;
        }
        Command::Validate {
            original,
            translated,
            strict,
        } => {
            let original = select_document(load_document(&original)?, names.as_ref());
            let translated = Document(filter_by_name(&load_document(&translated)?.0, names.as_ref()).0);
            let report = validate(&original, &translated);
            for finding in &report.findings {
                println!("{}", finding);
            }
            for (passage, count) in findings_by_passage(&report) {
                info!(passage, findings = count, "validated");
            }
            println!("{}", report.summary());
            if report.fails(strict) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Apply the `--name` filter, warning about names that are not present.
fn select<V: Clone>(what: &str, map: &BTreeMap<String, V>, names: Option<&BTreeSet<String>>) -> BTreeMap<String, V> {
    let (kept, missing) = filter_by_name(map, names);
    for name in missing {
        warn!(passage = %name, "requested passage not found in {}", what);
    }
    kept
}

fn select_document(document: Document, names: Option<&BTreeSet<String>>) -> Document {
    if names.is_none() {
        return document;
    }
    Document(select("document", &document.0, names))
}
