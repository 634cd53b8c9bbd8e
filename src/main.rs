//! Specflow - draft requirements, design and tasks with approval gates.
//!
//! Each invocation loads the session from disk, runs one workflow operation and
//! saves the resulting state.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use specflow::ai::{self, TextGenerator, UnavailableGenerator};
use specflow::core::{Config, SessionStore};
use specflow::workflow::{
    write_export, Approvals, CodebaseContext, DocType, DocumentValidator, Progress, Step,
    TaskList, TransitionError, ValidationReport, WorkflowError, WorkflowOrchestrator,
    WorkflowState,
};

/// Draft requirements, design and implementation tasks with approval gates
#[derive(Parser)]
#[command(name = "specflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default lookup
    #[arg(short, long, global = true, env = "SPECFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a feature description and draft requirements
    Submit {
        /// What the feature should do
        description: String,

        /// Scan this directory and include it as codebase context
        #[arg(long)]
        context: Option<PathBuf>,
    },

    /// Approve the document under review and draft the next one
    Approve {
        /// Document to approve (defaults to the one under review)
        #[arg(short, long)]
        doc: Option<DocType>,
    },

    /// Draft the document under review again
    Regenerate {
        /// Document to regenerate (defaults to the one under review)
        #[arg(short, long)]
        doc: Option<DocType>,
    },

    /// Go back to the previous document
    Back,

    /// Replace a document with the contents of a file ("-" for stdin)
    Edit {
        /// Document to replace
        doc: DocType,

        /// File with the new content
        file: PathBuf,
    },

    /// Discard the session and start over
    Restart,

    /// Show the workflow status
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print a document
    Show {
        /// Document to print
        doc: DocType,
    },

    /// Check a requirements document
    Validate {
        /// Requirements file to check
        file: PathBuf,
    },

    /// Write the documents to a directory
    Export {
        /// Output directory (defaults to the configured export dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Submit { description, context } => {
            let codebase = context.as_deref().map(CodebaseContext::scan).transpose()?;
            run_step(config_path, |orchestrator, state, rt| {
                Ok(rt.block_on(orchestrator.submit_with_context(state, &description, codebase)))
            })
        }
        Commands::Approve { doc } => run_step(config_path, |orchestrator, state, rt| {
            let doc = resolve_doc(&state, doc)?;
            Ok(rt.block_on(orchestrator.approve(state, doc)))
        }),
        Commands::Regenerate { doc } => run_step(config_path, |orchestrator, state, rt| {
            let doc = resolve_doc(&state, doc)?;
            Ok(rt.block_on(orchestrator.regenerate(state, doc)))
        }),
        Commands::Back => run_step(config_path, |orchestrator, state, rt| {
            Ok(rt.block_on(orchestrator.go_back(state)))
        }),
        Commands::Edit { doc, file } => {
            let content = read_input(&file)?;
            run_step(config_path, |orchestrator, state, rt| {
                Ok(rt.block_on(orchestrator.edit_document(state, doc, content)))
            })
        }
        Commands::Restart => run_step(config_path, |orchestrator, state, rt| {
            Ok(rt.block_on(orchestrator.restart(state)))
        }),
        Commands::Status { format } => {
            let (_, state) = open_session(config_path)?;
            cmd_status(&state, &format)
        }
        Commands::Show { doc } => {
            let (_, state) = open_session(config_path)?;
            cmd_show(&state, doc)
        }
        Commands::Export { dir } => {
            let (config, state) = open_session(config_path)?;
            let dir = dir.unwrap_or_else(|| config.export.dir.clone());
            cmd_export(&state, &dir, config.export.render_tasks)
        }
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Config { path } => cmd_config(config_path, path),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Load the explicit config file, or fall back to the default lookup.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path),
        None => Config::load(),
    }
}

/// Build the configured generator, degrading to one that always fails.
///
/// Operations that need no generation (back, edit, resuming approvals) keep
/// working without credentials.
fn build_generator(config: &Config) -> Arc<dyn TextGenerator> {
    match ai::build_generator(config) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::debug!(error = %e, "No text generator available");
            Arc::new(UnavailableGenerator::new(e.to_string()))
        }
    }
}

/// Load config and the saved session.
fn open_session(config_path: Option<&Path>) -> Result<(Config, WorkflowState)> {
    let config = load_config(config_path)?;
    let state = SessionStore::new(&config.session.dir).load()?;
    Ok((config, state))
}

/// Run one orchestrator operation, save the result and report it.
fn run_step<F>(config_path: Option<&Path>, operation: F) -> Result<()>
where
    F: FnOnce(&WorkflowOrchestrator, WorkflowState, &tokio::runtime::Runtime) -> Result<Step>,
{
    let config = load_config(config_path)?;
    let store = SessionStore::new(&config.session.dir);

    // Held until the new state is saved
    let Some(_lock) = store.try_lock()? else {
        return Err(describe_error(TransitionError::SessionBusy.into()));
    };
    let state = store.load()?;
    let orchestrator = WorkflowOrchestrator::from_config(build_generator(&config), &config);

    // Create tokio runtime for the generation call
    let rt = tokio::runtime::Runtime::new()?;
    let step = operation(&orchestrator, state, &rt)?;

    store.save(&step.state)?;

    if let Some(warning) = &step.warning {
        eprintln!("Warning: {warning}");
        print_report(&warning.report);
    }

    match step.error {
        Some(error) => Err(describe_error(error)),
        None => {
            print_summary(&step.state);
            Ok(())
        }
    }
}

fn describe_error(error: WorkflowError) -> anyhow::Error {
    let hint = if error.is_retryable() {
        "\nRun the same command again to retry, or `specflow back` to return to the previous document."
    } else {
        ""
    };
    anyhow::anyhow!("{error}{hint}")
}

/// Use the explicit document, or the one under review.
fn resolve_doc(state: &WorkflowState, doc: Option<DocType>) -> Result<DocType> {
    match doc.or_else(|| state.current_phase().review_doc()) {
        Some(doc) => Ok(doc),
        None => anyhow::bail!(
            "No document is under review in phase '{}'; pass --doc explicitly",
            state.current_phase()
        ),
    }
}

fn read_input(file: &Path) -> Result<String> {
    if file == Path::new("-") {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn print_summary(state: &WorkflowState) {
    println!("{}  {}", state.progress(), state.current_phase());

    if let Some(doc) = state.current_phase().review_doc() {
        println!("{} v{} is ready for review:", doc.display_name(), state.version(doc));
        println!("  specflow show {doc}");
        println!("  specflow approve | regenerate | back | edit {doc} <file>");
    } else if state.is_complete() {
        println!("All documents approved. Run `specflow export` to write them out.");
    }
}

fn print_report(report: &ValidationReport) {
    for issue in &report.issues {
        eprintln!("  issue: {issue}");
    }
    for suggestion in &report.suggestions {
        eprintln!("  suggestion: {suggestion}");
    }
}

/// Machine-readable status.
#[derive(Serialize)]
struct StatusReport<'a> {
    session_id: String,
    phase: specflow::Phase,
    progress: Progress,
    feature_description: &'a str,
    documents: Vec<DocumentStatus>,
    approvals: Approvals,
    #[serde(skip_serializing_if = "Option::is_none")]
    codebase: Option<&'a CodebaseContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<&'a ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<&'a WorkflowError>,
}

#[derive(Serialize)]
struct DocumentStatus {
    doc: DocType,
    version: u32,
    approved: bool,
    chars: usize,
}

/// Show the workflow status.
fn cmd_status(state: &WorkflowState, format: &str) -> Result<()> {
    let documents: Vec<DocumentStatus> = DocType::ALL
        .iter()
        .map(|&doc| DocumentStatus {
            doc,
            version: state.version(doc),
            approved: state.is_approved(doc),
            chars: state.content(doc).chars().count(),
        })
        .collect();

    match format {
        "json" => {
            let report = StatusReport {
                session_id: state.session_id().to_string(),
                phase: state.current_phase(),
                progress: state.progress(),
                feature_description: state.feature_description(),
                documents,
                approvals: state.approvals(),
                codebase: state.codebase(),
                validation: state.validation(),
                last_error: state.last_error(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("Session: {}", state.session_id());
            println!("Phase:   {}  {}", state.current_phase(), state.progress());
            if !state.feature_description().is_empty() {
                println!("Feature: {}", state.feature_description());
            }

            if let Some(codebase) = state.codebase() {
                println!(
                    "Codebase: {} ({} files)",
                    codebase.languages.join(", "),
                    codebase.file_count
                );
            }

            println!("\nDocuments:");
            for status in &documents {
                if status.version == 0 {
                    println!("  {:<13} -", status.doc.key());
                } else {
                    let approval = if status.approved { "approved" } else { "pending" };
                    println!("  {:<13} v{:<3} {approval}", status.doc.key(), status.version);
                }
            }
            if state.document(DocType::Tasks).is_some() {
                let tasks = TaskList::parse(state.content(DocType::Tasks));
                println!(
                    "  {} task(s), {:.1} estimated hours",
                    tasks.tasks.len(),
                    tasks.total_hours()
                );
            }

            if let Some(report) = state.validation() {
                let verdict = if report.valid { "valid" } else { "invalid" };
                println!(
                    "\nValidation: {verdict} ({} issue(s), {} suggestion(s))",
                    report.issues.len(),
                    report.suggestions.len()
                );
            }
            if let Some(error) = state.last_error() {
                println!("\nLast error: {error}");
            }
        }
    }

    Ok(())
}

/// Print a document.
fn cmd_show(state: &WorkflowState, doc: DocType) -> Result<()> {
    match state.document(doc) {
        Some(document) => {
            println!("{}", document.content);
            Ok(())
        }
        None => anyhow::bail!("No {doc} document yet"),
    }
}

/// Check a requirements document.
fn cmd_validate(file: &Path) -> Result<()> {
    let content = read_input(file)?;
    let report = DocumentValidator::new().validate(&content);

    for issue in &report.issues {
        println!("issue: {issue}");
    }
    for suggestion in &report.suggestions {
        println!("suggestion: {suggestion}");
    }

    if !report.valid {
        anyhow::bail!("{} is not a valid requirements document", file.display());
    }

    println!("{} is a valid requirements document", file.display());
    Ok(())
}

/// Write the documents to a directory.
fn cmd_export(state: &WorkflowState, dir: &Path, render_tasks: bool) -> Result<()> {
    let written = write_export(state, dir, render_tasks)?;

    if written.is_empty() {
        println!("Nothing to export yet.");
        return Ok(());
    }

    for path in &written {
        println!("Wrote {}", path.display());
    }
    if !state.is_complete() {
        println!("Note: the workflow is not complete; some documents are still drafts.");
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(explicit: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match explicit.map(Path::to_path_buf).or_else(Config::locate) {
            Some(path) => println!("{}", path.display()),
            None => {
                if let Some(path) = Config::global_path() {
                    println!("{} (not found, using defaults)", path.display());
                }
            }
        }
        return Ok(());
    }

    let config = load_config(explicit)?;
    println!("{}", config.to_toml()?);

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "specflow", &mut io::stdout());
}
