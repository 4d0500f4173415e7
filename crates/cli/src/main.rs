mod host;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use callsite_config::Config;
use callsite_core::{
    navigate_from_cursor, ProcessBackend, RenderedDocument, ResultsView, SearchOutcome,
    SearchSession, SessionOptions, ViewHandle,
};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;

use host::TerminalHost;

#[derive(Parser)]
#[command(name = "callsite", about = "Find every caller of an identifier", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root holding .callsite/config.toml (default: current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for callers and replace the results view
    Find {
        /// Identifier to search for; prompts when omitted and prompting is enabled
        identifier: Option<String>,
        /// File the identifier was selected in
        #[arg(short, long)]
        file: PathBuf,
        /// Search root to send instead of the configured environment variable
        #[arg(long)]
        root: Option<String>,
        /// Also print the results to stdout
        #[arg(long)]
        print: bool,
    },
    /// Open the source location behind a line of the results view
    Goto {
        /// 1-based line of the results view
        line: usize,
    },
    /// Print the current results view
    Show,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("callsite=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let config = Config::load_for_project(&project_root)?;
    Config::ensure_dirs()?;

    let host = TerminalHost::new(Config::results_dir(), config.editor.resolve_command());
    let view_name = config.session.results_view_name.clone();

    match cli.command {
        Commands::Find {
            identifier,
            file,
            root,
            print,
        } => {
            let host = host.with_selection(identifier, Some(file));
            let mut options = SessionOptions::from_config(&config);
            if let Some(root) = root {
                options.search_root = root;
            }
            let backend = Arc::new(ProcessBackend::from_config(&config.backend));
            let session = SearchSession::new(backend, options);

            let search = session.search(&host);
            tokio::pin!(search);
            let result = tokio::select! {
                result = &mut search => result,
                _ = tokio::signal::ctrl_c() => {
                    session.cancel();
                    search.await
                }
            };

            match result {
                Ok(SearchOutcome::Rendered { .. }) => {
                    if print {
                        if let Some(doc) = host.view(&view_name).last_document() {
                            print_document(&doc);
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Ok(SearchOutcome::NotFound) => Ok(ExitCode::from(1)),
                Err(_) => Ok(ExitCode::from(2)),
            }
        }
        Commands::Goto { line } => {
            if line == 0 {
                bail!("Results view lines are numbered from 1");
            }
            let view = host.view(&view_name);
            let handle: ViewHandle = view.clone();
            match navigate_from_cursor(&host, &handle, line - 1)
                .with_context(|| format!("Failed to open editor for line {line}"))?
            {
                Some(_) => Ok(ExitCode::SUCCESS),
                None => {
                    eprintln!(
                        "No source location at line {line} of {}",
                        view.path().display()
                    );
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::Show => {
            for line in host.view(&view_name).contents() {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            println!("Config path: {}", Config::config_path().display());
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_document(doc: &RenderedDocument) {
    let styled = std::io::stdout().is_terminal();
    for (idx, line) in doc.lines.iter().enumerate() {
        if !styled {
            println!("{}", line.text);
            continue;
        }
        if line.is_file_header {
            println!("{}", line.text.as_str().bold());
            continue;
        }

        let mut out = String::new();
        let mut cursor = 0;
        for span in doc.highlights.iter().filter(|h| h.line == idx) {
            out.push_str(&line.text[cursor..span.start]);
            out.push_str(&line.text[span.start..span.end].yellow().bold().to_string());
            cursor = span.end;
        }
        out.push_str(&line.text[cursor..]);
        println!("{out}");
    }
}
