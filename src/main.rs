mod config;
mod diagnostics;
mod error;
mod git;
mod grammar;
mod graph;
mod heuristics;
mod lock;
mod matcher;
mod mcp;
mod memory;
mod outline;
mod patterns;
mod platform;
mod quality;
mod request;
mod scanner;
mod snippets;
mod symbols;
mod tools;
mod truncate;
mod types;
mod validation;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::platform::Platform;
use crate::quality::Criterion;
use crate::request::{
    AssessQualityRequest, BootstrapRequest, DetectPlatformRequest, InitializeConfigRequest, InitializeMemoryRequest,
    MapChangesRequest, MigrateRequest, ResponseFormat, SyncMode, SyncRequest, TrackDependenciesRequest,
    ValidateDocsRequest,
};
use crate::tools::ToolRequest;

/// Command-line interface.
#[derive(Parser)]
#[command(
    name = "docmgr",
    version,
    about = "Keep documentation in step with the code it describes"
)]
struct Cli {
    /// Tool to run.
    #[command(subcommand)]
    command: Commands,
    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = ResponseFormat::Markdown)]
    format: ResponseFormat,
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,
}

/// One subcommand per tool, plus `serve`.
#[derive(Subcommand)]
enum Commands {
    /// Create a starter documentation set
    Bootstrap {
        /// Directory to create, relative to the project root
        #[arg(long, default_value = "docs")]
        docs_path: String,
        /// Documentation platform
        #[arg(long, value_enum)]
        platform: Option<Platform>,
    },
    /// Map changed files to the docs that reference them
    Changes {
        /// Compare against this commit instead of the memory baseline
        #[arg(long)]
        since: Option<String>,
    },
    /// Detect documentation platforms and recommend one
    DetectPlatform,
    /// Write .doc-manager.yml
    InitConfig {
        /// Exclude pattern (repeatable); defaults apply when omitted
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Documentation platform
        #[arg(long, value_enum)]
        platform: Option<Platform>,
    },
    /// Create the .doc-manager memory directory
    InitMemory,
    /// Move the documentation tree to a new directory
    Migrate {
        /// Report the plan without touching files
        #[arg(long)]
        dry_run: bool,
        /// Current documentation directory
        #[arg(long)]
        from: String,
        /// Copy instead of using git mv
        #[arg(long)]
        no_history: bool,
        /// Platform recorded for the new layout
        #[arg(long, value_enum)]
        platform: Option<Platform>,
        /// Destination directory
        #[arg(long, default_value = "docs-new")]
        to: String,
    },
    /// Score documentation quality
    Quality {
        /// Criterion to assess (repeatable); all when omitted
        #[arg(long = "criterion", value_enum)]
        criteria: Vec<Criterion>,
        /// Documentation directory
        #[arg(long)]
        docs_path: Option<String>,
    },
    /// Serve the tools over MCP on stdin/stdout
    Serve,
    /// Report docs affected by changes since the baseline
    Sync {
        /// Also rebuild the dependency graph and refresh the baseline
        #[arg(long, value_enum, default_value_t = SyncMode::Reactive)]
        mode: SyncMode,
    },
    /// Build the doc-to-code dependency graph
    Track {
        /// Documentation directory
        #[arg(long)]
        docs_path: Option<String>,
    },
    /// Check links, images and code blocks
    Validate {
        /// Documentation directory
        #[arg(long)]
        docs_path: Option<String>,
        /// Skip image checks
        #[arg(long)]
        no_assets: bool,
        /// Skip link checks
        #[arg(long)]
        no_links: bool,
        /// Skip code block parsing
        #[arg(long)]
        no_snippets: bool,
        /// Check function and class mentions against the code
        #[arg(long)]
        symbols: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    let cli = Cli::parse();

    let project_path = match project_root(cli.project.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            diagnostics::print_error(&diagnostics::render_error(&e));
            return ExitCode::FAILURE;
        },
    };
    let Some(request) = to_request(cli.command, project_path, cli.format) else {
        return serve();
    };

    let output = tools::execute(&request);
    if output.starts_with("Error:") {
        diagnostics::print_error(&output);
        return ExitCode::FAILURE;
    }
    println!("{output}");
    return ExitCode::SUCCESS;
}

/// Absolute project root as a string for the tool layer.
///
/// # Errors
///
/// Returns `Error::Io` when the current directory is unavailable.
fn project_root(project: Option<&Path>) -> Result<String, error::Error> {
    let cwd = std::env::current_dir()?;
    let root = project.map_or_else(|| return cwd.clone(), |p| return cwd.join(p));
    return Ok(root.to_string_lossy().into_owned());
}

/// Run the MCP server until stdin closes.
fn serve() -> ExitCode {
    let stdin = std::io::stdin();
    return match mcp::serve(stdin.lock(), std::io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&diagnostics::render_error(&e));
            ExitCode::FAILURE
        },
    };
}

/// Translate a subcommand into the request the matching tool takes.
/// `None` for `serve`, which is not a tool.
fn to_request(command: Commands, project_path: String, response_format: ResponseFormat) -> Option<ToolRequest> {
    let request = match command {
        Commands::Bootstrap { docs_path, platform } => ToolRequest::Bootstrap(BootstrapRequest {
            docs_path,
            platform,
            project_path,
        }),
        Commands::Changes { since } => ToolRequest::MapChanges(MapChangesRequest {
            project_path,
            response_format,
            since_commit: since,
        }),
        Commands::DetectPlatform => ToolRequest::DetectPlatform(DetectPlatformRequest {
            project_path,
            response_format,
        }),
        Commands::InitConfig { exclude, platform } => ToolRequest::InitializeConfig(InitializeConfigRequest {
            exclude_patterns: if exclude.is_empty() { request::default_exclude_patterns() } else { exclude },
            platform,
            project_path,
        }),
        Commands::InitMemory => ToolRequest::InitializeMemory(InitializeMemoryRequest { project_path }),
        Commands::Migrate {
            dry_run,
            from,
            no_history,
            platform,
            to,
        } => ToolRequest::Migrate(MigrateRequest {
            dry_run,
            existing_docs_path: from,
            new_docs_path: to,
            preserve_history: !no_history,
            project_path,
            target_platform: platform,
        }),
        Commands::Quality { criteria, docs_path } => ToolRequest::AssessQuality(AssessQualityRequest {
            criteria: Some(criteria),
            docs_path,
            project_path,
            response_format,
        }),
        Commands::Serve => return None,
        Commands::Sync { mode } => ToolRequest::Sync(SyncRequest {
            mode,
            project_path,
            response_format,
        }),
        Commands::Track { docs_path } => ToolRequest::TrackDependencies(TrackDependenciesRequest {
            docs_path,
            project_path,
            response_format,
        }),
        Commands::Validate {
            docs_path,
            no_assets,
            no_links,
            no_snippets,
            symbols,
        } => ToolRequest::ValidateDocs(ValidateDocsRequest {
            check_assets: !no_assets,
            check_links: !no_links,
            check_snippets: !no_snippets,
            docs_path,
            project_path,
            response_format,
            validate_symbols: symbols,
        }),
    };
    return Some(request);
}
