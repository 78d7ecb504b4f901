//! Vibe Coding CLI
//!
//! Runs the engagement service: HTTP API, WebSocket events and the demo
//! metrics ticker. Writes a report per live session on shutdown.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use vibe_engagement::{
    create_router, spawn_ticker, AppState, Config, LearningPathway, SessionSnapshot,
    SnippetCatalog, TaskList,
};
use vibe_llm::StructuredOutputClient;
use vibe_report::{
    json::JsonGenerator, MarkdownGenerator, PathwayChangeInput, ReportGenerator, ReportInput,
    ReportPathway, SessionMetrics,
};

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Vibe Coding - Adaptive engagement service
///
/// Tracks learner engagement with the book's exercises, classifies learners
/// into pathways, serves adaptive hints and the teacher dashboard.
#[derive(Parser, Debug)]
#[command(name = "vibe")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: vibe.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seed for the demo metrics ticker, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Directory containing the book's Chapter_NN folders
    #[arg(long, value_name = "DIR")]
    snippets_dir: Option<String>,

    /// Output directory for session reports
    #[arg(short, long, value_name = "DIR")]
    report_dir: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Vibe engagement service starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the service until Ctrl+C.
///
/// 1. Load config and apply CLI overrides
/// 2. Load snippets and the to-do list
/// 3. Start the HTTP server and the ticker
/// 4. Wait for Ctrl+C
/// 5. Save tasks and write session reports
async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(ref dir) = args.snippets_dir {
        config.snippets_dir.clone_from(dir);
    }
    if let Some(ref dir) = args.report_dir {
        config.report_dir.clone_from(dir);
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    let snippets = SnippetCatalog::load(&config.snippets_dir)?;
    println!("Snippets loaded: {}", snippets.len());

    let tasks_path = PathBuf::from(&config.tasks_file);
    let tasks = TaskList::load(&tasks_path).await?;
    println!("Tasks loaded: {}", tasks.tasks().len());

    let mut app_state = AppState::new(config.clone())
        .with_snippets(snippets)
        .with_tasks(tasks);
    if let Some(analyzer) = build_analyzer(&config)? {
        app_state = app_state.with_analyzer(analyzer);
        println!("Code analyzer: enabled ({})", config.llm.default_model);
    } else {
        println!(
            "Code analyzer: disabled (set {} or send apiKey per request)",
            config.llm.api_key_env
        );
    }

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    println!();
    println!("Starting HTTP API server on {addr}...");

    let router = create_router(app_state.clone());
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });
    let ticker_handle = spawn_ticker(app_state.clone());

    println!("HTTP API server running on http://{addr}");
    println!("WebSocket events on ws://{addr}/ws");
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to listen for Ctrl+C: {e}"))?;
    tracing::info!("Received Ctrl+C, shutting down");

    println!();
    println!("Shutting down...");
    ticker_handle.abort();
    server_handle.abort();

    app_state.tasks.lock().await.save(&tasks_path).await?;
    println!("Tasks saved to {}", tasks_path.display());

    let sessions = app_state.sessions.lock().await.list();
    generate_reports(&sessions, Path::new(&config.report_dir))?;

    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Builds the server-side analyzer when the configured API key variable is set.
fn build_analyzer(config: &Config) -> anyhow::Result<Option<StructuredOutputClient>> {
    let Some(api_key) = config.llm.api_key_from_env() else {
        tracing::info!(env = %config.llm.api_key_env, "No API key in environment");
        return Ok(None);
    };

    let client = StructuredOutputClient::new(
        api_key,
        config.llm.base_url.as_str(),
        Duration::from_secs(config.llm.timeout_secs),
    )?;
    Ok(Some(client))
}

/// Prints the effective configuration.
fn print_config(config: &Config) {
    println!("Configuration:");
    println!("  Tick interval: {}s", config.tick_interval_secs);
    match config.simulation.seed {
        Some(seed) => println!("  Simulation seed: {seed}"),
        None => println!("  Simulation seed: random"),
    }
    println!("  Snippets: {}", config.snippets_dir);
    println!("  Tasks file: {}", config.tasks_file);
    println!("  Reports: {}", config.report_dir);
    println!("  LLM endpoint: {}", config.llm.base_url);
}

/// Writes a Markdown and a JSON report for every session.
fn generate_reports(sessions: &[SessionSnapshot], output_dir: &Path) -> anyhow::Result<()> {
    if sessions.is_empty() {
        println!("No live sessions, skipping reports");
        return Ok(());
    }

    println!();
    println!("Generating reports for {} session(s)...", sessions.len());
    std::fs::create_dir_all(output_dir)?;

    for snapshot in sessions {
        let report = ReportGenerator::new(create_report_input(snapshot)).generate();
        let stem = report.file_stem();

        let md_path = output_dir.join(format!("{stem}.md"));
        std::fs::write(&md_path, MarkdownGenerator::new(&report).generate())?;
        println!("  Markdown report: {}", md_path.display());

        let json_path = output_dir.join(format!("{stem}.json"));
        JsonGenerator::new(&report).write_to_file(&json_path, true)?;
        println!("  JSON report: {}", json_path.display());

        tracing::info!(
            session = %report.session_id,
            pathway = %report.summary.final_pathway,
            recommendations = report.recommendations.len(),
            "Report written"
        );
    }

    Ok(())
}

/// Creates a `ReportInput` from a session snapshot.
fn create_report_input(snapshot: &SessionSnapshot) -> ReportInput {
    let metrics = &snapshot.metrics;
    ReportInput {
        session_id: snapshot.id.to_string(),
        chapter_id: snapshot.chapter_id.clone(),
        section_id: snapshot.section_id.clone(),
        started_at: snapshot.created_at,
        ended_at: Utc::now(),
        ticks: snapshot.ticks,
        pathway: convert_pathway(metrics.learning_pathway()),
        metrics: SessionMetrics {
            time_spent: metrics.time_spent(),
            code_interactions: metrics.code_interactions(),
            ai_prompts: metrics.ai_prompts(),
            code_modifications: metrics.code_modifications(),
            execution_success: metrics.execution_success(),
            execution_failures: metrics.execution_failures(),
            ai_assistance_requests: metrics.ai_assistance_requests(),
            concept_extensions: metrics.concept_extensions(),
            confidence_score: metrics.confidence_score(),
        },
        pathway_changes: snapshot
            .pathway_changes
            .iter()
            .map(|change| PathwayChangeInput {
                from: convert_pathway(change.from),
                to: convert_pathway(change.to),
                at: change.at,
                tick: change.tick,
            })
            .collect(),
        hints_shown: snapshot
            .hints_shown
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
    }
}

/// Converts `LearningPathway` to `ReportPathway`.
const fn convert_pathway(pathway: LearningPathway) -> ReportPathway {
    match pathway {
        LearningPathway::Beginner => ReportPathway::Beginner,
        LearningPathway::Advanced => ReportPathway::Advanced,
        LearningPathway::Ninja => ReportPathway::Ninja,
    }
}
