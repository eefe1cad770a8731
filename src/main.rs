//! Ocular Screen CLI
//!
//! Eye-tracking analysis engine for trauma-response screening research.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ocular_screen::{
    audit::create_shared_log_with_persistence,
    config::Config,
    core::{ReportBuilder, SessionAnalyzer},
    session::{
        CallerId, MemoryStore, NewStimulus, Sample, Session, SessionId, SessionStatus,
    },
    AnalysisError, SCREENING_DISCLAIMER, VERSION,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocular-screen")]
#[command(version = VERSION)]
#[command(about = "Eye-tracking analysis engine for trauma-response screening", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded session file
    Analyze {
        /// Session file with a session header and its samples
        #[arg(long, short)]
        input: PathBuf,

        /// Write the output here instead of the default destination
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Export a full screening report (to the configured export path
        /// unless --output is given) instead of printing the bare result
        #[arg(long)]
        report: bool,
    },

    /// Start the HTTP service (requires server feature)
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config,

    /// Display the screening disclaimer
    Disclaimer,
}

/// Session header in an analysis input file.
#[derive(Debug, Deserialize)]
struct SessionHeader {
    #[serde(default, alias = "participantName")]
    participant_name: Option<String>,
    #[serde(default, alias = "participantAge")]
    participant_age: Option<u32>,
    #[serde(default, alias = "sessionType")]
    session_type: Option<String>,
    #[serde(alias = "startTime")]
    start_time: i64,
    #[serde(default, alias = "endTime")]
    end_time: Option<i64>,
}

/// Analysis input file layout.
#[derive(Debug, Deserialize)]
struct AnalyzeInput {
    session: SessionHeader,
    samples: Vec<Sample>,
    #[serde(default)]
    stimuli: Vec<NewStimulus>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            output,
            report,
        } => cmd_analyze(&config, &input, output.as_deref(), report),
        Commands::Serve { port } => cmd_serve(&config, port).await,
        Commands::Config => cmd_config(&config),
        Commands::Disclaimer => {
            println!("{}", SCREENING_DISCLAIMER.trim());
            Ok(())
        }
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };

    // stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_analyze(config: &Config, input: &Path, output: Option<&Path>, report: bool) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Could not read input file {}", input.display()))?;
    let parsed: AnalyzeInput = serde_json::from_str(&content)
        .with_context(|| format!("Malformed session file {}", input.display()))?;

    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create directories: {}", e);
    }
    let activity = create_shared_log_with_persistence(config.audit_path());

    let caller = CallerId::authenticate(Some("cli"))?;
    let store = Arc::new(MemoryStore::new());
    for stimulus in parsed.stimuli {
        store.register_stimulus(stimulus)?;
    }

    let header = parsed.session;
    let session_id = SessionId::generate();
    store.insert_session(Session {
        id: session_id.clone(),
        owner: caller.clone(),
        participant_name: header.participant_name.unwrap_or_default(),
        participant_age: header.participant_age,
        session_type: header
            .session_type
            .unwrap_or_else(|| "screening".to_string()),
        status: if header.end_time.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        },
        start_time: header.start_time,
        end_time: header.end_time,
        analysis_results: None,
    })?;

    let recorded = store.record_samples(&caller, &session_id, parsed.samples)?;
    activity.record_samples(recorded as u64);

    let analyzer = SessionAnalyzer::new(store.clone(), store.clone());
    let result = match analyzer.analyze(&caller, &session_id) {
        Ok(result) => {
            activity.record_analysis_completed();
            result
        }
        Err(e) => {
            if matches!(e, AnalysisError::InsufficientData(_)) {
                activity.record_analysis_refused();
            }
            if let Err(save_err) = activity.save() {
                tracing::warn!("Could not save activity log: {}", save_err);
            }
            return Err(e.into());
        }
    };

    let (json, destination) = if report {
        let session = store.get_session(&caller, &session_id)?;
        let json = ReportBuilder::new().build_json(&session, &result)?;
        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.report_path(session_id.as_str(), Utc::now()));
        (json, Some(path))
    } else {
        (
            serde_json::to_string_pretty(&result)?,
            output.map(Path::to_path_buf),
        )
    };

    match destination {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Could not write output to {}", path.display()))?;
            if report {
                activity.record_report_exported();
            }
            eprintln!("Wrote analysis to {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Err(e) = activity.save() {
        tracing::warn!("Could not save activity log: {}", e);
    }

    Ok(())
}

#[cfg(feature = "server")]
async fn cmd_serve(config: &Config, port: Option<u16>) -> Result<()> {
    use ocular_screen::server::{run, ServerConfig};

    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create directories: {}", e);
    }

    let server_config = ServerConfig::new(
        port.unwrap_or(config.server_port),
        Some(config.data_path.clone()),
    );
    let (addr, shutdown) = run(server_config).await?;

    println!("Ocular Screen v{VERSION}");
    println!("Listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Could not listen for Ctrl+C")?;
    let _ = shutdown.send(());

    Ok(())
}

#[cfg(not(feature = "server"))]
async fn cmd_serve(_config: &Config, _port: Option<u16>) -> Result<()> {
    anyhow::bail!("This build does not include the HTTP server; rebuild with --features server")
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    let activity = create_shared_log_with_persistence(config.audit_path());
    println!();
    println!("{}", activity.summary());
    Ok(())
}
