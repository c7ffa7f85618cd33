//! SDX CLI - staging area driver
//!
//! Drives the staging subsystem against a local SQLite database. Entity
//! persistence and search run on the in-memory collaborators, so matched
//! entities live only for the duration of one invocation; seed them with
//! `--entities` when a command needs a populated store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use sdx_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use sdx_common::types::EntityKey;
use sdx_core::config::{ExtractionRule, MatchingConfig, StagingConfig};
use sdx_core::db;
use sdx_core::features::jobs::commands::submit_batch::{self, SubmitBatchCommand};
use sdx_core::features::jobs::queries::get_job::{self, GetJobQuery};
use sdx_core::features::jobs::queries::list_jobs::{self, ListJobsQuery};
use sdx_core::features::matching::queries::find_matches_for_json::{
    self, FindMatchesForJsonQuery,
};
use sdx_core::features::staging::commands::create_record::{self, CreateRecordCommand};
use sdx_core::features::staging::commands::process_record::{self, ProcessRecordCommand};
use sdx_core::features::staging::queries::get_record::{self, GetRecordQuery};
use sdx_core::features::staging::queries::list_records::{self, ListRecordsQuery};
use sdx_core::models::{MatchableKeyValue, ProcessingActionConfig, RecordStatus};
use sdx_core::services::extractor::PointerExtractor;
use sdx_core::services::memory::{MemoryEntityStore, MemoryIndex};
use sdx_core::AppContext;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "sdx")]
#[command(author, version, about = "SDX staging area driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file, overriding SDX_DATABASE_PATH (":memory:" allowed)
    #[arg(long, global = true)]
    database: Option<String>,

    /// JSON file of entities to seed into the in-memory store
    #[arg(long, global = true)]
    entities: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Stage a new record
    Create {
        /// Record kind (must be registered)
        kind: String,

        /// Inline JSON payload
        #[arg(short, long)]
        payload: Option<String>,

        /// File containing the JSON payload
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show one staged record with its metadata
    Show {
        /// Staged record id
        record_id: String,

        /// Record version (latest when omitted)
        #[arg(long)]
        version: Option<i64>,
    },

    /// List staged records
    List {
        /// Filter by kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by status (staged, merged, imported, rejected)
        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,
    },

    /// Probe the index with tuples extracted from a payload
    Matches {
        /// Record kind (must be registered)
        kind: String,

        /// Inline JSON payload
        #[arg(short, long)]
        payload: Option<String>,

        /// File containing the JSON payload
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Run a processing chain against one staged record
    Process {
        /// Staged record id
        record_id: String,

        /// Actions: a JSON array of configs, or comma-separated names
        #[arg(short, long)]
        actions: String,

        /// Entity id the record was matched to
        #[arg(short, long)]
        matched: Option<String>,

        /// Record version to process (latest when omitted)
        #[arg(long)]
        version: Option<i64>,

        /// Run the chain without persisting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Submit a batch of records for asynchronous processing
    Submit {
        /// Inline processing configuration set JSON
        #[arg(short, long)]
        payload: Option<String>,

        /// File containing the processing configuration set
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Record version to process (latest when omitted)
        #[arg(long)]
        version: Option<i64>,

        /// Run the chains without persisting anything
        #[arg(long)]
        dry_run: bool,

        /// Return after submission without waiting for the batch
        #[arg(long)]
        no_wait: bool,
    },

    /// Show one processing job
    Job {
        /// Job id
        job_id: String,
    },

    /// List processing jobs, newest first
    Jobs {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("sdx-cli".to_string())
            .build()
    } else {
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("sdx-cli".to_string())
            .build()
    };
    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    // The CLI should work even when logging cannot be set up
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: Cli) -> Result<()> {
    let ctx = build_context(&cli).await?;

    match cli.command {
        Command::Init => {
            println!("Database initialized at {}", ctx.config.database.path);
        },

        Command::Create {
            kind,
            payload,
            file,
        } => {
            let payload = read_input(payload, file)?;
            let response = create_record::handle(
                ctx.clone(),
                CreateRecordCommand {
                    kind,
                    payload,
                    validations: Vec::new(),
                },
            )
            .await?;
            print_json(&response)?;
        },

        Command::Show { record_id, version } => {
            let record_id = Uuid::parse_str(record_id.trim()).context("invalid record id")?;
            let response =
                get_record::handle(ctx.clone(), GetRecordQuery { record_id, version }).await?;
            print_json(&response)?;
        },

        Command::List {
            kind,
            status,
            limit,
            offset,
        } => {
            let status = status
                .map(|s| s.parse::<RecordStatus>().map_err(|e| anyhow::anyhow!(e)))
                .transpose()?;
            let response = list_records::handle(
                ctx.clone(),
                ListRecordsQuery {
                    kind,
                    status,
                    limit,
                    offset,
                },
            )
            .await?;

            println!("{}", "Staged Records:".cyan().bold());
            for record in &response.records {
                println!(
                    "{}  v{}  {:9}  {}  {}",
                    record.record_id,
                    record.version,
                    record.status,
                    record.kind,
                    record.updated_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
            println!("Total: {}", response.total);
        },

        Command::Matches {
            kind,
            payload,
            file,
        } => {
            let payload = read_input(payload, file)?;
            let summary = find_matches_for_json::handle(
                ctx.clone(),
                FindMatchesForJsonQuery { kind, payload },
            )
            .await?;
            print_json(&summary)?;

            let ambiguous = summary.multiply_matched_keys();
            if !ambiguous.is_empty() {
                println!(
                    "{} {}",
                    "Multiply matched keys:".yellow().bold(),
                    ambiguous.join(", ")
                );
            }
        },

        Command::Process {
            record_id,
            actions,
            matched,
            version,
            dry_run,
        } => {
            let outcome = process_record::handle(
                ctx.clone(),
                ProcessRecordCommand {
                    staging_record_id: record_id,
                    matched_entity_id: matched,
                    version,
                    persist: !dry_run,
                    actions: parse_actions(&actions)?,
                    principal: None,
                },
            )
            .await?;
            print_json(&outcome)?;
        },

        Command::Submit {
            payload,
            file,
            version,
            dry_run,
            no_wait,
        } => {
            let processing_json = read_input(payload, file)?;
            let response = submit_batch::handle(
                ctx.clone(),
                SubmitBatchCommand {
                    processing_json,
                    version,
                    persist: !dry_run,
                    principal: None,
                },
            )
            .await?;
            print_json(&response)?;

            if no_wait {
                info!(job_id = %response.job_id, "not waiting for batch completion");
            } else {
                ctx.runner.join(response.job_id).await;
                let job = get_job::handle(
                    ctx.clone(),
                    GetJobQuery {
                        job_id: response.job_id.to_string(),
                    },
                )
                .await?;
                print_json(&job)?;
            }
        },

        Command::Job { job_id } => {
            let job = get_job::handle(ctx.clone(), GetJobQuery { job_id }).await?;
            print_json(&job)?;
        },

        Command::Jobs { limit, offset } => {
            let response =
                list_jobs::handle(ctx.clone(), ListJobsQuery { limit, offset }).await?;

            println!("{}", "Processing Jobs:".cyan().bold());
            for job in &response.jobs {
                println!(
                    "{}  {:9}  started {}  {}",
                    job.id,
                    job.job_status,
                    job.start_date.format("%Y-%m-%d %H:%M:%S"),
                    job.status_message,
                );
            }
            println!("Total: {}", response.total);
        },
    }

    Ok(())
}

/// Wire a context from environment configuration plus the CLI overrides
async fn build_context(cli: &Cli) -> Result<AppContext> {
    let mut config = StagingConfig::load()?;
    if let Some(path) = &cli.database {
        config.database.path = path.clone();
    }
    if config.matching.registered_kinds.is_empty() {
        info!("no kinds configured, using the demo substance setup");
        config.matching = demo_matching();
    }

    let pool = db::create_pool(&config.database).await?;
    db::init_schema(&pool).await?;

    let entities = Arc::new(MemoryEntityStore::new());
    let index = Arc::new(MemoryIndex::new());
    if let Some(path) = &cli.entities {
        seed_entities(&entities, &index, path).await?;
    }

    let extractor = Arc::new(PointerExtractor::from_config(&config));
    Ok(AppContext::new(pool, config, entities, index, extractor))
}

/// Demo configuration used when the environment registers no kinds
fn demo_matching() -> MatchingConfig {
    let mut extraction = HashMap::new();
    extraction.insert(
        "substance".to_string(),
        vec![
            extraction_rule("Name", "/name"),
            extraction_rule("CAS", "/codes/cas"),
            extraction_rule("Synonym", "/synonyms"),
        ],
    );
    MatchingConfig {
        registered_kinds: vec!["substance".to_string()],
        extraction,
    }
}

fn extraction_rule(key: &str, pointer: &str) -> ExtractionRule {
    ExtractionRule {
        key: key.to_string(),
        pointer: pointer.to_string(),
    }
}

/// One entry of an `--entities` seed file
#[derive(Debug, serde::Deserialize)]
struct SeedEntity {
    kind: String,
    id: String,
    entity: serde_json::Value,
    #[serde(default)]
    tuples: Vec<MatchableKeyValue>,
}

async fn seed_entities(
    entities: &Arc<MemoryEntityStore>,
    index: &Arc<MemoryIndex>,
    path: &PathBuf,
) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading entities file {}", path.display()))?;
    let seeds: Vec<SeedEntity> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing entities file {}", path.display()))?;

    let count = seeds.len();
    for seed in seeds {
        entities.insert(&seed.kind, &seed.id, seed.entity).await;
        for tuple in &seed.tuples {
            index
                .index_tuple(
                    &seed.kind,
                    &tuple.key,
                    &tuple.value,
                    EntityKey::new(&seed.kind, &seed.id),
                )
                .await;
        }
    }
    info!(count, "seeded entities into the in-memory store");
    Ok(())
}

fn read_input(inline: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => bail!("provide either an inline payload or a file, not both"),
        (Some(value), None) => Ok(value),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading payload file {}", path.display())),
        (None, None) => bail!("a payload is required, via --payload or --file"),
    }
}

/// Parse either a JSON array of action configs or comma-separated names
fn parse_actions(spec: &str) -> Result<Vec<ProcessingActionConfig>> {
    let spec = spec.trim();
    if spec.starts_with('[') {
        serde_json::from_str(spec).context("parsing actions JSON")
    } else {
        Ok(spec
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProcessingActionConfig::new)
            .collect())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
