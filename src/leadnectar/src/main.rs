//! LeadNectar: sequence and campaign core for the outreach CRM.
//!
//! Command-line entry point: seeds demo data, validates exported sequences,
//! and renders templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use leadnectar_campaigns::{CampaignEvent, CampaignRegistry, FunnelMetrics};
use leadnectar_core::config::AppConfig;
use leadnectar_core::TemplateCatalog;
use leadnectar_sequences::format::{describe_step, format_trigger};
use leadnectar_sequences::validation::{validate_step, validate_trigger};
use leadnectar_sequences::{validate_sequence, Sequence, SequenceEngine, SequenceEvent};
use leadnectar_store::{MemoryStore, RecordStore};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "leadnectar")]
#[command(about = "Email sequence and campaign tooling for LeadNectar")]
#[command(version)]
struct Cli {
    /// Tenant identifier (overrides config)
    #[arg(long, env = "LEADNECTAR__TENANT_ID")]
    tenant: Option<String>,

    /// Maximum steps per sequence (overrides config)
    #[arg(long, env = "LEADNECTAR__SEQUENCES__MAX_STEPS")]
    max_steps: Option<usize>,

    /// Human-readable logs instead of JSON
    #[arg(long, default_value_t = false)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed demo sequences and campaigns, run a lifecycle, print a JSON report
    Demo,
    /// Check a sequence exported as JSON
    Validate {
        /// Path to the sequence JSON file
        path: PathBuf,
    },
    /// Render a demo template
    Render {
        template_id: String,
        /// Template variable as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Some(tenant) = cli.tenant {
        config.tenant_id = tenant;
    }
    if let Some(max_steps) = cli.max_steps {
        config.sequences.max_steps = max_steps;
    }
    if cli.plain_logs {
        config.logging.json = false;
    }

    init_tracing(&config);

    info!(
        tenant_id = %config.tenant_id,
        store = %config.store.backend,
        max_steps = config.sequences.max_steps,
        "Configuration loaded"
    );

    match cli.command {
        Command::Demo => run_demo(&config),
        Command::Validate { path } => run_validate(&path),
        Command::Render { template_id, vars } => run_render(&template_id, vars),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter.clone().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[derive(Serialize)]
struct DemoReport {
    tenant_id: String,
    sequences: Vec<SequenceSummary>,
    campaigns: leadnectar_campaigns::MetricsRollup,
}

#[derive(Serialize)]
struct SequenceSummary {
    name: String,
    status: leadnectar_sequences::SequenceStatus,
    trigger: String,
    total_delay_hours: i64,
    steps: Vec<String>,
}

fn run_demo(config: &AppConfig) -> anyhow::Result<ExitCode> {
    if config.store.backend != "memory" {
        warn!(backend = %config.store.backend, "Only the in-memory store is available from the CLI");
    }
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let catalog = TemplateCatalog::demo();

    let engine = SequenceEngine::new(store.clone()).with_config(config.sequences.clone());
    let registry = CampaignRegistry::new(store).with_config(config.campaigns.clone());

    let ids = engine.seed_demo_sequences()?;
    let start = chrono::Utc::now().date_naive();

    for (i, id) in ids.iter().enumerate() {
        engine.apply_event(*id, SequenceEvent::Activate)?;
        let sequence = engine
            .get_sequence(*id)
            .ok_or_else(|| anyhow!("seeded sequence {} vanished", id))?;
        let campaign = registry.create_from_sequence(&sequence, 120 * (i as u64 + 1), start, None)?;
        registry.apply_event(campaign.id, CampaignEvent::Activate)?;
        registry.record_metrics(campaign.id, FunnelMetrics::new(78, 52, 21, 14))?;
        registry.set_progress(campaign.id, 65)?;
    }
    if let Some(last) = ids.last() {
        engine.apply_event(*last, SequenceEvent::Pause)?;
    }

    let report = DemoReport {
        tenant_id: config.tenant_id.clone(),
        sequences: engine
            .list_sequences()
            .iter()
            .map(|s| summarize(s, &catalog))
            .collect(),
        campaigns: registry.rollup(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn summarize(sequence: &Sequence, catalog: &TemplateCatalog) -> SequenceSummary {
    SequenceSummary {
        name: sequence.name.clone(),
        status: sequence.status,
        trigger: format_trigger(&sequence.trigger),
        total_delay_hours: sequence.total_delay().num_hours(),
        steps: sequence
            .steps
            .iter()
            .map(|s| describe_step(s, catalog))
            .collect(),
    }
}

fn run_validate(path: &Path) -> anyhow::Result<ExitCode> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let report = check_export(&raw, &TemplateCatalog::demo());
    for line in &report.lines {
        println!("{}", line);
    }

    if report.problems == 0 {
        println!("OK");
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(path = %path.display(), problems = report.problems, "Sequence failed validation");
        println!("{} problem(s) found", report.problems);
        Ok(ExitCode::FAILURE)
    }
}

/// Printable outcome of checking one exported sequence.
struct ExportReport {
    lines: Vec<String>,
    problems: usize,
}

/// Check an exported sequence. A document that does not parse, such as one
/// with an unknown delay unit or condition type, counts as one problem.
fn check_export(raw: &str, catalog: &TemplateCatalog) -> ExportReport {
    let sequence: Sequence = match serde_json::from_str(raw) {
        Ok(sequence) => sequence,
        Err(e) => {
            return ExportReport {
                lines: vec![format!("  ! unreadable sequence: {}", e)],
                problems: 1,
            }
        }
    };

    let mut lines = vec![format!("{}: {}", sequence.name, format_trigger(&sequence.trigger))];
    let mut problems = 0usize;
    if let Err(e) = validate_trigger(&sequence.trigger) {
        lines.push(format!("  ! {}", e));
        problems += 1;
    }
    for (index, step) in sequence.steps.iter().enumerate() {
        lines.push(format!("  {}. {}", index + 1, describe_step(step, catalog)));
        if let Err(e) = validate_step(step) {
            lines.push(format!("     ! {}", e));
            problems += 1;
        }
    }
    for dangling in validate_sequence(&sequence) {
        lines.push(format!("  ! {}", dangling));
        problems += 1;
    }
    ExportReport { lines, problems }
}

fn run_render(template_id: &str, vars: Vec<(String, String)>) -> anyhow::Result<ExitCode> {
    let catalog = TemplateCatalog::demo();
    let variables: HashMap<String, String> = vars.into_iter().collect();
    let rendered = catalog
        .render(template_id, &variables)
        .ok_or_else(|| anyhow!("unknown template {}", template_id))?;

    println!("Subject: {}\n\n{}", rendered.subject, rendered.body);
    if !rendered.missing.is_empty() {
        warn!(missing = ?rendered.missing, "Template rendered with unresolved variables");
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}
