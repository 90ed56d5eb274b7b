//! Command-line interface
//!
//! ```text
//! csv-auditor audit --category "Atlético y Deportivo" Formato_*.csv
//! csv-auditor audit-all ./submissions --resolver gemini --json
//! csv-auditor categories
//! ```

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::llm_resolver::LlmResolver;
use crate::domain::audit::CategoryReport;
use crate::domain::audit_config::AuditConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMProvider;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::llm_clients::RouterClient;
use crate::infrastructure::report::{default_report_name, write_csv_report_to_path, write_workbook};

#[derive(Parser, Debug)]
#[command(name = "csv-auditor")]
#[command(about = "Audit per-campus CSV submissions against category schemas", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file layered over the built-in reference configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Correction backend consulted when local matching finds nothing
    #[arg(long, global = true, value_enum, default_value_t = ResolverKind::None)]
    pub resolver: ResolverKind,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit the files submitted for one category
    Audit(AuditArgs),
    /// Audit a directory holding one sub-directory per category
    #[command(name = "audit-all")]
    AuditAll(AuditAllArgs),
    /// List configured categories and their required columns
    Categories,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Category name as configured
    #[arg(long)]
    pub category: String,

    #[command(flatten)]
    pub output: OutputArgs,

    /// CSV files to audit
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AuditAllArgs {
    /// Root directory, e.g. ./submissions/CVDP/Formato_CVDP_MTY.csv
    pub dir: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Workbook path (defaults to Reporte_Auditoria_<label>_<timestamp>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the unit tables as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Print the reports as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResolverKind {
    None,
    Gemini,
    Openai,
}

impl ResolverKind {
    fn provider(self) -> Option<LLMProvider> {
        match self {
            ResolverKind::None => None,
            ResolverKind::Gemini => Some(LLMProvider::Google),
            ResolverKind::Openai => Some(LLMProvider::OpenAI),
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let config_service = match &cli.config {
        Some(path) => ConfigService::with_file(path)?,
        None => ConfigService::new(),
    };
    let config = config_service.load()?;

    match cli.command {
        Command::Categories => {
            print!("{}", render_categories(&config));
            Ok(())
        }
        Command::Audit(args) => {
            let mut service = build_service(config, &config_service, cli.resolver)?;
            let report = service.audit_paths(&args.category, &args.files)?;
            emit(&[report], &args.category, &args.output)
        }
        Command::AuditAll(args) => {
            let mut service = build_service(config, &config_service, cli.resolver)?;
            let reports = service.audit_directory(&args.dir)?;
            emit(&reports, "Completo", &args.output)
        }
    }
}

/// Audit service with the requested backend. A backend without an API key
/// is dropped with a warning; local matching still runs.
fn build_service(
    config: AuditConfig,
    config_service: &ConfigService,
    kind: ResolverKind,
) -> Result<AuditService> {
    let service = AuditService::new(config);
    let Some(provider) = kind.provider() else {
        return Ok(service);
    };

    match config_service.llm_config(provider) {
        Ok(llm_config) => {
            let resolver = LlmResolver::new(Arc::new(RouterClient::new()), llm_config)?;
            Ok(service.with_external(Box::new(resolver)))
        }
        Err(e) => {
            warn!(error = %e, "Continuing with local matching only");
            Ok(service)
        }
    }
}

fn emit(reports: &[CategoryReport], label: &str, output: &OutputArgs) -> Result<()> {
    if output.json {
        let json = serde_json::to_string_pretty(reports)
            .map_err(|e| AppError::Internal(format!("Failed to serialize reports: {}", e)))?;
        println!("{}", json);
    } else {
        for report in reports {
            print!("{}", render_report(report));
        }
    }

    let workbook = output
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_report_name(label, Local::now())));
    write_workbook(reports, &workbook)?;
    info!(path = %workbook.display(), "Report saved");

    if let Some(path) = &output.csv {
        write_csv_report_to_path(reports, path)?;
        info!(path = %path.display(), "CSV report saved");
    }

    Ok(())
}

/// Human-readable summary of one category
pub fn render_report(report: &CategoryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", report.category);
    let _ = writeln!(
        out,
        "Campus with files: {}/{}  complete: {}  rows: {} valid of {}",
        report.submitted_units(),
        report.units.len(),
        report.complete_units(),
        report.valid_rows(),
        report.total_rows()
    );

    for unit in report.units.iter().filter(|u| u.has_submission) {
        let status = if unit.is_complete { "complete" } else { "incomplete" };
        let _ = write!(
            out,
            "  {:<4} {:<10} {}/{} valid",
            unit.unit_code, status, unit.valid_rows, unit.total_rows
        );
        if !unit.error_summary.is_empty() {
            let _ = write!(out, "  {}", unit.error_summary);
        }
        out.push('\n');
    }

    let missing: Vec<&str> = report
        .units
        .iter()
        .filter(|u| !u.has_submission)
        .map(|u| u.unit_code.as_str())
        .collect();
    if !missing.is_empty() {
        let _ = writeln!(out, "  No submission: {}", missing.join(", "));
    }

    for skipped in &report.skipped {
        let _ = writeln!(out, "  Skipped {}: {}", display_name(&skipped.file_name), skipped.reason);
    }
    for (file_name, warning) in &report.warnings {
        let _ = writeln!(out, "  Warning {}: {}", file_name, warning);
    }
    if !report.corrections.is_empty() {
        let _ = writeln!(out, "  Corrections:");
        for correction in &report.corrections {
            let _ = writeln!(out, "    {}", correction);
        }
    }

    out
}

fn render_categories(config: &AuditConfig) -> String {
    let mut out = String::new();
    for (name, schema) in &config.categories {
        let _ = writeln!(out, "{}", name);
        if let Some(pattern) = &schema.file_name_pattern {
            let _ = writeln!(out, "  file name: {}", pattern);
        }
        let _ = writeln!(out, "  columns:   {}", schema.required_fields.join(", "));
        if !schema.valid_codes.is_empty() {
            let _ = writeln!(out, "  key codes: {}", schema.valid_codes.join(", "));
        }
    }
    out
}

fn display_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
}
