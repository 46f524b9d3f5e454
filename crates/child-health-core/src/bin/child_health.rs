//! Child Health CLI Tool
//!
//! Growth analysis and vaccination schedule queries over a child record
//! stored as JSON.
//!
//! Usage:
//!   child-health age <birth-date> [--on <date>]
//!   child-health growth <record.json>
//!   child-health schedule <record.json>
//!   child-health report <record.json> [--today <date>] [--pretty]

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use child_health_core::{
    months_between_dates, parse_iso_date, AgeBreakdown, AnalysisConfig, ChildHealthError, ChildRecord,
    CoverageSummary, GrowthAnalyzer, NextDose, Pendency, ReferenceTable, VaccineCatalog,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "child-health")]
#[command(version = "0.1.0")]
#[command(about = "Child growth analysis and vaccination schedule resolution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Reference date for ages (YYYY-MM-DD); defaults to the local date
    #[arg(long, global = true)]
    today: Option<String>,

    /// Analysis thresholds (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vaccine catalog (JSON array); defaults to the national schedule
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Growth reference points (JSON array); defaults to the built-in table
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Whole-month age for a birth date
    Age {
        /// Birth date (ISO-8601)
        birth: String,

        /// Date to compute the age on; defaults to --today
        #[arg(long)]
        on: Option<String>,
    },

    /// Analyze growth measurements, most recent first
    Growth {
        /// Child record file
        record: PathBuf,
    },

    /// Pending and next-due vaccine doses
    Schedule {
        /// Child record file
        record: PathBuf,
    },

    /// Full report: age, growth, schedule and coverage
    Report {
        /// Child record file
        record: PathBuf,
    },
}

#[derive(serde::Serialize)]
struct AgeResult {
    birth: String,
    on: NaiveDate,
    age_months: u32,
    age: AgeBreakdown,
}

#[derive(serde::Serialize)]
struct ScheduleResult<'a> {
    child_id: String,
    age_months: u32,
    pendencies: Vec<Pendency<'a>>,
    next_due: Vec<NextDose<'a>>,
    coverage: CoverageSummary,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("child_health_core=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let today = resolve_today(cli.today.as_deref())?;
    info!(%today, "resolved reference date");

    let result: serde_json::Value = match &cli.command {
        Commands::Age { birth, on } => {
            let on = match on {
                Some(date) => parse_date(date)?,
                None => today,
            };
            serde_json::to_value(age_result(birth, on)?)?
        }
        Commands::Growth { record } => {
            let record = ChildRecord::from_file(record)?;
            let analyzer = load_analyzer(&cli)?;
            serde_json::to_value(record.growth(&analyzer))?
        }
        Commands::Schedule { record } => {
            let record = ChildRecord::from_file(record)?;
            let catalog = load_catalog(&cli)?;
            let schedule = record.schedule(&catalog, today);
            let pendencies = schedule.pendencies();
            let next_due = schedule.next_due();
            serde_json::to_value(ScheduleResult {
                child_id: record.child_id.clone(),
                age_months: schedule.age_months(),
                coverage: schedule.coverage_of(&pendencies, &next_due),
                pendencies,
                next_due,
            })?
        }
        Commands::Report { record } => {
            let record = ChildRecord::from_file(record)?;
            let analyzer = load_analyzer(&cli)?;
            let catalog = load_catalog(&cli)?;
            serde_json::to_value(record.report(&catalog, &analyzer, today))?
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };

    match &cli.output {
        Some(path) => fs::write(path, rendered + "\n")?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", rendered)?;
        }
    }

    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate, ChildHealthError> {
    parse_iso_date(input).ok_or_else(|| ChildHealthError::InvalidDate(input.to_string()))
}

// Birth dates are checked here; the library treats a bad one as age 0
fn age_result(birth: &str, on: NaiveDate) -> Result<AgeResult, ChildHealthError> {
    let age_months = months_between_dates(parse_date(birth)?, on);
    Ok(AgeResult {
        birth: birth.to_string(),
        on,
        age_months,
        age: AgeBreakdown::from_months(age_months),
    })
}

// The only place the system clock is read
fn resolve_today(input: Option<&str>) -> Result<NaiveDate, ChildHealthError> {
    match input {
        Some(date) => parse_date(date),
        None => Ok(Local::now().date_naive()),
    }
}

fn load_analyzer(cli: &Cli) -> Result<GrowthAnalyzer, ChildHealthError> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };
    let table = match &cli.reference {
        Some(path) => ReferenceTable::from_file(path)?,
        None => ReferenceTable::default(),
    };
    GrowthAnalyzer::new(table, config)
}

fn load_catalog(cli: &Cli) -> Result<VaccineCatalog, ChildHealthError> {
    match &cli.catalog {
        Some(path) => VaccineCatalog::from_file(path),
        None => Ok(VaccineCatalog::national_schedule()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_result() {
        let result = age_result("2023-06-15", date(2024, 1, 10)).unwrap();
        assert_eq!(result.age_months, 6);
        assert_eq!(result.age, AgeBreakdown { years: 0, months: 6 });
    }

    #[test]
    fn test_age_rejects_unparseable_birth() {
        let err = age_result("bogus", date(2024, 1, 10)).map(|r| r.age_months);
        assert!(matches!(err, Err(ChildHealthError::InvalidDate(input)) if input == "bogus"));
    }

    #[test]
    fn test_resolve_today_explicit() {
        assert_eq!(resolve_today(Some("2024-02-29")).unwrap(), date(2024, 2, 29));
        assert!(resolve_today(Some("2024-02-30")).is_err());
    }
}
