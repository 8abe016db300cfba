use clap::{Args, Parser, Subcommand};
use infra_scorecard::config::{AppConfig, ScoringConfig};
use infra_scorecard::dataset;
use infra_scorecard::error::AppError;
use infra_scorecard::export;
use infra_scorecard::scoring::{self, AuthorityScorecard, ScoreInputs, ScoreRule};
use infra_scorecard::telemetry;
use infra_scorecard::worker::{
    BulkExceptions, BulkRow, ScoreEvent, ScoreMode, ScoreRequest, ScoringWorker,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "infra-scorecard",
    about = "Score infrastructure management compliance for local authorities",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one managing authority and write its exception sheets
    Single(SingleArgs),
    /// Score every authority in the roster, streaming partial results
    Bulk(BulkArgs),
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Management-plan submission dataset (CSV)
    #[arg(long)]
    plans: PathBuf,
    /// Directory of rule sheets, one CSV per authority
    #[arg(long)]
    rules: PathBuf,
    /// Facility performance dataset (CSV)
    #[arg(long)]
    facilities: PathBuf,
    /// Reserve-fund ordinance dataset (CSV)
    #[arg(long)]
    ordinances: PathBuf,
    /// Scoring payload (JSON: owner denylist, grade exclusions, roster, cutoff)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory to write exception CSVs into
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SingleArgs {
    #[command(flatten)]
    data: DatasetArgs,
    /// Managing authority to score
    #[arg(long)]
    authority: String,
    /// Keep privately-owned rows in scope
    #[arg(long)]
    include_private: bool,
    /// Score only one rule (plan, maintenance, ordinance)
    #[arg(long)]
    rule: Option<String>,
}

#[derive(Args, Debug)]
struct BulkArgs {
    #[command(flatten)]
    data: DatasetArgs,
    /// Score only these authorities instead of the configured roster
    #[arg(long)]
    authority: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let app_config = AppConfig::load()?;
    telemetry::init(&app_config.telemetry)?;
    let cli = Cli::parse();

    match cli.command {
        Command::Single(args) => run_single(args).await,
        Command::Bulk(args) => run_bulk(args).await,
    }
}

fn load_inputs(data: &DatasetArgs) -> Result<(ScoreInputs, ScoringConfig), AppError> {
    let config = match &data.config {
        Some(path) => ScoringConfig::from_json_file(path)?,
        None => ScoringConfig::default(),
    };

    info!("loading management plan submissions");
    let plans = dataset::load_plan_records(&data.plans)?;
    info!("loading rule workbook");
    let rule_book = dataset::load_rule_workbook(&data.rules)?;
    info!("loading facility performance records");
    let facilities = dataset::load_facility_records(&data.facilities)?;
    info!("loading ordinance records");
    let ordinances = dataset::load_ordinance_records(&data.ordinances)?;

    Ok((
        ScoreInputs {
            plans,
            rule_book,
            facilities,
            ordinances,
        },
        config,
    ))
}

async fn run_single(args: SingleArgs) -> Result<(), AppError> {
    let (inputs, config) = load_inputs(&args.data)?;
    let authority = args.authority.trim().to_string();

    if let Some(name) = &args.rule {
        let rule: ScoreRule = name.parse().map_err(AppError::Score)?;
        let outcome =
            scoring::score_rule(rule, &inputs, &config, &authority, !args.include_private)
                .map_err(AppError::Score)?;
        println!("== {authority}");
        println!(
            "{}: {:.2} / {:.0}",
            rule.label(),
            outcome.score(),
            rule.max_points()
        );
        for (label, count) in outcome.details() {
            println!("  {label}: {count}");
        }
        return Ok(());
    }

    let worker = ScoringWorker::spawn();
    let mut events = worker.submit(ScoreRequest {
        inputs,
        config,
        mode: ScoreMode::Single {
            authority,
            exclude_private: !args.include_private,
        },
    });

    while let Some(event) = events.recv().await {
        match event {
            ScoreEvent::Progress(message) => info!("{message}"),
            ScoreEvent::Done(card) => {
                print_scorecard(&card);
                if let Some(dir) = &args.data.out {
                    write_single_exceptions(dir, &card)?;
                }
            }
            ScoreEvent::Failed(message) => return Err(AppError::Run(message)),
            ScoreEvent::Partial(_) | ScoreEvent::BatchDone { .. } => {}
        }
    }
    Ok(())
}

async fn run_bulk(args: BulkArgs) -> Result<(), AppError> {
    let (inputs, config) = load_inputs(&args.data)?;
    let roster_override = if args.authority.is_empty() {
        None
    } else {
        Some(args.authority.clone())
    };

    let worker = ScoringWorker::spawn();
    let mut events = worker.submit(ScoreRequest {
        inputs,
        config,
        mode: ScoreMode::Bulk { roster_override },
    });

    while let Some(event) = events.recv().await {
        match event {
            ScoreEvent::Progress(message) => info!("{message}"),
            ScoreEvent::Partial(row) => {
                info!("{}: total {:.2}", row.authority, row.total);
            }
            ScoreEvent::BatchDone { rows, exceptions } => {
                print_bulk_table(&rows);
                if let Some(dir) = &args.data.out {
                    std::fs::create_dir_all(dir)?;
                    export::write_csv(dir.join("scores.csv"), &rows)?;
                    write_bulk_exceptions(dir, &exceptions)?;
                }
            }
            ScoreEvent::Failed(message) => return Err(AppError::Run(message)),
            ScoreEvent::Done(_) => {}
        }
    }
    Ok(())
}

fn print_scorecard(card: &AuthorityScorecard) {
    println!("== {}", card.authority);
    let lines = [
        (ScoreRule::PlanTimeliness, card.plan.score, card.plan.details()),
        (
            ScoreRule::Maintenance,
            card.maintenance.score,
            card.maintenance.details(),
        ),
        (
            ScoreRule::Ordinance,
            card.ordinance.score,
            card.ordinance.details(),
        ),
    ];
    for (rule, score, details) in lines {
        println!("{}: {:.2} / {:.0}", rule.label(), score, rule.max_points());
        for (label, count) in details {
            println!("  {label}: {count}");
        }
    }
    println!("total: {:.2} / 50", card.total());
}

fn print_bulk_table(rows: &[BulkRow]) {
    println!(
        "{:<28} {:>6} {:>12} {:>10} {:>7}",
        "authority", "plan", "maintenance", "ordinance", "total"
    );
    for row in rows {
        println!(
            "{:<28} {:>6.2} {:>12.2} {:>10.2} {:>7.2}",
            row.authority, row.plan, row.maintenance, row.ordinance, row.total
        );
    }
}

fn write_single_exceptions(dir: &Path, card: &AuthorityScorecard) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)?;
    for sheet in card.exception_sheets() {
        if sheet.rows.is_empty() {
            continue;
        }
        let path = export::write_exception_sheet(dir, &card.authority, &sheet)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn write_bulk_exceptions(dir: &Path, exceptions: &BulkExceptions) -> Result<(), AppError> {
    write_category(dir, scoring::CATEGORY_PLAN_MISSED, &exceptions.plan_missed)?;
    write_category(
        dir,
        scoring::CATEGORY_GROUP_INCLUDED,
        &exceptions.group_included,
    )?;
    write_category(
        dir,
        scoring::CATEGORY_GROUP_EXCLUDED,
        &exceptions.group_excluded,
    )?;
    write_category(dir, scoring::CATEGORY_GRADE_PASSED, &exceptions.grade_passed)?;
    write_category(dir, scoring::CATEGORY_GRADE_FAILED, &exceptions.grade_failed)?;
    Ok(())
}

fn write_category<T: Serialize>(
    dir: &Path,
    category: &str,
    per_authority: &BTreeMap<String, Vec<T>>,
) -> Result<(), AppError> {
    for (authority, rows) in per_authority {
        if rows.is_empty() {
            continue;
        }
        let path = dir.join(export::suggested_file_name(authority, category));
        export::write_csv(&path, rows)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
