use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Weekday;
use clap::{Args, Parser, Subcommand, ValueEnum};
use seat_advisor::{
    recommend, report, AdvisorQuery, Campus, PriorTables, TelemetryTable, TimeOfDay,
    WeightVector,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seat-advisor")]
#[command(about = "Find a study seat that is likely free and pleasant", long_about = None)]
struct Cli {
    /// Occupancy telemetry CSV (optionally gzip-compressed)
    #[arg(
        long,
        global = true,
        env = "SEAT_ADVISOR_DATA",
        default_value = "input/final_data.csv.gz"
    )]
    data: PathBuf,
    /// Static location attributes CSV
    #[arg(
        long,
        global = true,
        env = "SEAT_ADVISOR_PRIORS",
        default_value = "input/priors.csv"
    )]
    priors: PathBuf,
    /// Score without the priors table (neutral prior, no accessibility data)
    #[arg(long, global = true)]
    no_priors: bool,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank study locations for the given constraints
    Recommend {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write a markdown report of the ranking
    Report {
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Show how the prior sliders normalise
    Weights {
        #[command(flatten)]
        weights: WeightArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
struct WeightArgs {
    #[arg(long, default_value_t = 0.25)]
    w_reach: f64,
    #[arg(long, default_value_t = 0.25)]
    w_air: f64,
    #[arg(long, default_value_t = 0.25)]
    w_light: f64,
    #[arg(long, default_value_t = 0.25)]
    w_outlet: f64,
}

impl WeightArgs {
    fn raw(&self) -> [f64; 4] {
        [self.w_reach, self.w_air, self.w_light, self.w_outlet]
    }
}

#[derive(Args)]
struct QueryArgs {
    /// Campus to include (valley or hill); repeat for both, default both
    #[arg(long = "campus")]
    campuses: Vec<Campus>,
    /// Only observations on this weekday (monday..sunday)
    #[arg(long)]
    weekday: Option<Weekday>,
    /// Only observations in this part of the day
    #[arg(long)]
    time_of_day: Option<TimeOfDay>,
    /// Use exam-period weeks (default)
    #[arg(long, overrides_with = "no_exam_period")]
    exam_period: bool,
    /// Use regular-term weeks instead of the exam period
    #[arg(long)]
    no_exam_period: bool,
    /// Relative availability at or below which a slot counts as crowded
    #[arg(long, default_value_t = 0.15)]
    threshold: f64,
    /// Campus you are currently on
    #[arg(long, default_value = "valley")]
    home: Campus,
    /// Do not penalise locations on the other campus
    #[arg(long)]
    ignore_distance: bool,
    /// Only wheelchair accessible locations
    #[arg(long)]
    require_accessible: bool,
    #[arg(long, default_value_t = 5)]
    top: usize,
    #[arg(long, default_value_t = 200)]
    min_obs: usize,
    #[command(flatten)]
    weights: WeightArgs,
}

impl QueryArgs {
    fn into_query(self) -> AdvisorQuery {
        let campuses = if self.campuses.is_empty() {
            BTreeSet::from([Campus::Valley, Campus::Hill])
        } else {
            self.campuses.into_iter().collect()
        };
        AdvisorQuery {
            campuses: Some(campuses),
            weekday: self.weekday,
            time_of_day: self.time_of_day,
            exam_period: self.exam_period || !self.no_exam_period,
            availability_threshold: self.threshold,
            home_campus: (!self.ignore_distance).then_some(self.home),
            require_accessible: self.require_accessible,
            top_n: Some(self.top),
            min_observations: self.min_obs,
            prior_weights: self.weights.raw(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Commands::Weights { weights } => {
            let [reach, air, light, outlet] = weights.raw();
            let normalized = WeightVector::normalize(reach, air, light, outlet);
            println!("Normalized: {normalized}");
        }
        Commands::Recommend { query, format } => {
            let query = query.into_query();
            let priors = load_priors(&cli.priors, cli.no_priors)?;
            let rows = run(&cli.data, &query, priors.as_ref())?;

            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&rows)
                        .context("failed to serialise recommendations")?;
                    println!("{json}");
                }
                OutputFormat::Table => {
                    println!("Prior weights: {}", query.weights());
                    print!("{}", report::render_table(&rows));
                }
            }
        }
        Commands::Report { query, out } => {
            let query = query.into_query();
            let priors = load_priors(&cli.priors, cli.no_priors)?;
            let rows = run(&cli.data, &query, priors.as_ref())?;
            let markdown = report::build_report(&query, &rows);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_priors(path: &Path, disabled: bool) -> anyhow::Result<Option<PriorTables>> {
    if disabled {
        debug!("priors disabled, using the neutral prior");
        return Ok(None);
    }
    let tables = seat_advisor::load_priors(path)
        .with_context(|| format!("failed to load priors from {}", path.display()))?;
    Ok(Some(tables))
}

fn run(
    data: &Path,
    query: &AdvisorQuery,
    priors: Option<&PriorTables>,
) -> anyhow::Result<Vec<seat_advisor::RecommendationRow>> {
    let table = TelemetryTable::load(data)
        .with_context(|| format!("failed to load telemetry from {}", data.display()))?;
    let rows = recommend(
        &table,
        query,
        priors.map(|tables| &tables.profiles),
        priors.map(|tables| &tables.accessibility),
    )
    .context("failed to rank study locations")?;
    info!(results = rows.len(), "recommendation finished");
    Ok(rows)
}
