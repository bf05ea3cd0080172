use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use population_forecaster::{
    analysis::{
        CohortAggregator, GrowthMethod, GrowthRateEstimator, HistoricalSeriesProvider,
        NegativeValuePolicy, PopulationAggregator, TimeSpec,
    },
    config::ForecastConfig,
    io::{self, CensusDataset, CsvFormat, JsonFormat, ProjectionWriter},
    models::{LocationFilter, LocationRequest, LocationScope, VitalRates},
    visualization::{
        print_cohort_pyramid, print_cohort_table, print_growth_rates_table,
        print_location_table, print_projection_table, print_vital_table,
    },
};

#[derive(Parser)]
#[command(
    name = "pop-forecast",
    about = "Population Forecaster - census-driven population projections and cohort summaries",
    version,
    author
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset: a directory of CSV tables or a .json file (overrides the config)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScopeArgs {
    /// Village codes, comma separated
    #[arg(long, value_delimiter = ',')]
    villages: Vec<u32>,

    /// Subdistrict codes, comma separated (used when no villages are given)
    #[arg(long, value_delimiter = ',')]
    subdistricts: Vec<u32>,
}

#[derive(Args)]
struct YearArgs {
    /// Single target year
    #[arg(short, long)]
    year: Option<i32>,

    /// First year of a range
    #[arg(long)]
    start_year: Option<i32>,

    /// Last year of a range (inclusive)
    #[arg(long)]
    end_year: Option<i32>,
}

impl YearArgs {
    fn time_spec(&self, config: &ForecastConfig) -> Result<TimeSpec> {
        Ok(TimeSpec::from_parts_within(
            self.year,
            self.start_year,
            self.end_year,
            config.projection.max_range_years,
        )?)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Write results to this file instead of stdout (json or csv only)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project population with the arithmetic, geometric, incremental and exponential methods
    Project {
        #[command(flatten)]
        scope: ScopeArgs,

        #[command(flatten)]
        years: YearArgs,

        /// Methods to run, comma separated (default: from config)
        #[arg(short, long, value_delimiter = ',')]
        methods: Vec<GrowthMethod>,

        /// Floor negative projections at zero
        #[arg(long)]
        clamp: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Project population by compounding birth, death and migration rates
    Demographic {
        #[command(flatten)]
        scope: ScopeArgs,

        #[command(flatten)]
        years: YearArgs,

        /// Births per 10 000 people per year
        #[arg(long)]
        birth: f64,

        /// Deaths per 10 000 people per year
        #[arg(long)]
        death: f64,

        /// Emigrants per 10 000 people per year
        #[arg(long, default_value = "0")]
        emigration: f64,

        /// Immigrants per 10 000 people per year
        #[arg(long, default_value = "0")]
        immigration: f64,

        /// Floor negative projections at zero
        #[arg(long)]
        clamp: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Summarise age/gender cohorts for a location
    Cohort {
        #[arg(long)]
        state: Option<u32>,

        #[arg(long)]
        district: Option<u32>,

        #[arg(long)]
        subdistrict: Option<u32>,

        /// Village codes, comma separated
        #[arg(long, value_delimiter = ',')]
        villages: Vec<u32>,

        #[command(flatten)]
        years: YearArgs,

        /// Also draw a population pyramid per year
        #[arg(long)]
        pyramid: bool,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Show the growth parameters fitted to a subdistrict's census series
    Rates {
        /// Subdistrict code
        subdistrict: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List states, or the districts/subdistricts/villages under them
    Locations {
        /// List districts of this state
        #[arg(long)]
        state: Option<u32>,

        /// List subdistricts of these districts
        #[arg(long, value_delimiter = ',')]
        districts: Vec<u32>,

        /// List villages of these subdistricts
        #[arg(long, value_delimiter = ',')]
        subdistricts: Vec<u32>,
    },

    /// Start the web API server
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind (overrides the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ForecastConfig> {
    match path {
        Some(p) => ForecastConfig::load(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(ForecastConfig::default()),
    }
}

fn load_dataset(cli_path: Option<&Path>, config: &ForecastConfig) -> Result<CensusDataset> {
    let path = cli_path
        .or(config.data.path.as_deref())
        .context("No dataset given: pass --data or set [data] path in the config")?;
    io::read_dataset(path).with_context(|| format!("Failed to load dataset {}", path.display()))
}

fn resolve_scope(dataset: &CensusDataset, scope: &ScopeArgs) -> Result<LocationScope> {
    let request = LocationRequest {
        villages: dataset.village_selections(&scope.villages)?,
        subdistricts: dataset.subdistrict_selections(&scope.subdistricts),
    };
    Ok(LocationScope::resolve(&request, dataset)?)
}

fn policy(clamp: bool, config: &ForecastConfig) -> NegativeValuePolicy {
    if clamp {
        NegativeValuePolicy::ClampToZero
    } else {
        config.projection.negative_values
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Project {
            scope,
            years,
            methods,
            clamp,
            out,
        } => {
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            let time = years.time_spec(&config)?;
            let scope = resolve_scope(&dataset, &scope)?;
            let methods = if methods.is_empty() {
                config.projection.methods.clone()
            } else {
                methods
            };

            let projection = PopulationAggregator::new(&dataset)
                .with_policy(policy(clamp, &config))
                .aggregate(&scope, &time, &methods)?;

            match (out.format, &out.output) {
                (OutputFormat::Table, None) => print_projection_table(&projection),
                (OutputFormat::Table, Some(_)) => {
                    anyhow::bail!("--output needs --format json or --format csv")
                }
                (OutputFormat::Json, None) => print_json(&projection)?,
                (OutputFormat::Csv, None) => io::write_series_csv(
                    &io::projection_columns(&projection),
                    std::io::stdout().lock(),
                )?,
                (OutputFormat::Json, Some(path)) => {
                    JsonFormat { pretty: true }.write_projection(&projection, path)?;
                    saved(path);
                }
                (OutputFormat::Csv, Some(path)) => {
                    CsvFormat.write_projection(&projection, path)?;
                    saved(path);
                }
            }
        }

        Commands::Demographic {
            scope,
            years,
            birth,
            death,
            emigration,
            immigration,
            clamp,
            out,
        } => {
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            let time = years.time_spec(&config)?;
            let scope = resolve_scope(&dataset, &scope)?;
            let rates = VitalRates::from_per_ten_thousand(birth, death, emigration, immigration);

            let projection = PopulationAggregator::new(&dataset)
                .with_policy(policy(clamp, &config))
                .aggregate_vital(&scope, &time, &rates);

            match (out.format, &out.output) {
                (OutputFormat::Table, None) => print_vital_table(&projection),
                (OutputFormat::Table, Some(_)) => {
                    anyhow::bail!("--output needs --format json or --format csv")
                }
                (OutputFormat::Json, None) => print_json(&projection)?,
                (OutputFormat::Csv, None) => io::write_series_csv(
                    &io::vital_columns(&projection),
                    std::io::stdout().lock(),
                )?,
                (OutputFormat::Json, Some(path)) => {
                    JsonFormat { pretty: true }.write_vital(&projection, path)?;
                    saved(path);
                }
                (OutputFormat::Csv, Some(path)) => {
                    CsvFormat.write_vital(&projection, path)?;
                    saved(path);
                }
            }
        }

        Commands::Cohort {
            state,
            district,
            subdistrict,
            villages,
            years,
            pyramid,
            out,
        } => {
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            let time = years.time_spec(&config)?;
            let filter = LocationFilter {
                state,
                district,
                subdistrict,
                villages,
            };
            let records = dataset.cohort_records(&filter, &time)?;
            let summaries = CohortAggregator::summarize(&records, &time)?;

            match (out.format, &out.output) {
                (OutputFormat::Table, None) => {
                    if summaries.is_empty() {
                        println!("  No cohort data in the requested years.");
                    }
                    for summary in &summaries {
                        print_cohort_table(summary);
                        if pyramid {
                            print_cohort_pyramid(summary);
                        }
                    }
                }
                (OutputFormat::Table, Some(_)) => {
                    anyhow::bail!("--output needs --format json or --format csv")
                }
                (OutputFormat::Json, None) => match (time.is_single(), summaries.first()) {
                    (true, Some(summary)) => print_json(summary)?,
                    _ => print_json(&summaries)?,
                },
                (OutputFormat::Csv, None) => {
                    io::write_cohort_csv(&summaries, std::io::stdout().lock())?
                }
                (OutputFormat::Json, Some(path)) => {
                    io::write_json_value(&summaries, path, true)?;
                    saved(path);
                }
                (OutputFormat::Csv, Some(path)) => {
                    io::write_cohort_csv(&summaries, std::fs::File::create(path)?)?;
                    saved(path);
                }
            }
        }

        Commands::Rates { subdistrict, json } => {
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            let series = dataset.historical_series(subdistrict)?;
            let rates = GrowthRateEstimator::estimate_all(&series)?;
            if json {
                print_json(&rates)?;
            } else {
                print_growth_rates_table(&rates);
            }
        }

        Commands::Locations {
            state,
            districts,
            subdistricts,
        } => {
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            if !subdistricts.is_empty() {
                let rows: Vec<(u32, &str)> = dataset
                    .villages(&subdistricts)
                    .into_iter()
                    .map(|v| (v.village_code, v.village_name.as_str()))
                    .collect();
                print_location_table("Villages", &rows);
            } else if !districts.is_empty() {
                let rows: Vec<(u32, &str)> = dataset
                    .subdistricts(&districts)
                    .into_iter()
                    .map(|s| (s.subdistrict_code, s.subdistrict_name.as_str()))
                    .collect();
                print_location_table("Subdistricts", &rows);
            } else if let Some(state) = state {
                let rows: Vec<(u32, &str)> = dataset
                    .districts(state)
                    .into_iter()
                    .map(|d| (d.district_code, d.district_name.as_str()))
                    .collect();
                print_location_table("Districts", &rows);
            } else {
                let rows: Vec<(u32, &str)> = dataset
                    .states()
                    .into_iter()
                    .map(|s| (s.state_code, s.state_name.as_str()))
                    .collect();
                print_location_table("States", &rows);
            }
        }

        #[cfg(feature = "web")]
        Commands::Serve { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let dataset = load_dataset(cli.data.as_deref(), &config)?;
            let state = population_forecaster::web::AppState::new(dataset, config);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(population_forecaster::web::start_server(state))?;
        }
    }

    Ok(())
}

fn saved(path: &Path) {
    println!("{} Wrote {}", "Success:".green().bold(), path.display());
}
