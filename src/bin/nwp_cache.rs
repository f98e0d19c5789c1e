use std::process::ExitCode;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use regex::Regex;
use tracing_subscriber::EnvFilter;

use nwp_cache::app::App;
use nwp_cache::catalog;
use nwp_cache::config::ConfigLoader;
use nwp_cache::cycle;
use nwp_cache::domain::{Descriptor, ModelKind};
use nwp_cache::error::NwpError;
use nwp_cache::output::JsonOutput;
use nwp_cache::transport::HttpTransport;

#[derive(Parser)]
#[command(name = "nwp-cache")]
#[command(about = "Fetch, subset and cache RAP/GFS/HRRR GRIB2 output")]
#[command(version)]
struct Cli {
    /// Path to a JSON config file (defaults to ./nwp-cache.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Download a full file unless it is already cached")]
    Fetch(DescriptorArgs),
    #[command(about = "Print the parsed index of a file")]
    Bands {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        /// Only bands whose `:variable:level:forecast:` key matches this regex
        #[arg(long)]
        search: Option<String>,
    },
    #[command(about = "Download selected bands into a single file")]
    Subset {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        /// Index line numbers, written in the order given
        #[arg(long = "band")]
        bands: Vec<u32>,
        /// Select every band whose `:variable:level:forecast:` key matches this regex
        #[arg(long, conflicts_with = "bands")]
        search: Option<String>,
        #[arg(long)]
        output: Option<Utf8PathBuf>,
    },
    #[command(about = "List cached files")]
    List { model: Option<ModelKind> },
    #[command(about = "Remove one cached file")]
    Remove {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        #[arg(long)]
        subset: bool,
    },
    #[command(about = "Empty the cache for one model, or everything")]
    Clear { model: Option<ModelKind> },
    #[command(about = "Show valid field values and grid spacing for a model")]
    Describe { model: ModelKind },
    #[command(about = "Show the descriptor after advancing publication cycles")]
    Next {
        #[command(flatten)]
        descriptor: DescriptorArgs,
        #[arg(long, default_value_t = 1)]
        steps: usize,
    },
}

#[derive(Args, Clone)]
struct DescriptorArgs {
    model: ModelKind,
    /// YYYYMMDD or YYYY-MM-DD (defaults to today, UTC)
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    cycle: Option<String>,
    #[arg(long)]
    grid: Option<String>,
    #[arg(long)]
    product: Option<String>,
    #[arg(long)]
    resolution: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    forecast: Option<String>,
}

impl DescriptorArgs {
    fn build(&self) -> Result<Descriptor, NwpError> {
        let mut descriptor = Descriptor::default_for(self.model);
        let date = self.date.as_deref().map(parse_date).transpose()?;
        let unsupported = |field: &'static str, value: &Option<String>| match value {
            Some(value) => Err(NwpError::InvalidField {
                field,
                value: format!("{value} (not a {} field)", self.model),
            }),
            None => Ok(()),
        };

        match &mut descriptor {
            Descriptor::Rap(d) => {
                unsupported("product", &self.product)?;
                unsupported("resolution", &self.resolution)?;
                unsupported("region", &self.region)?;
                override_with(&mut d.cycle, &self.cycle);
                override_with(&mut d.grid, &self.grid);
                override_with(&mut d.forecast, &self.forecast);
                if let Some(date) = date {
                    d.date = date;
                }
            }
            Descriptor::Gfs(d) => {
                unsupported("grid", &self.grid)?;
                unsupported("region", &self.region)?;
                override_with(&mut d.cycle, &self.cycle);
                override_with(&mut d.product, &self.product);
                override_with(&mut d.resolution, &self.resolution);
                override_with(&mut d.forecast, &self.forecast);
                if let Some(date) = date {
                    d.date = date;
                }
            }
            Descriptor::Hrrr(d) => {
                unsupported("grid", &self.grid)?;
                unsupported("resolution", &self.resolution)?;
                if let Some(cycle) = &self.cycle {
                    d.cycle = cycle.parse().map_err(|_| NwpError::InvalidField {
                        field: "cycle",
                        value: cycle.clone(),
                    })?;
                }
                override_with(&mut d.region, &self.region);
                override_with(&mut d.product, &self.product);
                override_with(&mut d.forecast, &self.forecast);
                if let Some(date) = date {
                    d.date = date;
                }
            }
        }

        for (field, value) in catalog::validate(&descriptor) {
            tracing::warn!(field, value = %value, "value outside the documented domain");
        }
        Ok(descriptor)
    }
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, NwpError> {
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| NwpError::InvalidField {
            field: "date",
            value: value.to_string(),
        })
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<NwpError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &NwpError) -> u8 {
    match error {
        NwpError::BandNotFound(_) | NwpError::EmptySelection => 2,
        NwpError::Transfer(_) | NwpError::TransferStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let transport = HttpTransport::new(config.timeout)?;
    let app = App::from_config(&config, transport);

    match cli.command {
        Command::Fetch(args) => {
            let result = app.fetch(&args.build()?)?;
            JsonOutput::print_fetch(&result).into_diagnostic()
        }
        Command::Bands { descriptor, search } => {
            let descriptor = descriptor.build()?;
            let bands = match search {
                Some(pattern) => app.search(&descriptor, &compile(&pattern)?)?,
                None => app.bands(&descriptor)?,
            };
            JsonOutput::print_bands(&bands).into_diagnostic()
        }
        Command::Subset {
            descriptor,
            bands,
            search,
            output,
        } => {
            let descriptor = descriptor.build()?;
            let result = match search {
                Some(pattern) => {
                    app.subset_matching(&descriptor, &compile(&pattern)?, output.as_deref())?
                }
                None => app.subset_lines(&descriptor, &bands, output.as_deref())?,
            };
            JsonOutput::print_subset(&result).into_diagnostic()
        }
        Command::List { model } => {
            let listing = app.list(model)?;
            JsonOutput::print_list(&listing).into_diagnostic()
        }
        Command::Remove { descriptor, subset } => {
            let result = app.remove(&descriptor.build()?, subset)?;
            JsonOutput::print_remove(&result).into_diagnostic()
        }
        Command::Clear { model } => {
            let result = app.clear(model)?;
            JsonOutput::print_clear(&result).into_diagnostic()
        }
        Command::Describe { model } => {
            JsonOutput::print_catalog(catalog::describe(model)).into_diagnostic()
        }
        Command::Next { descriptor, steps } => {
            let next = cycle::advance(&descriptor.build()?, steps)?;
            JsonOutput::print_descriptor(&next).into_diagnostic()
        }
    }
}

fn compile(pattern: &str) -> miette::Result<Regex> {
    Regex::new(pattern)
        .map_err(|err| miette::Report::msg(format!("invalid search pattern: {err}")))
}
