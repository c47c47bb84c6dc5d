//! inpband: banded predefined fields for Abaqus input decks.
//!
//! Usage: `inpband <command> [OPTIONS]`, see `inpband --help`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use inpband::banding::field_profile::position_of;
use inpband::config::Settings;
use inpband::logging::init_logging;
use inpband::parser::abaqus::abaqus_inp::AbaqusInpParser;
use inpband::parser::abaqus::deck::InpDeck;
use inpband::parser::node_list::NodeListParser;
use inpband::pipeline::{run_batch, run_site, RunOptions};
use inpband::selection::{label_difference, nodes_within_sphere, restrict_to_labels};
use inpband::writer::inp_patch::PatchOutcome;
use inpband::writer::node_list::NodeListWriter;
use inpband::{FieldConvention, FieldTable, ParseError, PipelineError, Point, Site};

#[derive(Parser, Debug)]
#[command(name = "inpband")]
#[command(about = "Axial node bands and raised-cosine predefined fields for Abaqus .inp decks")]
struct Cli {
    /// Debug logging for this crate (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON settings file; command line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Band one compression site and write its node sets and fields into the deck
    Classify {
        /// Abaqus input deck to read nodes from and patch
        inp: PathBuf,

        /// Site center "x,y,z" (peak field value)
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        center: Point,

        /// Upper limit "x,y,z"
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        upper: Point,

        /// Lower limit "x,y,z"
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        lower: Point,

        #[command(flatten)]
        bands: BandArgs,

        #[command(flatten)]
        patch: PatchArgs,

        /// Classify and report without touching the deck
        #[arg(long)]
        dry_run: bool,

        /// Also export the banded nodes to this .vtu file
        #[arg(long)]
        vtu: Option<PathBuf>,
    },

    /// Band every site of a sites CSV table into the same deck
    Batch {
        inp: PathBuf,

        /// site_name,center_x,center_y,center_z,upper_x,...,lower_z (first line is a header)
        #[arg(long)]
        sites: PathBuf,

        #[command(flatten)]
        bands: BandArgs,

        #[command(flatten)]
        patch: PatchArgs,

        #[arg(long)]
        dry_run: bool,

        /// Directory receiving one <PREFIX>.vtu per site
        #[arg(long)]
        vtu_dir: Option<PathBuf>,
    },

    /// Print the field value of every band, mirrored around the center
    Profile {
        #[command(flatten)]
        bands: BandArgs,
    },

    /// Export labels of instance nodes within a sphere
    Sphere {
        inp: PathBuf,

        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        center: Point,

        #[arg(long)]
        radius: f64,

        #[arg(long)]
        instance: Option<String>,

        /// Only consider the nodes of this *Nset
        #[arg(long = "set")]
        set_name: Option<String>,

        #[arg(long)]
        out: PathBuf,
    },

    /// Export the labels of a node set defined in the deck
    ExportSet {
        inp: PathBuf,

        /// Name of the *Nset
        #[arg(long = "set")]
        set_name: String,

        /// Output file, defaults to <SET>_NodeList.txt
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Labels of list ALL that are not in list REMOVE
    ListDiff {
        all: PathBuf,
        remove: PathBuf,

        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct BandArgs {
    /// Number of bands on each side of the center
    #[arg(long)]
    num_bands: Option<usize>,

    /// Field value of the center band
    #[arg(long, allow_hyphen_values = true)]
    peak: Option<f64>,

    /// Field value the cosine falls to
    #[arg(long, allow_hyphen_values = true)]
    min: Option<f64>,

    /// Band position convention along the cosine
    #[arg(long, value_enum)]
    convention: Option<ConventionArg>,

    /// Decimal places of the field values
    #[arg(long)]
    precision: Option<u32>,
}

#[derive(Args, Debug, Default)]
struct PatchArgs {
    /// Part instance the node sets refer to
    #[arg(long)]
    instance: Option<String>,

    /// Node set prefix (single site runs)
    #[arg(long)]
    set_prefix: Option<String>,

    /// Amplitude named on the *Temperature keywords
    #[arg(long)]
    amplitude: Option<String>,

    /// Node labels per *Nset data line
    #[arg(long)]
    labels_per_line: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConventionArg {
    /// Last band reaches the minimum value (p = i / (n - 1))
    Linear,
    /// Minimum reached one virtual band past the edge (p = i / n)
    VirtualEdge,
}

impl From<ConventionArg> for FieldConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Linear => FieldConvention::Linear,
            ConventionArg::VirtualEdge => FieldConvention::VirtualEdge,
        }
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v.trim(), e)))
        .collect::<Result<_, _>>()?;
    match values.as_slice() {
        [x, y, z] => Ok(Point::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got {} values", values.len())),
    }
}

/// File settings (or defaults) with explicit flags applied on top
fn load_settings(config: Option<&Path>, bands: &BandArgs, patch: &PatchArgs) -> Result<Settings, PipelineError> {
    let mut settings = match config {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::default(),
    };

    if let Some(n) = bands.num_bands {
        settings.bands.num_bands = n;
    }
    if let Some(peak) = bands.peak {
        settings.bands.peak_value = peak;
    }
    if let Some(min) = bands.min {
        settings.bands.min_value = min;
    }
    if let Some(convention) = bands.convention {
        settings.bands.convention = convention.into();
    }
    if let Some(precision) = bands.precision {
        settings.bands.precision = precision;
    }
    if let Some(instance) = &patch.instance {
        settings.patch.instance = instance.clone();
    }
    if let Some(prefix) = &patch.set_prefix {
        settings.patch.set_prefix = prefix.clone();
    }
    if let Some(amplitude) = &patch.amplitude {
        settings.patch.amplitude = amplitude.clone();
    }
    if let Some(per_line) = patch.labels_per_line {
        settings.patch.labels_per_line = per_line;
    }

    settings.validate()?;
    Ok(settings)
}

fn run(cli: Cli) -> Result<ExitCode, PipelineError> {
    let config = cli.config.as_deref();

    match cli.command {
        Command::Classify { inp, center, upper, lower, bands, patch, dry_run, vtu } => {
            let settings = load_settings(config, &bands, &patch)?;
            let site = Site::new(settings.patch.set_prefix.clone(), center, upper, lower);
            let options = RunOptions { dry_run, vtu_output: vtu };

            let report = run_site(&inp, &site, &settings, &options)?;
            Ok(match report.outcome {
                Some(PatchOutcome::Written(patch_report)) if !patch_report.problems().is_empty() => ExitCode::from(2),
                _ => ExitCode::SUCCESS,
            })
        }

        Command::Batch { inp, sites, bands, patch, dry_run, vtu_dir } => {
            let settings = load_settings(config, &bands, &patch)?;
            let options = RunOptions { dry_run, vtu_output: vtu_dir };

            let batch = run_batch(&inp, &sites, &settings, &options)?;
            for warning in &batch.warnings {
                warn!("{}", warning);
            }
            for failure in &batch.failures {
                error!("site {} ('{}'): {}", failure.site_index, failure.site, failure.error);
            }
            for issue in &batch.patch_issues {
                warn!("site {} ('{}'): {}", issue.site_index, issue.site, issue.issue);
            }
            Ok(if batch.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }

        Command::Profile { bands } => {
            let settings = load_settings(config, &bands, &PatchArgs::default())?;
            let b = &settings.bands;
            let table = FieldTable::build(b.num_bands, b.peak_value, b.min_value, b.convention, b.precision)?;

            info!("field convention: {}", table.convention);
            println!("{:>6} {:>12} {:>12} {:>12}", "Band", "Position %", "Value", "Recovered %");
            for (band, position, value) in table.profile_rows() {
                let recovered = position_of(value, b.peak_value, b.min_value) * position.signum();
                println!(
                    "{:>6} {:>12.1} {:>12.*} {:>12.1}",
                    band + 1,
                    position * 100.0,
                    table.precision as usize,
                    value,
                    recovered * 100.0
                );
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Sphere { inp, center, radius, instance, set_name, out } => {
            let settings = load_settings(config, &BandArgs::default(), &PatchArgs::default())?;
            let instance = instance.unwrap_or(settings.patch.instance);

            let (deck, model) = AbaqusInpParser::parse_file(&inp)?;
            let mut cloud = AbaqusInpParser::instance_nodes(&model, &instance)?;
            if let Some(set_name) = &set_name {
                let labels = AbaqusInpParser::node_set_labels(&deck, set_name)?;
                cloud = restrict_to_labels(&cloud, &labels);
                info!("{} nodes of instance '{}' are in set '{}'", cloud.len(), instance, set_name);
            }
            let labels = nodes_within_sphere(&cloud, &center, radius);
            info!(
                "{} nodes within a sphere of radius {} at ({}, {}, {})",
                labels.len(),
                radius,
                center.x,
                center.y,
                center.z
            );
            NodeListWriter::write(&labels, &out)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::ExportSet { inp, set_name, out } => {
            let text = std::fs::read_to_string(&inp).map_err(ParseError::from)?;
            let deck = InpDeck::parse(&text);
            let labels = AbaqusInpParser::node_set_labels(&deck, &set_name)?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}_NodeList.txt", set_name)));
            NodeListWriter::write(&labels, &out)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::ListDiff { all, remove, out } => {
            let all = NodeListParser::parse_file(&all)?;
            let remove = NodeListParser::parse_file(&remove)?;
            let remaining = label_difference(&all, &remove);
            info!("{} of {} labels are not in the second list", remaining.len(), all.len());
            NodeListWriter::write(&remaining, &out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
