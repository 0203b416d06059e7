use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fastrace::collector::SpanContext;
use fastrace::Span;
use geobridge_common::config::AppConfig;
use geobridge_common::datasource::{Datasource, Parameters, Query};
use geobridge_common::geometry::{Box2d, Coord2d};
use geobridge_python::{gil_stats, PyDatasourceObject, PythonDatasource};
use geobridge_telemetry::telemetry::{init_telemetry, shutdown_telemetry};
use log::{debug, info};

use crate::output::{write_description, write_envelope, write_features};
use crate::python::{load_datasource, SourceLocation};

#[derive(Parser, Debug)]
#[command(version, name = "geobridge", about = "Run map datasource operations against a Python object")]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Python file that defines the datasource factory.
    #[arg(long, conflicts_with = "module", required_unless_present = "module")]
    script: Option<PathBuf>,
    /// Importable Python module that defines the datasource factory.
    #[arg(long)]
    module: Option<String>,
    /// Callable in the script or module that returns the datasource object.
    #[arg(long, alias = "class", default_value = "datasource")]
    factory: String,
    /// Extra datasource parameter as `key=value`. May be repeated.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl SourceArgs {
    fn location(&self) -> Result<SourceLocation, Box<dyn Error>> {
        match (&self.script, &self.module) {
            (Some(path), None) => Ok(SourceLocation::Script(path.clone())),
            (None, Some(name)) => Ok(SourceLocation::Module(name.clone())),
            _ => Err("exactly one of --script or --module is required".into()),
        }
    }

    fn parameters(&self) -> Parameters {
        self.params.iter().cloned().collect()
    }
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the layer descriptor, parameters, and classification.
    Describe,
    /// Print the datasource extent.
    Envelope,
    /// Print the features intersecting a bounding box.
    Query {
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Box2d,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the features near a point.
    Point {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        tolerance: f64,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn parse_bbox(value: &str) -> Result<Box2d, String> {
    let bounds = value
        .split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|e| format!("{s:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match bounds.as_slice() {
        [minx, miny, maxx, maxy] => Ok(Box2d::new(*minx, *miny, *maxx, *maxy)),
        _ => Err(format!("expected minx,miny,maxx,maxy but got {} values", bounds.len())),
    }
}

fn parse_param(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value but got {value:?}")),
    }
}

pub fn main(args: Vec<String>) -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse_from(args);
    let config = AppConfig::load()?;
    init_telemetry(&config.telemetry)?;
    let result = {
        let root = Span::root("geobridge", SpanContext::random());
        let _guard = root.set_local_parent();
        run(cli, &config)
    };
    let stats = gil_stats();
    debug!(
        "GIL acquired {} times, waited {:?}, held {:?}",
        stats.acquisitions, stats.wait, stats.hold
    );
    shutdown_telemetry();
    result
}

fn run(cli: Cli, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let location = cli.source.location()?;
    info!("loading datasource from {location:?}");
    let object = load_datasource(&location, &cli.source.factory)?;
    let datasource = PythonDatasource::with_parameters(
        PyDatasourceObject::with_config(object, config.python.clone()),
        cli.source.parameters(),
    );
    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Describe => write_description(&mut out, &datasource)?,
        Command::Envelope => write_envelope(&mut out, &datasource)?,
        Command::Query { bbox, limit } => {
            let featureset = datasource.features(&Query::new(bbox))?;
            let count = write_features(&mut out, featureset, limit)?;
            info!("query returned {count} features");
        }
        Command::Point {
            x,
            y,
            tolerance,
            limit,
        } => {
            let featureset = datasource.features_at_point(Coord2d::new(x, y), tolerance)?;
            let count = write_features(&mut out, featureset, limit)?;
            info!("point query returned {count} features");
        }
    }
    Ok(())
}
