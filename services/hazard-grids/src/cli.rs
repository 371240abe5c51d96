//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use hazard_common::BoundingBox;

use crate::config::{Domain, HazardConfig};
use crate::workflow::DiagramFormat;

#[derive(Parser, Debug)]
#[command(name = "hazard-grids")]
#[command(about = "Hazard grids (event maxima, rolling totals, neighbourhood maxima) from gridded model output")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand. Unset options keep the value from
/// the configuration file or environment.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// YAML configuration file
    #[arg(long, global = true, env = "HAZARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Input directory template, e.g. /data/BARRA_{domain}/{version}/{variable}/{yyyy}/{mm}/
    #[arg(long, global = true)]
    pub directory_mask: Option<String>,

    /// Input file name template
    #[arg(short = 'f', long, global = true)]
    pub filename_mask: Option<String>,

    /// Model domain: AD, PH, SY, TA or R
    #[arg(short = 'd', long, global = true)]
    pub domain: Option<Domain>,

    /// Start date YYYYMMDDHH
    #[arg(short = 's', long, global = true)]
    pub start_date: Option<String>,

    /// End date YYYYMMDDHH
    #[arg(short = 'e', long, global = true)]
    pub end_date: Option<String>,

    /// Version of the data to use
    #[arg(short = 'v', long = "version", global = true)]
    pub data_version: Option<String>,

    /// Output directory
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Scan this directory for input files instead of expanding the templates
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Latitude/longitude constraint: west,south,east,north
    #[arg(long, global = true, value_parser = parse_bbox)]
    pub bbox: Option<BoundingBox>,

    /// Neighbourhood radius in degrees
    #[arg(long, global = true)]
    pub radius: Option<f64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Daily and event maxima of 10 m wind speed and gust
    Wind {
        /// Drop this many leading steps from each file
        #[arg(long)]
        skip_leading: Option<usize>,

        /// Do not compute the neighbourhood maximum gust
        #[arg(long)]
        no_neighbourhood: bool,
    },

    /// Rain hazard grids (PIRR, PTEA, P1RR, P6RR, N1RR) from accumulations
    Rain {
        /// Accumulation variable name
        #[arg(long)]
        variable: Option<String>,

        /// Start of the PTEA window, YYYYMMDDHH
        #[arg(long, requires = "event_end")]
        event_start: Option<String>,

        /// End of the PTEA window, YYYYMMDDHH
        #[arg(long, requires = "event_start")]
        event_end: Option<String>,
    },

    /// Operational hazard grids (PGWS, PSMW, PSWG, NSWG) from one forecast
    Forecast {
        /// Single-level forecast file
        #[arg(long)]
        surface_file: Option<PathBuf>,

        /// Pressure-level forecast file
        #[arg(long)]
        pressure_file: Option<PathBuf>,

        /// Pressure level of the gradient wind
        #[arg(long)]
        level: Option<f64>,

        /// Output file name prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Write the impact-forecasting workflow diagram as Graphviz DOT
    Workflow {
        /// Output DOT file (default: stdout, or impact_workflow.gv when rendering)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also render the diagram with Graphviz `dot`
        #[arg(long, value_enum, default_value_t = DiagramFormat::Dot)]
        format: DiagramFormat,

        /// Hazard variable extracted from the model data
        #[arg(long, default_value = "wndgust10m")]
        variable: String,
    },
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    BoundingBox::parse(s).map_err(|e| e.to_string())
}

impl Cli {
    /// Apply the flags that were given on top of `config`.
    pub fn apply_overrides(&self, config: &mut HazardConfig) {
        let common = &self.common;

        if let Some(mask) = &common.directory_mask {
            config.directory_mask = mask.clone();
        }
        if let Some(mask) = &common.filename_mask {
            config.filename_mask = mask.clone();
        }
        if let Some(domain) = common.domain {
            config.domain = domain;
        }
        if let Some(date) = &common.start_date {
            config.start_date = date.clone();
        }
        if let Some(date) = &common.end_date {
            config.end_date = date.clone();
        }
        if let Some(version) = &common.data_version {
            config.version = version.clone();
        }
        if let Some(dir) = &common.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &common.input_dir {
            config.input_dir = Some(dir.clone());
        }
        if let Some(bbox) = common.bbox {
            config.bbox = Some(bbox);
        }
        if let Some(radius) = common.radius {
            config.processor.neighbourhood_radius_deg = radius;
        }

        match &self.command {
            Command::Wind {
                skip_leading,
                no_neighbourhood,
            } => {
                if let Some(n) = skip_leading {
                    config.wind.skip_leading = *n;
                }
                if *no_neighbourhood {
                    config.wind.neighbourhood = false;
                }
            }
            Command::Rain {
                variable,
                event_start,
                event_end,
            } => {
                if let Some(variable) = variable {
                    config.rain.variable = variable.clone();
                }
                if let (Some(start), Some(end)) = (event_start, event_end) {
                    config.rain.event_start = Some(start.clone());
                    config.rain.event_end = Some(end.clone());
                }
            }
            Command::Forecast {
                surface_file,
                pressure_file,
                level,
                prefix,
            } => {
                if let Some(path) = surface_file {
                    config.forecast.surface_file = Some(path.clone());
                }
                if let Some(path) = pressure_file {
                    config.forecast.pressure_file = Some(path.clone());
                }
                if let Some(level) = level {
                    config.forecast.level = *level;
                }
                if let Some(prefix) = prefix {
                    config.forecast.output_prefix = prefix.clone();
                }
            }
            Command::Workflow { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_common_flags_override_config() {
        let cli = parse(&[
            "hazard-grids",
            "wind",
            "-d",
            "TA",
            "-s",
            "2015042000",
            "--version",
            "v2",
            "--bbox",
            "150.5,-34,153,-31.5",
            "--radius",
            "0.5",
            "--skip-leading",
            "1",
            "--no-neighbourhood",
        ]);
        let mut config = HazardConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.domain, Domain::Tasmania);
        assert_eq!(config.start_date, "2015042000");
        assert_eq!(config.end_date, "2015042218");
        assert_eq!(config.version, "v2");
        assert_eq!(config.bbox, Some(test_utils::sydney_bbox()));
        assert_eq!(config.processor.neighbourhood_radius_deg, 0.5);
        assert_eq!(config.wind.skip_leading, 1);
        assert!(!config.wind.neighbourhood);
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let cli = parse(&["hazard-grids", "rain"]);
        let mut config = HazardConfig::default();
        config.version = "from-yaml".to_string();
        cli.apply_overrides(&mut config);
        assert_eq!(config.version, "from-yaml");
        assert_eq!(config.rain.variable, "accum_prcp");
    }

    #[test]
    fn test_rain_event_window_needs_both_ends() {
        assert!(Cli::try_parse_from(["hazard-grids", "rain", "--event-start", "2015041923"]).is_err());

        let cli = parse(&[
            "hazard-grids",
            "rain",
            "--event-start",
            "2015041923",
            "--event-end",
            "2015042123",
        ]);
        let mut config = HazardConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.rain_event_window().unwrap().is_some());
    }

    #[test]
    fn test_rejects_bad_domain_and_bbox() {
        assert!(Cli::try_parse_from(["hazard-grids", "wind", "-d", "XX"]).is_err());
        assert!(Cli::try_parse_from(["hazard-grids", "wind", "--bbox", "1,2,3"]).is_err());
    }

    #[test]
    fn test_workflow_format() {
        let cli = parse(&["hazard-grids", "workflow", "--format", "svg"]);
        let Command::Workflow { output, format, variable } = cli.command else {
            panic!("expected the workflow subcommand");
        };
        assert_eq!(output, None);
        assert_eq!(format, DiagramFormat::Svg);
        assert_eq!(variable, "wndgust10m");

        let cli = parse(&["hazard-grids", "workflow"]);
        assert!(matches!(cli.command, Command::Workflow { format: DiagramFormat::Dot, .. }));
        assert!(Cli::try_parse_from(["hazard-grids", "workflow", "--format", "pdf"]).is_err());
    }

    #[test]
    fn test_forecast_flags() {
        let cli = parse(&[
            "hazard-grids",
            "forecast",
            "--surface-file",
            "fc_slvl.nc",
            "--pressure-file",
            "fc_plvl.nc",
            "--level",
            "850",
        ]);
        let mut config = HazardConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.forecast.surface_file, Some(PathBuf::from("fc_slvl.nc")));
        assert_eq!(config.forecast.level, 850.0);
        assert_eq!(config.forecast.output_prefix, "op");
    }
}
