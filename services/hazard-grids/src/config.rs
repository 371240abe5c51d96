//! Run configuration.
//!
//! Layered as: built-in defaults, then an optional YAML file (with `${VAR}`
//! and `${VAR:-default}` substitution), then `HAZARD_*` environment
//! variables, then command-line flags (applied by the binary).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use grid_processor::ProcessorConfig;
use hazard_common::{parse_compact_hour, BoundingBox, TimeWindow};

/// Model domain, as used in BARRA file and directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    #[serde(rename = "AD")]
    Adelaide,
    #[serde(rename = "PH")]
    Perth,
    #[serde(rename = "SY")]
    Sydney,
    #[serde(rename = "TA")]
    Tasmania,
    #[serde(rename = "R")]
    Regional,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Adelaide,
        Domain::Perth,
        Domain::Sydney,
        Domain::Tasmania,
        Domain::Regional,
    ];

    /// Parse a domain code (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Adelaide => "AD",
            Domain::Perth => "PH",
            Domain::Sydney => "SY",
            Domain::Tasmania => "TA",
            Domain::Regional => "R",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::parse(s).ok_or_else(|| format!("unknown domain '{}' (expected AD, PH, SY, TA or R)", s))
    }
}

/// Variables and options of the `wind` products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    pub u_variable: String,
    pub v_variable: String,
    pub gust_variable: String,
    /// Leading steps dropped from each file (1 for sub-hourly files that
    /// repeat the previous file's last step).
    pub skip_leading: usize,
    /// Also write the neighbourhood maximum of the event gust.
    pub neighbourhood: bool,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            u_variable: "uwnd10m".to_string(),
            v_variable: "vwnd10m".to_string(),
            gust_variable: "max_wndgust10m".to_string(),
            skip_leading: 0,
            neighbourhood: true,
        }
    }
}

/// Variables and windows of the `rain` products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    /// Running accumulation variable.
    pub variable: String,
    /// Window of the P1RR / N1RR rolling totals.
    pub short_window_minutes: i64,
    /// Window of the P6RR rolling totals.
    pub long_window_minutes: i64,
    /// Optional closed window for PTEA (`YYYYMMDDHH`).
    pub event_start: Option<String>,
    pub event_end: Option<String>,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            variable: "accum_prcp".to_string(),
            short_window_minutes: 60,
            long_window_minutes: 360,
            event_start: None,
            event_end: None,
        }
    }
}

/// Inputs of the operational `forecast` products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub surface_file: Option<PathBuf>,
    pub pressure_file: Option<PathBuf>,
    pub u10_variable: String,
    pub v10_variable: String,
    pub gust_variable: String,
    pub u_level_variable: String,
    pub v_level_variable: String,
    /// Pressure level of the gradient wind, in the file's level units.
    pub level: f64,
    pub output_prefix: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            surface_file: None,
            pressure_file: None,
            u10_variable: "uwnd10m".to_string(),
            v10_variable: "vwnd10m".to_string(),
            gust_variable: "wndgust10m".to_string(),
            u_level_variable: "uwnd".to_string(),
            v_level_variable: "vwnd".to_string(),
            level: 900.0,
            output_prefix: "op".to_string(),
        }
    }
}

/// Top-level configuration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Directory template for input files.
    pub directory_mask: String,
    /// File name template for input files.
    pub filename_mask: String,
    pub domain: Domain,
    pub version: String,
    /// First file time, `YYYYMMDDHH`.
    pub start_date: String,
    /// Last file time, `YYYYMMDDHH`.
    pub end_date: String,
    /// Spacing of candidate file times.
    pub file_interval_hours: i64,
    /// Scan this directory recursively instead of expanding templates.
    pub input_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Latitude/longitude constraint applied on load.
    pub bbox: Option<BoundingBox>,
    pub processor: ProcessorConfig,
    pub wind: WindConfig,
    pub rain: RainConfig,
    pub forecast: ForecastConfig,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            directory_mask: "/g/data/ma05/BARRA_{domain}/{version}/forecast/spec/{variable}/{yyyy}/{mm}/"
                .to_string(),
            filename_mask:
                "{variable}-fc-spec-PT1H-BARRA_{domain}-{version}-{yyyy}{mm}{dd}T{hh}00Z.sub.nc"
                    .to_string(),
            domain: Domain::Sydney,
            version: "v1".to_string(),
            start_date: "2015041900".to_string(),
            end_date: "2015042218".to_string(),
            file_interval_hours: 6,
            input_dir: None,
            output_dir: PathBuf::from("output"),
            bbox: None,
            processor: ProcessorConfig::default(),
            wind: WindConfig::default(),
            rain: RainConfig::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl HazardConfig {
    /// Defaults, overlaid with `path` if given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load a YAML file; missing keys keep their defaults.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let expanded = expand_env_vars(&content)?;
        serde_yaml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config YAML from {:?}", path))
    }

    /// Override fields from `HAZARD_*` environment variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("HAZARD_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("HAZARD_INPUT_DIR") {
            self.input_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("HAZARD_DOMAIN") {
            if let Some(domain) = Domain::parse(&val) {
                self.domain = domain;
            }
        }
        if let Ok(val) = std::env::var("HAZARD_VERSION") {
            self.version = val;
        }
        if let Ok(val) = std::env::var("HAZARD_BBOX") {
            if let Ok(bbox) = BoundingBox::parse(&val) {
                self.bbox = Some(bbox);
            }
        }
        self.processor.apply_env();
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.processor.validate()?;

        if self.file_interval_hours <= 0 {
            return Err("file_interval_hours must be > 0".to_string());
        }
        if self.rain.short_window_minutes <= 0 || self.rain.long_window_minutes <= 0 {
            return Err("rain window lengths must be > 0".to_string());
        }
        if self.rain.event_start.is_some() != self.rain.event_end.is_some() {
            return Err("rain event_start and event_end must be given together".to_string());
        }

        let (start, end) = self.period().map_err(|e| e.to_string())?;
        if start > end {
            return Err(format!("start_date {} is after end_date {}", self.start_date, self.end_date));
        }

        Ok(())
    }

    /// Start and end of the file period.
    pub fn period(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_compact_hour(&self.start_date).context("Invalid start_date")?;
        let end = parse_compact_hour(&self.end_date).context("Invalid end_date")?;
        Ok((start, end))
    }

    pub fn file_interval(&self) -> Duration {
        Duration::hours(self.file_interval_hours)
    }

    /// Closed window restricting the PTEA total, if configured.
    pub fn rain_event_window(&self) -> Result<Option<TimeWindow>> {
        match (&self.rain.event_start, &self.rain.event_end) {
            (Some(start), Some(end)) => {
                let start = parse_compact_hour(start).context("Invalid rain event_start")?;
                let end = parse_compact_hour(end).context("Invalid rain event_end")?;
                Ok(Some(TimeWindow::new(start, end)?))
            }
            _ => Ok(None),
        }
    }

    /// `{domain}_{start}_{end}`, the suffix that makes output names unique.
    pub fn run_label(&self) -> String {
        format!("{}_{}_{}", self.domain, self.start_date, self.end_date)
    }
}

/// Expand `${VAR}` and `${VAR:-default}` in configuration text.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", expr),
            }
        }
        result.push_str(&resolve_var_expr(&expr)?);
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
