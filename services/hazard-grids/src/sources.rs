//! Input file discovery.
//!
//! Files are located either by expanding the directory and file name
//! templates at regular times between the start and end dates, or by
//! scanning an input directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::HazardConfig;

/// Replace every `{key}` in `template` with its value.
pub fn interpolate_template(template: &str, context: &[(&str, String)]) -> String {
    context.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

/// Placeholder values for one variable at one file time.
fn template_context(config: &HazardConfig, variable: &str, time: &DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("variable", variable.to_string()),
        ("domain", config.domain.to_string()),
        ("version", config.version.clone()),
        ("start_date", config.start_date.clone()),
        ("end_date", config.end_date.clone()),
        ("yyyy", time.format("%Y").to_string()),
        ("mm", time.format("%m").to_string()),
        ("dd", time.format("%d").to_string()),
        ("hh", time.format("%H").to_string()),
    ]
}

/// Every templated path from `start` to `end` inclusive, one per file
/// interval, whether or not it exists.
pub fn candidate_paths(
    config: &HazardConfig,
    variable: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PathBuf> {
    let step = config.file_interval();
    let mut paths = Vec::new();
    let mut current = start;

    while current <= end {
        let context = template_context(config, variable, &current);
        let dir = interpolate_template(&config.directory_mask, &context);
        let file = interpolate_template(&config.filename_mask, &context);
        paths.push(Path::new(&dir).join(file));
        current += step;
    }

    paths
}

/// Whether a file name refers to `variable`: one of its `-`/`.` separated
/// tokens equals the variable name, so `wndgust10m` does not match
/// `max_wndgust10m-...nc`.
fn names_variable(file_name: &str, variable: &str) -> bool {
    file_name.split(['-', '.']).any(|token| token == variable)
}

/// NetCDF files under `dir` whose name refers to `variable`, sorted by path.
pub fn scan_dir(dir: &Path, variable: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.ends_with(".nc") && names_variable(name, variable) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    Ok(paths)
}

/// Input files for `variable` over the configured period.
///
/// Fails when no file is found.
pub fn find_files(config: &HazardConfig, variable: &str) -> Result<Vec<PathBuf>> {
    let paths = match &config.input_dir {
        Some(dir) => scan_dir(dir, variable)?,
        None => {
            let (start, end) = config.period()?;
            let candidates = candidate_paths(config, variable, start, end);
            let total = candidates.len();
            let existing: Vec<PathBuf> = candidates
                .into_iter()
                .filter(|p| {
                    let found = p.is_file();
                    if !found {
                        debug!(path = %p.display(), "No file at candidate path");
                    }
                    found
                })
                .collect();
            if existing.len() < total {
                warn!(
                    variable,
                    missing = total - existing.len(),
                    candidates = total,
                    "Some candidate files do not exist"
                );
            }
            existing
        }
    };

    if paths.is_empty() {
        anyhow::bail!("No input files found for variable '{}'", variable);
    }

    info!(variable, files = paths.len(), "Found input files");
    Ok(paths)
}
