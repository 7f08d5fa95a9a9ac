//! Whitespace-delimited text files for firing-rate series and rewiring probabilities.
//!
//! A sweep directory holds, for trial `i`, the file `series_<i>.txt` with one line per module and
//! the file `p_<i>.txt` with the rewiring probability of the trial.
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::NetworkConfig;
use crate::error::SNNError;
use crate::rates::check_series_lengths;
use crate::trial::{run_trials, Sweep, TrialResult, TrialSettings};

fn parse_line(line: &str) -> Result<Vec<f64>, SNNError> {
    line.split_whitespace()
        .map(|value| {
            value
                .parse::<f64>()
                .map_err(|e| SNNError::ParseError(format!("{}: {}", value, e)))
        })
        .collect()
}

/// Save one series per line.
pub fn save_series<P: AsRef<Path>>(path: P, series: &[Vec<f64>]) -> Result<(), SNNError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for values in series.iter() {
        let line = values
            .iter()
            .map(|value| format!("{:e}", value))
            .collect::<Vec<String>>()
            .join(" ");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load series saved by [`save_series`]; all series must have the same length.
pub fn load_series<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>, SNNError> {
    let reader = BufReader::new(File::open(path)?);
    let mut series = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        series.push(parse_line(&line)?);
    }
    check_series_lengths(&series)?;
    Ok(series)
}

pub fn save_probability<P: AsRef<Path>>(path: P, p: f64) -> Result<(), SNNError> {
    fs::write(path, format!("{:e}\n", p))?;
    Ok(())
}

pub fn load_probability<P: AsRef<Path>>(path: P) -> Result<f64, SNNError> {
    let content = fs::read_to_string(path)?;
    match parse_line(&content)?.as_slice() {
        [p] => Ok(*p),
        values => Err(SNNError::ParseError(format!(
            "expected a single probability, found {} values",
            values.len()
        ))),
    }
}

fn trial_paths(dir: &Path, trial: usize) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("series_{}.txt", trial)),
        dir.join(format!("p_{}.txt", trial)),
    )
}

/// Save the results of a sweep, creating the directory if needed.
pub fn save_trials<P: AsRef<Path>>(dir: P, results: &[TrialResult]) -> Result<(), SNNError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for (trial, result) in results.iter().enumerate() {
        let (series_path, p_path) = trial_paths(dir, trial);
        save_series(series_path, &result.series)?;
        save_probability(p_path, result.p)?;
    }
    log::info!("{} trials saved to {}", results.len(), dir.display());
    Ok(())
}

/// Load the results of a sweep of `num_trials` trials.
/// Returns `None` if any of the expected files is missing.
pub fn load_trials<P: AsRef<Path>>(
    dir: P,
    num_trials: usize,
) -> Result<Option<Vec<TrialResult>>, SNNError> {
    let dir = dir.as_ref();
    let paths: Vec<(PathBuf, PathBuf)> = (0..num_trials).map(|i| trial_paths(dir, i)).collect();
    if !paths.iter().all(|(series, p)| series.is_file() && p.is_file()) {
        return Ok(None);
    }

    let results = paths
        .iter()
        .map(|(series_path, p_path)| {
            Ok(TrialResult {
                p: load_probability(p_path)?,
                series: load_series(series_path)?,
            })
        })
        .collect::<Result<Vec<TrialResult>, SNNError>>()?;
    Ok(Some(results))
}

/// Reuse the sweep saved in `dir` if it holds one trial per probability, otherwise run it.
/// A fresh sweep is saved, a reused one is returned as loaded and without failures.
pub fn load_or_run_trials<P: AsRef<Path>>(
    dir: P,
    ps: &[f64],
    config: &NetworkConfig,
    settings: &TrialSettings,
    seed: u64,
) -> Result<Sweep, SNNError> {
    let dir = dir.as_ref();
    if let Some(results) = load_trials(dir, ps.len())? {
        log::info!("Using {} saved trials from {}", results.len(), dir.display());
        return Ok(Sweep {
            results,
            failures: vec![],
        });
    }

    let sweep = run_trials(ps, config, settings, seed)?;
    save_trials(dir, &sweep.results)?;
    Ok(sweep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_settings() -> TrialSettings {
        TrialSettings {
            duration: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_series_file_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.txt");
        save_series(&path, &[vec![0.0, 0.02, 1.5], vec![0.1, 0.0, 0.0]]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(content.lines().next().unwrap().split(' ').count(), 3);

        assert_eq!(
            load_series(&path).unwrap(),
            vec![vec![0.0, 0.02, 1.5], vec![0.1, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_load_ragged_series() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("series.txt");
        fs::write(&path, "1 2 3\n4 5\n").unwrap();
        assert_eq!(
            load_series(&path),
            Err(SNNError::SeriesLengthMismatch {
                expected: 3,
                found: 2
            })
        );

        fs::write(&path, "1 two 3\n").unwrap();
        assert!(matches!(load_series(&path), Err(SNNError::ParseError(_))));
    }

    #[test]
    fn test_probability_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.txt");
        save_probability(&path, 0.375).unwrap();
        assert_eq!(load_probability(&path).unwrap(), 0.375);

        fs::write(&path, "0.1 0.2").unwrap();
        assert!(matches!(load_probability(&path), Err(SNNError::ParseError(_))));
    }

    #[test]
    fn test_trials_directory() {
        let dir = tempdir().unwrap();
        let results = vec![
            TrialResult {
                p: 0.25,
                series: vec![vec![0.0, 0.5]; 8],
            },
            TrialResult {
                p: 0.75,
                series: vec![vec![1.0, 0.0]; 8],
            },
        ];

        assert_eq!(load_trials(dir.path(), 2).unwrap(), None);
        save_trials(dir.path().join("results"), &results).unwrap();
        assert_eq!(
            load_trials(dir.path().join("results"), 2).unwrap(),
            Some(results)
        );
        assert_eq!(load_trials(dir.path().join("results"), 3).unwrap(), None);
    }

    #[test]
    fn test_saved_sweep_is_reused() {
        let dir = tempdir().unwrap();
        let saved = vec![TrialResult {
            p: 0.125,
            series: vec![vec![0.5, 0.25]; 8],
        }];
        save_trials(dir.path(), &saved).unwrap();

        let sweep = load_or_run_trials(
            dir.path(),
            &[0.9],
            &NetworkConfig::default(),
            &small_settings(),
            42,
        )
        .unwrap();
        assert_eq!(sweep.results, saved);
        assert!(sweep.failures.is_empty());
    }

    #[test]
    fn test_fresh_sweep_is_saved() {
        let dir = tempdir().unwrap();
        let config = NetworkConfig::default();
        let settings = small_settings();

        let sweep = load_or_run_trials(dir.path(), &[0.2], &config, &settings, 42).unwrap();
        assert_eq!(sweep.results.len(), 1);
        assert_eq!(sweep.results[0].p, 0.2);
        assert_eq!(load_trials(dir.path(), 1).unwrap(), Some(sweep.results));
    }
}
