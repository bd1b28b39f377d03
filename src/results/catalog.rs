use std::fs;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::error::{EvalError, EvalResult};
use crate::results::model::{ConfigRecord, ConfigValue, ExperimentGroup, RunId};

/// Key naming the run in a log record.
pub const RUN_NAME_KEY: &str = "exp_name";
const LOG_FILE: &str = "log.txt";
const MISSING_VALUE: &str = "None";

/// Parse `key: value` lines into the run name and its remaining configuration.
pub fn parse_log_record(text: &str) -> EvalResult<(RunId, ConfigRecord)> {
    let mut config = ConfigRecord::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line.split_once(": ").ok_or_else(|| {
            EvalError::Configuration(format!(
                "log line {} is not of the form 'key: value': {line}",
                line_no + 1
            ))
        })?;
        config.insert(key.trim(), ConfigValue::parse(value));
    }
    let run = match config.remove(RUN_NAME_KEY) {
        Some(value) => value.to_string(),
        None => {
            return Err(EvalError::Configuration(format!(
                "log record has no '{RUN_NAME_KEY}' entry"
            )))
        }
    };
    Ok((run, config))
}

/// Read `log.txt` from every immediate subdirectory of `root`, sorted by path.
pub fn discover_runs(root: &Path) -> EvalResult<Vec<(RunId, ConfigRecord)>> {
    let entries = fs::read_dir(root).map_err(|source| EvalError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let mut log_paths: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().join(LOG_FILE))
        .filter(|path| path.is_file())
        .collect();
    log_paths.sort();

    let mut records = Vec::with_capacity(log_paths.len());
    for path in log_paths {
        let text = fs::read_to_string(&path).map_err(|source| EvalError::Io {
            path: path.clone(),
            source,
        })?;
        let record = parse_log_record(&text)?;
        debug!("Discovered run {} at {:?}", record.0, path);
        records.push(record);
    }
    Ok(records)
}

/// Group runs whose configurations agree on every key. Keys a record lacks
/// compare as `None`; groups keep first-seen order and their first member's
/// configuration.
pub fn group_runs(records: Vec<(RunId, ConfigRecord)>) -> Vec<ExperimentGroup> {
    let mut keys: IndexSet<String> = IndexSet::new();
    for (_, config) in &records {
        keys.extend(config.keys().map(str::to_string));
    }

    let mut groups: IndexMap<Vec<String>, ExperimentGroup> = IndexMap::new();
    for (run, config) in records {
        let signature: Vec<String> = keys
            .iter()
            .map(|key| {
                config
                    .get(key)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| MISSING_VALUE.to_string())
            })
            .collect();
        groups
            .entry(signature)
            .or_insert_with(|| ExperimentGroup::new(config, Vec::new()))
            .runs
            .push(run);
    }
    groups.into_values().collect()
}
