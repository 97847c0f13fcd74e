//! Typed construction of a `Configuration` from a parsed YAML value.
//!
//! Rather than failing on the first absent key, the builders walk the
//! whole document and record each problem with its dotted location
//! (`SEQUENCING.MO203.PATH: missing`). The document is rejected only once
//! everything has been inspected.

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use super::{Configuration, JobsPolicy, Mark, Project, ReadPair, Sample, SequencingRun, Tier};
use crate::error::{ConfigError, Result};

const ROOT_KEYS: &[&str] = &["SEQUENCING", "PROJECTS", "JOBS"];
const RUN_KEYS: &[&str] = &[
    "SAMPLES",
    "INPUT",
    "PATH",
    "SAMPLE_PATH",
    "R1_ADAPTOR",
    "R2_ADAPTOR",
    "PARAMETERS",
];
const SAMPLE_KEYS: &[&str] = &["R1", "R2", "TYPE"];
const INPUT_KEYS: &[&str] = &["R1", "R2"];
const PROJECT_KEYS: &[&str] = &["SEQUENCING", "TYPE", "MIN_SAMPLES_FOR_PEAKS", "PROJECT_PATH"];
const JOBS_KEYS: &[&str] = &["CORES_PER_JOBS", "QOS_INFOS", "SCHEDULER_PROFILES"];
const TIER_KEYS: &[&str] = &["MaxWall", "QOS", "PARTITION"];

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn add(&mut self, at: &str, what: impl AsRef<str>) {
        self.0.push(format!("{}: {}", at, what.as_ref()));
    }

    fn finish<T>(self, value: T) -> Result<T> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ConfigError::Invalid { problems: self.0 })
        }
    }
}

fn join(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", at, key)
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Keys may be written as bare numbers (`2024:`), treat them as names.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Entries of a mapping with their keys as strings. A null value stands
/// for an empty mapping (`INPUT:` with nothing below it).
fn entries<'a>(v: &'a Value, at: &str, problems: &mut Problems) -> Vec<(String, &'a Value)> {
    match v {
        Value::Null => Vec::new(),
        Value::Mapping(m) => m
            .iter()
            .filter_map(|(k, v)| match scalar_string(k) {
                Some(k) => Some((k, v)),
                None => {
                    problems.add(at, format!("key must be a name, found {}", type_name(k)));
                    None
                }
            })
            .collect(),
        other => {
            problems.add(at, format!("expected a mapping, found {}", type_name(other)));
            Vec::new()
        }
    }
}

fn as_mapping<'a>(v: &'a Value, at: &str, allowed: &[&str], problems: &mut Problems) -> Option<&'a Mapping> {
    match v {
        Value::Mapping(m) => {
            for k in m.keys() {
                match k.as_str() {
                    Some(k) if allowed.contains(&k) => (),
                    _ => problems.add(at, format!("unexpected key {}", describe_key(k))),
                }
            }
            Some(m)
        }
        other => {
            problems.add(at, format!("expected a mapping, found {}", type_name(other)));
            None
        }
    }
}

fn describe_key(k: &Value) -> String {
    match scalar_string(k) {
        Some(s) => format!("'{}'", s),
        None => type_name(k).to_string(),
    }
}

fn optional_string(m: &Mapping, key: &str, at: &str, problems: &mut Problems) -> Option<String> {
    match m.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => {
            let s = scalar_string(v);
            if s.is_none() {
                problems.add(&join(at, key), format!("expected a string, found {}", type_name(v)));
            }
            s
        }
    }
}

fn required_string(m: &Mapping, key: &str, at: &str, problems: &mut Problems) -> Option<String> {
    if m.get(key).map_or(true, Value::is_null) {
        problems.add(&join(at, key), "missing");
        return None;
    }
    optional_string(m, key, at, problems)
}

fn positive_int(v: &Value, at: &str, problems: &mut Problems) -> Option<u32> {
    match v.as_u64() {
        Some(n) if n >= 1 && n <= u64::from(u32::MAX) => Some(n as u32),
        _ => {
            problems.add(at, format!("expected a positive integer, found {}", describe_value(v)));
            None
        }
    }
}

fn describe_value(v: &Value) -> String {
    match v {
        Value::Number(n) => n.to_string(),
        other => type_name(other).to_string(),
    }
}

pub(crate) fn configuration_from_value(root: &Value) -> Result<Configuration> {
    let mut problems = Problems::default();
    let mut cfg = Configuration::default();

    let root = match root {
        // An empty file is an empty configuration.
        Value::Null => return Ok(cfg),
        v => match as_mapping(v, "<root>", ROOT_KEYS, &mut problems) {
            Some(m) => m,
            None => return problems.finish(cfg),
        },
    };

    if let Some(v) = root.get("SEQUENCING") {
        for (name, run) in entries(v, "SEQUENCING", &mut problems) {
            let at = join("SEQUENCING", &name);
            if let Some(run) = build_run(run, &at, &mut problems) {
                cfg.sequencing.insert(name, run);
            }
        }
    }

    if let Some(v) = root.get("PROJECTS") {
        for (name, project) in entries(v, "PROJECTS", &mut problems) {
            let at = join("PROJECTS", &name);
            if let Some(project) = build_project(project, &at, &mut problems) {
                cfg.projects.insert(name, project);
            }
        }
    }

    if let Some(v) = root.get("JOBS") {
        if !v.is_null() {
            cfg.jobs = build_jobs(v, "JOBS", &mut problems);
        }
    }

    problems.finish(cfg)
}

/// Accepts either a bare jobs mapping or a document with a `JOBS` key.
pub(crate) fn jobs_from_value(root: &Value) -> Result<JobsPolicy> {
    let mut problems = Problems::default();
    let jobs = match root {
        Value::Null => JobsPolicy::default(),
        Value::Mapping(m) if m.contains_key("JOBS") => {
            as_mapping(root, "<root>", &["JOBS"], &mut problems);
            match m.get("JOBS") {
                Some(v) if !v.is_null() => build_jobs(v, "JOBS", &mut problems),
                _ => JobsPolicy::default(),
            }
        }
        v => build_jobs(v, "JOBS", &mut problems),
    };
    problems.finish(jobs)
}

fn build_run(v: &Value, at: &str, problems: &mut Problems) -> Option<SequencingRun> {
    let m = as_mapping(v, at, RUN_KEYS, problems)?;

    // SAMPLE_PATH is the key used by early versions of the document.
    let path = if m.contains_key("PATH") || !m.contains_key("SAMPLE_PATH") {
        required_string(m, "PATH", at, problems)
    } else {
        required_string(m, "SAMPLE_PATH", at, problems)
    };

    let mut run = SequencingRun {
        path: path.unwrap_or_default(),
        r1_adaptor: optional_string(m, "R1_ADAPTOR", at, problems),
        r2_adaptor: optional_string(m, "R2_ADAPTOR", at, problems),
        ..Default::default()
    };

    if let Some(params) = m.get("PARAMETERS") {
        let params_at = join(at, "PARAMETERS");
        for (tool, value) in entries(params, &params_at, problems) {
            match scalar_string(value) {
                Some(s) => {
                    run.parameters.insert(tool, s);
                }
                None => problems.add(
                    &join(&params_at, &tool),
                    format!("expected a string, found {}", type_name(value)),
                ),
            }
        }
    }

    if let Some(samples) = m.get("SAMPLES") {
        let samples_at = join(at, "SAMPLES");
        for (name, sample) in entries(samples, &samples_at, problems) {
            let sample_at = join(&samples_at, &name);
            if let Some(sample) = build_sample(sample, &sample_at, problems) {
                run.samples.insert(name, sample);
            }
        }
    }

    if let Some(inputs) = m.get("INPUT") {
        let inputs_at = join(at, "INPUT");
        let mut parsed = IndexMap::new();
        for (name, pair) in entries(inputs, &inputs_at, problems) {
            let pair_at = join(&inputs_at, &name);
            if let Some(m) = as_mapping(pair, &pair_at, INPUT_KEYS, problems) {
                parsed.insert(name, build_read_pair(m, &pair_at, problems));
            }
        }
        run.input = Some(parsed);
    }

    Some(run)
}

fn build_read_pair(m: &Mapping, at: &str, problems: &mut Problems) -> ReadPair {
    ReadPair {
        r1: optional_string(m, "R1", at, problems),
        r2: optional_string(m, "R2", at, problems),
    }
}

fn build_sample(v: &Value, at: &str, problems: &mut Problems) -> Option<Sample> {
    let m = as_mapping(v, at, SAMPLE_KEYS, problems)?;
    let reads = build_read_pair(m, at, problems);
    let mark = required_string(m, "TYPE", at, problems)?;
    Some(Sample {
        reads,
        mark: Mark::new(mark),
    })
}

fn build_project(v: &Value, at: &str, problems: &mut Problems) -> Option<Project> {
    let m = as_mapping(v, at, PROJECT_KEYS, problems)?;

    let project_path = required_string(m, "PROJECT_PATH", at, problems);
    let mark = required_string(m, "TYPE", at, problems);
    let min_samples = match m.get("MIN_SAMPLES_FOR_PEAKS") {
        None | Some(Value::Null) => {
            problems.add(&join(at, "MIN_SAMPLES_FOR_PEAKS"), "missing");
            None
        }
        Some(v) => positive_int(v, &join(at, "MIN_SAMPLES_FOR_PEAKS"), problems),
    };

    let runs_at = join(at, "SEQUENCING");
    let mut sequencing = Vec::new();
    match m.get("SEQUENCING") {
        None | Some(Value::Null) => (),
        Some(Value::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                match scalar_string(item) {
                    Some(name) => sequencing.push(name),
                    None => problems.add(
                        &format!("{}[{}]", runs_at, i),
                        format!("expected a run name, found {}", type_name(item)),
                    ),
                }
            }
        }
        Some(other) => problems.add(&runs_at, format!("expected a list, found {}", type_name(other))),
    }

    Some(Project {
        sequencing,
        mark: Mark::new(mark?),
        min_samples_for_peaks: min_samples?,
        project_path: project_path?,
    })
}

fn build_jobs(v: &Value, at: &str, problems: &mut Problems) -> JobsPolicy {
    let mut jobs = JobsPolicy::default();
    let m = match as_mapping(v, at, JOBS_KEYS, problems) {
        Some(m) => m,
        None => return jobs,
    };

    if let Some(cores) = m.get("CORES_PER_JOBS") {
        let cores_at = join(at, "CORES_PER_JOBS");
        for (step, n) in entries(cores, &cores_at, problems) {
            if let Some(n) = positive_int(n, &join(&cores_at, &step), problems) {
                jobs.cores_per_jobs.insert(step, n);
            }
        }
    }

    let table_key = match (m.contains_key("QOS_INFOS"), m.contains_key("SCHEDULER_PROFILES")) {
        (true, true) => {
            problems.add(at, "QOS_INFOS and SCHEDULER_PROFILES are aliases, declare only one");
            None
        }
        (true, false) => Some("QOS_INFOS"),
        (false, true) => Some("SCHEDULER_PROFILES"),
        (false, false) => None,
    };

    if let Some(key) = table_key {
        let table_at = join(at, key);
        let mut table = IndexMap::new();
        if let Some(tiers) = m.get(key) {
            for (name, tier) in entries(tiers, &table_at, problems) {
                let tier_at = join(&table_at, &name);
                if let Some(tier) = build_tier(tier, &tier_at, problems) {
                    table.insert(name, tier);
                }
            }
        }
        jobs.tiers = Some(table);
    }

    jobs
}

fn build_tier(v: &Value, at: &str, problems: &mut Problems) -> Option<Tier> {
    let m = as_mapping(v, at, TIER_KEYS, problems)?;
    let qos = optional_string(m, "QOS", at, problems);
    let partition = optional_string(m, "PARTITION", at, problems);
    let max_wall = match m.get("MaxWall") {
        None | Some(Value::Null) => {
            problems.add(&join(at, "MaxWall"), "missing");
            None
        }
        Some(v) => positive_int(v, &join(at, "MaxWall"), problems),
    }?;
    Some(Tier {
        max_wall,
        qos,
        partition,
    })
}
