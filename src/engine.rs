//! Builds the `snakemake` invocation that runs the workflow on a
//! configuration. The command is returned as an argument vector; running it
//! is up to the caller.

use std::path::PathBuf;

use crate::diagnostics::{DiagnosticKind, Diagnostics, Reported};

/// Executor whose resources are collected into `--default-resources`.
pub const SLURM_EXECUTOR: &str = "slurm";

/// Runtime, in minutes, used when the requested one is not positive.
pub const DEFAULT_RUNTIME_MINUTES: i64 = 120;

/// Options of a workflow launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub snakefile: PathBuf,
    pub config_path: PathBuf,
    /// Maximum number of concurrent jobs.
    pub jobs: i64,
    /// Cores of the local engine process. Irrelevant with a cluster executor.
    pub cores: i64,
    /// Times a failed job is re-submitted. Each retry bumps the job's
    /// `attempt`, which drives tier selection.
    pub retries: u32,
    /// `None` runs jobs locally.
    pub executor: Option<String>,
    pub slurm_account: String,
    /// Default job runtime in minutes.
    pub runtime: i64,
    pub clusters: String,
    /// Default job memory in MB.
    pub memory: i64,
    /// Extra `key=value` default resources, separated by spaces or commas.
    pub other_default: String,
    /// Extra engine arguments, split on whitespace.
    pub other_args: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            snakefile: PathBuf::from("Snakefile"),
            config_path: PathBuf::from("config.yaml"),
            jobs: 5,
            cores: 5,
            retries: 3,
            executor: Some(SLURM_EXECUTOR.to_string()),
            slurm_account: String::new(),
            runtime: DEFAULT_RUNTIME_MINUTES,
            clusters: String::new(),
            memory: 2000,
            other_default: "slurm_output=logs/%x_%j.out slurm_error=logs/%x_%j.err".to_string(),
            other_args: String::new(),
        }
    }
}

fn positive_or_one(value: i64, option: &str, diags: &mut Diagnostics) -> i64 {
    if value > 0 {
        return value;
    }
    diags.warn(
        DiagnosticKind::OptionAdjusted,
        option,
        format!("--{} was set to {}, defaulting to 1", option, value),
    );
    1
}

/// The `--default-resources` values of a slurm launch.
fn slurm_resources(opts: &EngineOptions, diags: &mut Diagnostics) -> Vec<String> {
    let mut resources = Vec::new();

    if !opts.slurm_account.is_empty() {
        resources.push(format!("slurm_account={}", opts.slurm_account));
    }

    let runtime = if opts.runtime > 0 {
        opts.runtime
    } else {
        diags.warn(
            DiagnosticKind::OptionAdjusted,
            "runtime",
            format!(
                "--runtime was set to {}, using {} minutes",
                opts.runtime, DEFAULT_RUNTIME_MINUTES
            ),
        );
        DEFAULT_RUNTIME_MINUTES
    };
    resources.push(format!("runtime={}", runtime));

    if !opts.clusters.is_empty() {
        resources.push(format!("clusters={}", opts.clusters));
    }

    if opts.memory > 0 {
        resources.push(format!("mem_mb={}", opts.memory));
    } else {
        diags.warn(
            DiagnosticKind::OptionAdjusted,
            "memory",
            format!(
                "--memory was set to {}, leaving memory to the rule defaults",
                opts.memory
            ),
        );
    }

    resources.extend(
        opts.other_default
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
    resources
}

/// Argument vector of the workflow launch, starting with `snakemake`.
pub fn build_command(opts: &EngineOptions) -> Reported<Vec<String>> {
    let mut diags = Diagnostics::new();

    let mut cmd: Vec<String> = vec![
        "snakemake".into(),
        "--snakefile".into(),
        opts.snakefile.display().to_string(),
        "--configfile".into(),
        opts.config_path.display().to_string(),
        "--cores".into(),
        positive_or_one(opts.cores, "cores", &mut diags).to_string(),
        "--jobs".into(),
        positive_or_one(opts.jobs, "jobs", &mut diags).to_string(),
        "--retries".into(),
        opts.retries.to_string(),
    ];

    match opts.executor.as_deref() {
        None => (),
        Some(SLURM_EXECUTOR) => {
            cmd.push("--executor".into());
            cmd.push(SLURM_EXECUTOR.into());
            cmd.push("--default-resources".into());
            cmd.extend(slurm_resources(opts, &mut diags));
        }
        Some(other) => {
            cmd.push("--executor".into());
            cmd.push(other.to_string());
        }
    }

    cmd.extend(opts.other_args.split_whitespace().map(str::to_string));

    Reported::new(cmd, diags)
}
