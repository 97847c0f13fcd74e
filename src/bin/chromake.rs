//! `chromake`: create, edit and inspect workflow configurations.
//!
//! Every editing subcommand loads the document, applies the change, runs the
//! consistency pass and rewrites the file. Diagnostics go through the `log`
//! facade at `info` level unless `RUST_LOG` says otherwise.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use chromake::config::{create_example, Configuration, ExampleParams, JobsPolicy};
use chromake::engine::{build_command, EngineOptions};
use chromake::paths::derive_paths;
use chromake::samplesheet::{self, Layout, RunMetadata};
use chromake::tier::resources_for_attempt;
use chromake::utils;
use chromake::Diagnostics;

#[derive(Parser)]
#[command(name = "chromake")]
#[command(about = "Configuration tools for the chromake ChIP-seq / ATAC-seq workflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template configuration
    Example {
        /// Output file, `config.yaml` in it if a directory
        output: PathBuf,

        /// Directory holding one sub-directory per run and project
        #[arg(long, default_value = "/scratch/chromake")]
        root: String,

        /// At least 1
        #[arg(long, default_value = "2")]
        min_samples_for_peaks: NonZeroU32,
    },

    /// Validate a configuration and drop inconsistent entries
    Clean { config: PathBuf },

    /// Merge a JOBS payload (YAML) into a configuration
    UpdateJobs {
        config: PathBuf,

        /// YAML file with CORES_PER_JOBS and/or QOS_INFOS
        jobs: PathBuf,
    },

    /// Remove a sequencing run
    RemoveSequencing { config: PathBuf, run: String },

    /// Remove samples from a sequencing run
    RemoveSamples {
        config: PathBuf,
        run: String,
        #[arg(required = true)]
        samples: Vec<String>,
    },

    /// Export the samples to a CSV, TSV or XLSX sample sheet
    ToTable {
        config: PathBuf,
        output: PathBuf,

        /// One row per sample (R1/R2 columns) instead of one row per file
        #[arg(long)]
        wide: bool,
    },

    /// Build a configuration from a long CSV, TSV or Excel sample sheet
    FromTable {
        table: PathBuf,
        output: PathBuf,

        /// YAML mapping of project name to PROJECT_PATH
        #[arg(long)]
        projects: PathBuf,

        /// YAML mapping of run name to PATH, R1_ADAPTOR, R2_ADAPTOR and PARAMETERS
        #[arg(long)]
        runs: PathBuf,

        /// YAML file with the JOBS section
        #[arg(long)]
        jobs: Option<PathBuf>,
    },

    /// Print the output paths of a workflow step
    Paths {
        config: PathBuf,

        /// sequencing, fastq_raw, fastqc_raw, multiqc_raw, cutadapt,
        /// fastqc_trimmed, multiqc_trimmed, bam or bedgraph
        kind: String,

        #[arg(long)]
        run: Option<String>,
    },

    /// Print the scheduler tier of a job attempt
    Tier {
        config: PathBuf,

        #[arg(long, default_value_t = 1)]
        attempt: u32,

        /// Base runtime of the job in minutes
        #[arg(long, default_value_t = 120)]
        runtime: u32,
    },

    /// Check that every declared FASTQ exists
    CheckFiles { config: PathBuf },

    /// Print the snakemake command running the workflow
    Command {
        config: PathBuf,

        #[arg(long, default_value = "Snakefile")]
        snakefile: PathBuf,

        #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
        jobs: i64,

        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        cores: i64,

        #[arg(long, default_value_t = 3)]
        retries: u32,

        /// Cluster executor, `local` to run without one
        #[arg(short, long, default_value = "slurm")]
        executor: String,

        #[arg(long, default_value = "")]
        slurm_account: String,

        /// Default job runtime in minutes
        #[arg(short, long, default_value_t = 120, allow_negative_numbers = true)]
        runtime: i64,

        #[arg(long, default_value = "")]
        clusters: String,

        /// Default job memory in MB
        #[arg(short, long, default_value_t = 2000, allow_negative_numbers = true)]
        memory: i64,

        /// Extra default resources, e.g. `slurm_partition=fast`
        #[arg(long)]
        others_default: Option<String>,

        /// Extra snakemake arguments
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        others_snakemake: String,
    },
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Load, edit and rewrite a configuration. Every edit ends with the
/// consistency pass, so `f` reports its diagnostics too.
fn edit(path: &Path, f: impl FnOnce(&mut Configuration) -> Diagnostics) -> Result<Diagnostics> {
    let mut cfg = Configuration::load(path)?;
    let diags = f(&mut cfg);
    diags.log();
    cfg.save(path)?;
    Ok(diags)
}

/// `path` itself when it names a YAML file, else `config.yaml` inside it.
fn example_output(path: PathBuf) -> PathBuf {
    match utils::extension(&path).as_deref() {
        Some("yaml") | Some("yml") => path,
        _ => path.join("config.yaml"),
    }
}

/// Logger reading its filter from `var`, `info` when unset.
fn logger(var: &str) -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(var, "info"))
}

fn main() -> Result<()> {
    logger(env_logger::DEFAULT_FILTER_ENV).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Example {
            output,
            root,
            min_samples_for_peaks,
        } => {
            let output = example_output(output);
            let cfg = create_example(&ExampleParams {
                root,
                min_samples_for_peaks,
            });
            cfg.save(&output)?;
            log::info!("example configuration written to {}", output.display());
        }

        Commands::Clean { config } => {
            edit(&config, Configuration::validate_and_clean)?;
        }

        Commands::UpdateJobs { config, jobs } => {
            let text = std::fs::read_to_string(&jobs).with_context(|| format!("reading {}", jobs.display()))?;
            let partial = JobsPolicy::from_yaml_str(&text)?;
            edit(&config, |cfg| cfg.merge_jobs(&partial))?;
        }

        Commands::RemoveSequencing { config, run } => {
            edit(&config, |cfg| cfg.remove_run(&run))?;
        }

        Commands::RemoveSamples { config, run, samples } => {
            edit(&config, |cfg| cfg.remove_samples(&run, samples.as_slice()))?;
        }

        Commands::ToTable { config, output, wide } => {
            let cfg = Configuration::load(&config)?;
            let layout = if wide { Layout::Wide } else { Layout::Long };
            let sheet = samplesheet::to_table(&cfg, layout);
            samplesheet::write_table(&sheet, &output)?;
            log::info!("{} rows written to {}", sheet.len(), output.display());
        }

        Commands::FromTable {
            table,
            output,
            projects,
            runs,
            jobs,
        } => {
            let rows = samplesheet::read_table(&table)?;
            let project_paths: IndexMap<String, String> = read_yaml(&projects)?;
            let run_metadata: IndexMap<String, RunMetadata> = read_yaml(&runs)?;
            let jobs = match jobs {
                Some(path) => {
                    let text =
                        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
                    Some(JobsPolicy::from_yaml_str(&text)?)
                }
                None => None,
            };

            let (mut cfg, diags) = samplesheet::from_table(&rows, &project_paths, &run_metadata, jobs).into_parts();
            diags.log();
            cfg.validate_and_clean().log();
            cfg.save(&output)?;
        }

        Commands::Paths { config, kind, run } => {
            let cfg = Configuration::load(&config)?;
            let (paths, diags) = derive_paths(&cfg, &kind, run.as_deref()).into_parts();
            diags.log();
            for p in paths {
                println!("{}", p.display());
            }
        }

        Commands::Tier {
            config,
            attempt,
            runtime,
        } => {
            let cfg = Configuration::load(&config)?;
            let tier = resources_for_attempt(attempt, runtime, cfg.tiers());
            match tier.partition {
                Some(partition) => println!("{}\tqos={}\tpartition={}", tier.name, tier.qos, partition),
                None => println!("{}\tqos={}", tier.name, tier.qos),
            }
        }

        Commands::CheckFiles { config } => {
            let cfg = Configuration::load(&config)?;
            let (all_exist, diags) = cfg.check_fastqs_exist().into_parts();
            diags.log();
            if !all_exist {
                bail!("{} FASTQ files are missing", diags.len());
            }
        }

        Commands::Command {
            config,
            snakefile,
            jobs,
            cores,
            retries,
            executor,
            slurm_account,
            runtime,
            clusters,
            memory,
            others_default,
            others_snakemake,
        } => {
            let defaults = EngineOptions::default();
            let opts = EngineOptions {
                snakefile,
                config_path: config,
                jobs,
                cores,
                retries,
                executor: Some(executor).filter(|e| e != "local"),
                slurm_account,
                runtime,
                clusters,
                memory,
                other_default: others_default.unwrap_or(defaults.other_default),
                other_args: others_snakemake,
            };
            let (cmd, diags) = build_command(&opts).into_parts();
            diags.log();
            println!("{}", cmd.join(" "));
        }
    }

    Ok(())
}
