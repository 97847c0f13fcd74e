//! Typed representation of the chromake configuration document.
//!
//! The document has three sections:
//! * `SEQUENCING`: one entry per sequencing run, holding the FASTQ pairs
//!   of its samples and input controls,
//! * `PROJECTS`: groups of runs sharing a mark, used for joint peak calling,
//! * `JOBS`: cores per processing step and the scheduler tier table.
//!
//! Documents are read and written wholesale as YAML. Reading goes through
//! an explicit validation step (see `document`) that reports every missing
//! or malformed field at once. Keys keep their insertion order so a
//! rewritten document stays diff-friendly.

mod clean;
mod document;
mod edit;
mod example;
#[cfg(test)]
pub(crate) mod testing;

pub use example::{create_example, ExampleParams};

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::utils;

/// Marks whose samples need an input control for peak calling.
pub const CHIP_MARKS: [&str; 3] = ["H3K27AC", "H3K27ME3", "H2AUB"];

/// Tier name -> tier, in document order.
pub type TierTable = IndexMap<String, Tier>;

/// The assay label (`TYPE`) of a sample or project, e.g. `H3K27AC` or `ATAC`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(transparent)]
pub struct Mark(String);

impl Mark {
    pub fn new(mark: impl Into<String>) -> Mark {
        Mark(mark.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ChIP marks require an input control, other assays (ATAC) do not.
    pub fn is_chip(&self) -> bool {
        CHIP_MARKS.contains(&self.0.as_str())
    }
}

impl From<&str> for Mark {
    fn from(mark: &str) -> Self {
        Mark::new(mark)
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One of the two reads of a paired-end library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    R1,
    R2,
}

impl Strand {
    pub fn both() -> [Strand; 2] {
        [Strand::R1, Strand::R2]
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::R1 => f.write_str("R1"),
            Strand::R2 => f.write_str("R2"),
        }
    }
}

impl FromStr for Strand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "R1" => Ok(Strand::R1),
            "R2" => Ok(Strand::R2),
            other => Err(format!("unknown strand '{}'", other)),
        }
    }
}

/// FASTQ files of a paired-end library, relative to the run `PATH` unless absolute.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ReadPair {
    #[serde(rename = "R1", skip_serializing_if = "Option::is_none")]
    pub r1: Option<String>,
    #[serde(rename = "R2", skip_serializing_if = "Option::is_none")]
    pub r2: Option<String>,
}

impl ReadPair {
    pub fn new(r1: impl Into<String>, r2: impl Into<String>) -> ReadPair {
        ReadPair {
            r1: Some(r1.into()),
            r2: Some(r2.into()),
        }
    }

    pub fn get(&self, strand: Strand) -> Option<&str> {
        match strand {
            Strand::R1 => self.r1.as_deref(),
            Strand::R2 => self.r2.as_deref(),
        }
    }

    pub fn set(&mut self, strand: Strand, file: String) {
        match strand {
            Strand::R1 => self.r1 = Some(file),
            Strand::R2 => self.r2 = Some(file),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.r1.is_some() && self.r2.is_some()
    }

    /// The declared files, R1 first.
    pub fn files(&self) -> impl Iterator<Item = (Strand, &str)> {
        Strand::both()
            .into_iter()
            .filter_map(move |s| self.get(s).map(|f| (s, f)))
    }
}

/// A treated sample: its reads and the mark it was assayed for.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    #[serde(flatten)]
    pub reads: ReadPair,
    #[serde(rename = "TYPE")]
    pub mark: Mark,
}

impl Sample {
    pub fn new(r1: impl Into<String>, r2: impl Into<String>, mark: impl Into<Mark>) -> Sample {
        Sample {
            reads: ReadPair::new(r1, r2),
            mark: mark.into(),
        }
    }
}

/// One sequencing batch sharing a base directory, adapters and input controls.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct SequencingRun {
    #[serde(rename = "SAMPLES", skip_serializing_if = "IndexMap::is_empty")]
    pub samples: IndexMap<String, Sample>,
    #[serde(rename = "INPUT", skip_serializing_if = "Option::is_none")]
    pub input: Option<IndexMap<String, ReadPair>>,
    #[serde(rename = "PATH")]
    pub path: String,
    #[serde(rename = "R1_ADAPTOR", skip_serializing_if = "Option::is_none")]
    pub r1_adaptor: Option<String>,
    #[serde(rename = "R2_ADAPTOR", skip_serializing_if = "Option::is_none")]
    pub r2_adaptor: Option<String>,
    #[serde(rename = "PARAMETERS", skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
}

impl SequencingRun {
    pub fn new(path: impl Into<String>) -> SequencingRun {
        SequencingRun {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Input controls, empty when the run declares none.
    pub fn inputs(&self) -> impl Iterator<Item = (&String, &ReadPair)> {
        self.input.iter().flatten()
    }

    /// A run with neither samples nor input controls has nothing to process.
    pub fn has_reads(&self) -> bool {
        !self.samples.is_empty() || self.input.as_ref().map_or(false, |i| !i.is_empty())
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.samples.values().any(|s| &s.mark == mark)
    }

    pub fn has_chip_samples(&self) -> bool {
        self.samples.values().any(|s| s.mark.is_chip())
    }

    /// Adapter trimming is inserted for runs declaring an adapter sequence.
    pub fn trims_adapters(&self) -> bool {
        self.r1_adaptor.is_some() || self.r2_adaptor.is_some()
    }

    /// Tool-specific command line override, e.g. `parameter("CUTADAPT")`.
    pub fn parameter(&self, tool: &str) -> Option<&str> {
        self.parameters.get(tool).map(String::as_str)
    }

    /// Every read pair of the run with its name: samples first, then inputs.
    pub fn read_pairs(&self) -> impl Iterator<Item = (&String, &ReadPair)> {
        self.samples
            .iter()
            .map(|(name, s)| (name, &s.reads))
            .chain(self.inputs())
    }

    /// Every declared FASTQ file as written in the document, in encounter order.
    pub fn fastqs(&self) -> impl Iterator<Item = &str> {
        self.read_pairs().flat_map(|(_, pair)| pair.files().map(|(_, f)| f))
    }
}

/// Runs aggregated for joint peak calling on one mark.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Project {
    #[serde(rename = "SEQUENCING")]
    pub sequencing: Vec<String>,
    #[serde(rename = "TYPE")]
    pub mark: Mark,
    #[serde(rename = "MIN_SAMPLES_FOR_PEAKS")]
    pub min_samples_for_peaks: u32,
    #[serde(rename = "PROJECT_PATH")]
    pub project_path: String,
}

/// A scheduler resource profile.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Tier {
    /// Maximum wall-clock time, in minutes.
    #[serde(rename = "MaxWall")]
    pub max_wall: u32,
    #[serde(rename = "QOS", skip_serializing_if = "Option::is_none")]
    pub qos: Option<String>,
    #[serde(rename = "PARTITION", skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
}

impl Tier {
    pub fn new(max_wall: u32) -> Tier {
        Tier {
            max_wall,
            qos: None,
            partition: None,
        }
    }
}

/// Resource policy for the workflow's jobs. Also used as the partial
/// payload of `Configuration::merge_jobs`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct JobsPolicy {
    #[serde(rename = "CORES_PER_JOBS", skip_serializing_if = "IndexMap::is_empty")]
    pub cores_per_jobs: IndexMap<String, u32>,
    #[serde(rename = "QOS_INFOS", skip_serializing_if = "Option::is_none")]
    pub tiers: Option<TierTable>,
}

impl JobsPolicy {
    pub fn is_empty(&self) -> bool {
        self.cores_per_jobs.is_empty() && self.tiers.is_none()
    }

    pub fn cores_for(&self, step: &str) -> Option<u32> {
        self.cores_per_jobs.get(step).copied()
    }

    /// Parse a `JOBS` payload, either bare or wrapped in a `JOBS:` key.
    pub fn from_yaml_str(text: &str) -> Result<JobsPolicy> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        document::jobs_from_value(&value)
    }
}

/// The whole chromake configuration document.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Configuration {
    #[serde(rename = "SEQUENCING")]
    pub sequencing: IndexMap<String, SequencingRun>,
    #[serde(rename = "PROJECTS")]
    pub projects: IndexMap<String, Project>,
    #[serde(rename = "JOBS", skip_serializing_if = "JobsPolicy::is_empty")]
    pub jobs: JobsPolicy,
}

impl Configuration {
    /// Build a typed configuration from YAML text. Fails with
    /// `ConfigError::Invalid` listing every structural problem found.
    pub fn from_yaml_str(text: &str) -> Result<Configuration> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        document::configuration_from_value(&value)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Configuration> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let cfg = Configuration::from_yaml_str(&text)?;
        log::debug!(
            "loaded {} runs and {} projects from {}",
            cfg.sequencing.len(),
            cfg.projects.len(),
            path.display()
        );
        Ok(cfg)
    }

    /// Rewrite the whole document at `path`. The file is replaced atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_yaml_string()?;
        utils::write_atomically(path, text.as_bytes())?;
        log::debug!("wrote configuration to {}", path.display());
        Ok(())
    }

    pub fn run(&self, name: &str) -> Option<&SequencingRun> {
        self.sequencing.get(name)
    }

    /// The first project aggregating `mark`, in document order.
    pub fn project_for_mark(&self, mark: &Mark) -> Option<(&String, &Project)> {
        self.projects.iter().find(|(_, p)| &p.mark == mark)
    }

    pub fn tiers(&self) -> Option<&TierTable> {
        self.jobs.tiers.as_ref()
    }
}
