//! Configuration core of the chromake ChIP-seq / ATAC-seq workflow.
//!
//! * `config`: the typed YAML document, its consistency pass and edits,
//! * `paths`: output locations of every workflow step,
//! * `tier`: scheduler tier selection for retried jobs,
//! * `samplesheet`: conversion to and from flat CSV/TSV sample sheets,
//! * `engine`: the `snakemake` command line for a configuration.
//!
//! Data-quality problems never abort an operation; they are returned as
//! `Diagnostics` next to the result. Only documents that cannot be built at
//! all produce a `ConfigError`.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod paths;
pub mod samplesheet;
pub mod tier;
pub mod utils;

pub use crate::config::{
    create_example, Configuration, ExampleParams, JobsPolicy, Mark, Project, ReadPair, Sample,
    SequencingRun, Strand, Tier, TierTable,
};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Reported, Severity};
pub use crate::error::{ConfigError, Result};
pub use crate::paths::{derive_paths, ArtifactKind};
pub use crate::samplesheet::{from_table, read_table, to_table, write_table, Layout, SampleSheet};
pub use crate::tier::{select_tier, DEFAULT_TIER};
