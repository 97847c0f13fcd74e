//! Paths of the files the workflow reads and produces.
//!
//! Every path is derived from a run's `PATH` and the FASTQ names declared
//! in the configuration, following the directory layout of the workflow:
//!
//! ```text
//! <PATH>/
//!   <R1/R2 as declared>              fastq_raw
//!   QC/FASTQC/RAW/<name>_fastqc.html fastqc_raw
//!   QC/MULTIQC/RAW/multiqc_report.html
//!   TRIMMED/<basename>               cutadapt
//!   QC/FASTQC/TRIMMED/...            fastqc_trimmed
//!   QC/MULTIQC/TRIMMED/multiqc_report.html
//!   BAM/<sample>.bam                 bam
//!   HOMER/<run>.bedgraph             bedgraph
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{Configuration, SequencingRun, Strand};
use crate::diagnostics::{DiagnosticKind, Diagnostics, Reported};

lazy_static! {
    /// One optional `.gz` after one `.fastq` (or `.fq`) at the end of a name.
    static ref FASTQ_SUFFIX: Regex = Regex::new(r"\.f(?:ast)?q(?:\.gz)?$").unwrap();
}

const FASTQC_RAW_DIR: &str = "QC/FASTQC/RAW";
const FASTQC_TRIMMED_DIR: &str = "QC/FASTQC/TRIMMED";
const MULTIQC_RAW_DIR: &str = "QC/MULTIQC/RAW";
const MULTIQC_TRIMMED_DIR: &str = "QC/MULTIQC/TRIMMED";
const MULTIQC_REPORT: &str = "multiqc_report.html";
const TRIMMED_DIR: &str = "TRIMMED";
const BAM_DIR: &str = "BAM";
const HOMER_DIR: &str = "HOMER";

/// A class of file derived from the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Sequencing,
    FastqRaw,
    FastqcRaw,
    MultiqcRaw,
    Cutadapt,
    FastqcTrimmed,
    MultiqcTrimmed,
    Bam,
    Bedgraph,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 9] = [
        ArtifactKind::Sequencing,
        ArtifactKind::FastqRaw,
        ArtifactKind::FastqcRaw,
        ArtifactKind::MultiqcRaw,
        ArtifactKind::Cutadapt,
        ArtifactKind::FastqcTrimmed,
        ArtifactKind::MultiqcTrimmed,
        ArtifactKind::Bam,
        ArtifactKind::Bedgraph,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ArtifactKind::Sequencing => "sequencing",
            ArtifactKind::FastqRaw => "fastq_raw",
            ArtifactKind::FastqcRaw => "fastqc_raw",
            ArtifactKind::MultiqcRaw => "multiqc_raw",
            ArtifactKind::Cutadapt => "cutadapt",
            ArtifactKind::FastqcTrimmed => "fastqc_trimmed",
            ArtifactKind::MultiqcTrimmed => "multiqc_trimmed",
            ArtifactKind::Bam => "bam",
            ArtifactKind::Bedgraph => "bedgraph",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownArtifactKind(pub String);

impl fmt::Display for UnknownArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown artifact kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownArtifactKind {}

impl FromStr for ArtifactKind {
    type Err = UnknownArtifactKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKind::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == s)
            .ok_or_else(|| UnknownArtifactKind(s.to_string()))
    }
}

/// Final component of a declared FASTQ path.
fn basename(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file)
}

/// Name of the FastQC HTML report for a FASTQ file:
/// `x_R1_001.fastq.gz` and `x_R1_001.fastq` both give `x_R1_001_fastqc.html`.
pub fn fastqc_report_name(fastq: &str) -> String {
    let name = basename(fastq);
    let stem = match FASTQ_SUFFIX.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    };
    format!("{}_fastqc.html", stem)
}

/// Append the paths of `kind` for one run to `out`.
fn run_artifacts(run_name: &str, run: &SequencingRun, kind: ArtifactKind, out: &mut Vec<PathBuf>) {
    let base = Path::new(&run.path);
    match kind {
        ArtifactKind::Sequencing => out.push(base.to_path_buf()),
        ArtifactKind::FastqRaw => out.extend(run.fastqs().map(|f| base.join(f))),
        ArtifactKind::FastqcRaw => out.extend(
            run.fastqs()
                .map(|f| base.join(FASTQC_RAW_DIR).join(fastqc_report_name(f))),
        ),
        ArtifactKind::MultiqcRaw => out.push(base.join(MULTIQC_RAW_DIR).join(MULTIQC_REPORT)),
        ArtifactKind::Cutadapt => out.extend(run.fastqs().map(|f| base.join(TRIMMED_DIR).join(basename(f)))),
        ArtifactKind::FastqcTrimmed => out.extend(
            run.fastqs()
                .map(|f| base.join(FASTQC_TRIMMED_DIR).join(fastqc_report_name(f))),
        ),
        ArtifactKind::MultiqcTrimmed => out.push(base.join(MULTIQC_TRIMMED_DIR).join(MULTIQC_REPORT)),
        ArtifactKind::Bam => out.extend(
            run.read_pairs()
                .map(|(name, _)| base.join(BAM_DIR).join(format!("{}.bam", name))),
        ),
        ArtifactKind::Bedgraph => out.push(base.join(HOMER_DIR).join(format!("{}.bedgraph", run_name))),
    }
}

/// The FASTQ pair the aligner reads for one sample or input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentInput {
    pub name: String,
    pub r1: PathBuf,
    pub r2: PathBuf,
    /// True when the files are the adapter-trimmed copies.
    pub trimmed: bool,
}

impl Configuration {
    /// Paths of `kind` for every run in document order, or for `run` only.
    /// An unknown run yields an empty list and a diagnostic.
    pub fn artifact_paths(&self, kind: ArtifactKind, run: Option<&str>) -> Reported<Vec<PathBuf>> {
        let mut diags = Diagnostics::new();
        let mut paths = Vec::new();

        match run {
            None => {
                for (name, run) in &self.sequencing {
                    run_artifacts(name, run, kind, &mut paths);
                }
            }
            Some(name) => match self.sequencing.get(name) {
                Some(run) => run_artifacts(name, run, kind, &mut paths),
                None => diags.warn(
                    DiagnosticKind::RunNotFound,
                    name,
                    format!("the configuration doesn't contain a '{}' sequencing", name),
                ),
            },
        }

        Reported::new(paths, diags)
    }

    /// The aligner's FASTQ inputs for one run: trimmed copies when the run
    /// declares adapters, the raw files otherwise. Pairs missing a strand
    /// are skipped.
    pub fn alignment_inputs(&self, run_name: &str) -> Reported<Vec<AlignmentInput>> {
        let mut diags = Diagnostics::new();
        let run = match self.sequencing.get(run_name) {
            Some(run) => run,
            None => {
                diags.warn(
                    DiagnosticKind::RunNotFound,
                    run_name,
                    format!("the configuration doesn't contain a '{}' sequencing", run_name),
                );
                return Reported::new(Vec::new(), diags);
            }
        };

        let base = Path::new(&run.path);
        let trimmed = run.trims_adapters();
        let locate = |file: &str| {
            if trimmed {
                base.join(TRIMMED_DIR).join(basename(file))
            } else {
                base.join(file)
            }
        };

        let inputs = run
            .read_pairs()
            .filter_map(|(name, pair)| {
                Some(AlignmentInput {
                    name: name.clone(),
                    r1: locate(pair.get(Strand::R1)?),
                    r2: locate(pair.get(Strand::R2)?),
                    trimmed,
                })
            })
            .collect();
        Reported::new(inputs, diags)
    }

    /// Check that every declared FASTQ exists on disk. Each missing file is
    /// reported; the value is true when nothing is missing.
    pub fn check_fastqs_exist(&self) -> Reported<bool> {
        let mut diags = Diagnostics::new();
        for (run_name, run) in &self.sequencing {
            let base = Path::new(&run.path);
            for (pair_name, pair) in run.read_pairs() {
                for (strand, file) in pair.files() {
                    let path = base.join(file);
                    if !path.exists() {
                        diags.warn(
                            DiagnosticKind::MissingFile,
                            path.display().to_string(),
                            format!(
                                "'{}' in sequencing '{}': {} file '{}' does not exist",
                                pair_name,
                                run_name,
                                strand,
                                path.display()
                            ),
                        );
                    }
                }
            }
        }
        let all_exist = diags.is_empty();
        Reported::new(all_exist, diags)
    }
}

/// Paths of the artifact tagged `kind`, for all runs or one. An
/// unrecognized tag or run name is reported and yields an empty list.
pub fn derive_paths(cfg: &Configuration, kind: &str, run: Option<&str>) -> Reported<Vec<PathBuf>> {
    match kind.parse::<ArtifactKind>() {
        Ok(kind) => cfg.artifact_paths(kind, run),
        Err(e) => {
            let mut diags = Diagnostics::new();
            diags.warn(DiagnosticKind::UnknownArtifactKind, kind, e.to_string());
            Reported::new(Vec::new(), diags)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{create_example, ExampleParams, ReadPair, Sample};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert_eq, proptest};

    fn small() -> Configuration {
        let mut cfg = Configuration::default();
        let mut run = SequencingRun::new("/data/RUN1/");
        run.samples.insert(
            "a".to_string(),
            Sample::new("FASTQ/a_R1.fastq.gz", "FASTQ/a_R2.fastq", "H3K27AC"),
        );
        let mut inputs = IndexMap::new();
        inputs.insert("ctl".to_string(), ReadPair::new("/abs/ctl_R1.fastq.gz", "ctl_R2.fastq.gz"));
        run.input = Some(inputs);
        cfg.sequencing.insert("RUN1".to_string(), run);
        cfg.sequencing.insert("RUN2".to_string(), SequencingRun::new("/data/RUN2"));
        cfg
    }

    fn strings(paths: Vec<PathBuf>) -> Vec<String> {
        paths.into_iter().map(|p| p.display().to_string()).collect()
    }

    fn run1(kind: &str) -> Vec<String> {
        let r = derive_paths(&small(), kind, Some("RUN1"));
        assert!(r.diagnostics.is_empty());
        strings(r.value)
    }

    #[test]
    fn fastqc_names() {
        assert_eq!(fastqc_report_name("a_R1.fastq.gz"), "a_R1_fastqc.html");
        assert_eq!(fastqc_report_name("a_R1.fastq"), "a_R1_fastqc.html");
        assert_eq!(fastqc_report_name("dir/a_R1.fq.gz"), "a_R1_fastqc.html");
        // Only one suffix is stripped.
        assert_eq!(fastqc_report_name("a.fastq.fastq.gz"), "a.fastq_fastqc.html");
        assert_eq!(fastqc_report_name("reads.bam"), "reads.bam_fastqc.html");
    }

    #[test]
    fn kinds_round_trip_through_tags() {
        for kind in ArtifactKind::ALL {
            assert_eq!(kind.tag().parse::<ArtifactKind>(), Ok(kind));
        }
        assert!("fastq".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn sequencing_and_reports() {
        assert_eq!(run1("sequencing"), vec!["/data/RUN1/"]);
        assert_eq!(run1("multiqc_raw"), vec!["/data/RUN1/QC/MULTIQC/RAW/multiqc_report.html"]);
        assert_eq!(
            run1("multiqc_trimmed"),
            vec!["/data/RUN1/QC/MULTIQC/TRIMMED/multiqc_report.html"]
        );
        assert_eq!(run1("bedgraph"), vec!["/data/RUN1/HOMER/RUN1.bedgraph"]);
    }

    #[test]
    fn raw_fastqs_samples_then_inputs() {
        assert_eq!(
            run1("fastq_raw"),
            vec![
                "/data/RUN1/FASTQ/a_R1.fastq.gz",
                "/data/RUN1/FASTQ/a_R2.fastq",
                "/abs/ctl_R1.fastq.gz",
                "/data/RUN1/ctl_R2.fastq.gz",
            ]
        );
    }

    #[test]
    fn fastqc_paths() {
        assert_eq!(
            run1("fastqc_raw"),
            vec![
                "/data/RUN1/QC/FASTQC/RAW/a_R1_fastqc.html",
                "/data/RUN1/QC/FASTQC/RAW/a_R2_fastqc.html",
                "/data/RUN1/QC/FASTQC/RAW/ctl_R1_fastqc.html",
                "/data/RUN1/QC/FASTQC/RAW/ctl_R2_fastqc.html",
            ]
        );
        assert_eq!(
            run1("fastqc_trimmed")[0],
            "/data/RUN1/QC/FASTQC/TRIMMED/a_R1_fastqc.html"
        );
    }

    #[test]
    fn trimmed_and_bam_paths() {
        assert_eq!(
            run1("cutadapt"),
            vec![
                "/data/RUN1/TRIMMED/a_R1.fastq.gz",
                "/data/RUN1/TRIMMED/a_R2.fastq",
                "/data/RUN1/TRIMMED/ctl_R1.fastq.gz",
                "/data/RUN1/TRIMMED/ctl_R2.fastq.gz",
            ]
        );
        assert_eq!(run1("bam"), vec!["/data/RUN1/BAM/a.bam", "/data/RUN1/BAM/ctl.bam"]);
    }

    #[test]
    fn all_runs_in_document_order() {
        let r = derive_paths(&small(), "sequencing", None);
        assert_eq!(strings(r.value), vec!["/data/RUN1/", "/data/RUN2"]);

        let r = derive_paths(&small(), "bedgraph", None);
        assert_eq!(
            strings(r.value),
            vec!["/data/RUN1/HOMER/RUN1.bedgraph", "/data/RUN2/HOMER/RUN2.bedgraph"]
        );
    }

    #[test]
    fn every_kind_for_every_query() {
        let cfg = create_example(&ExampleParams::default());
        for kind in ArtifactKind::ALL {
            let all = cfg.artifact_paths(kind, None).value;
            let mut per_run = Vec::new();
            for name in cfg.sequencing.keys() {
                per_run.extend(cfg.artifact_paths(kind, Some(name)).value);
            }
            assert_eq!(all, per_run, "{}", kind);
            assert!(!all.is_empty());
        }
    }

    #[test]
    fn lookup_misses_are_reported() {
        let r = derive_paths(&small(), "peaks", None);
        assert!(r.value.is_empty());
        assert!(r.diagnostics.contains(DiagnosticKind::UnknownArtifactKind, "peaks"));

        let r = derive_paths(&small(), "bam", Some("RUN9"));
        assert!(r.value.is_empty());
        assert!(r.diagnostics.contains(DiagnosticKind::RunNotFound, "RUN9"));
    }

    #[test]
    fn alignment_inputs_follow_trimming() {
        let cfg = small();
        let raw = cfg.alignment_inputs("RUN1").value;
        assert_eq!(raw[0].r1, PathBuf::from("/data/RUN1/FASTQ/a_R1.fastq.gz"));
        assert!(!raw[0].trimmed);

        let example = create_example(&ExampleParams::default());
        let trimmed = example.alignment_inputs("MO211").value;
        assert_eq!(trimmed.len(), 2);
        assert!(trimmed[0].trimmed);
        assert_eq!(
            trimmed[0].r1,
            PathBuf::from("/scratch/chromake/MO211/TRIMMED/USP7-YVL_S20_R1_001.fastq.gz")
        );
    }

    #[test]
    fn missing_fastqs_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Configuration::default();
        let mut run = SequencingRun::new(dir.path().display().to_string());
        run.samples.insert("a".to_string(), Sample::new("a_R1.fastq.gz", "a_R2.fastq.gz", "ATAC"));
        cfg.sequencing.insert("RUN1".to_string(), run);

        std::fs::write(dir.path().join("a_R1.fastq.gz"), b"").unwrap();
        let r = cfg.check_fastqs_exist();
        assert!(!r.value);
        assert_eq!(r.diagnostics.len(), 1);

        std::fs::write(dir.path().join("a_R2.fastq.gz"), b"").unwrap();
        let r = cfg.check_fastqs_exist();
        assert!(r.value);
        assert!(r.diagnostics.is_empty());
    }

    proptest! {
        #[test]
        fn prop_gz_and_plain_fastq_match(ref stem in "[A-Za-z0-9_-]{1,20}") {
            let gz = fastqc_report_name(&format!("{}.fastq.gz", stem));
            let plain = fastqc_report_name(&format!("{}.fastq", stem));
            prop_assert_eq!(&gz, &plain);
            prop_assert_eq!(gz, format!("{}_fastqc.html", stem));
        }
    }
}
