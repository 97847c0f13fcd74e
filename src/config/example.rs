//! A fully populated template configuration.

use indexmap::IndexMap;
use std::num::NonZeroU32;

use super::{Configuration, JobsPolicy, Mark, Project, ReadPair, Sample, SequencingRun, Tier};

const CHIP_R1_ADAPTOR: &str = "AGATCGGAAGAGCACACGTCTGAACTCCAGTCA";
const CHIP_R2_ADAPTOR: &str = "AGATCGGAAGAGCGTCGTGTAGGGAAAGAGTGT";
const NEXTERA_ADAPTOR: &str = "CTGTCTCTTATACACATCT";
const CUTADAPT_OPTIONS: &str = "-q 20 --pair-filter=any";

const DEFAULT_MIN_SAMPLES_FOR_PEAKS: NonZeroU32 = match NonZeroU32::new(2) {
    Some(n) => n,
    None => panic!("zero"),
};

/// Knobs for `create_example`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExampleParams {
    /// Directory holding one sub-directory per run and per project.
    pub root: String,
    /// Peak calling needs at least one sample.
    pub min_samples_for_peaks: NonZeroU32,
}

impl Default for ExampleParams {
    fn default() -> Self {
        ExampleParams {
            root: "/scratch/chromake".to_string(),
            min_samples_for_peaks: DEFAULT_MIN_SAMPLES_FOR_PEAKS,
        }
    }
}

fn fastq_pair(prefix: &str) -> (String, String) {
    (
        format!("FASTQ/{}_R1_001.fastq.gz", prefix),
        format!("FASTQ/{}_R2_001.fastq.gz", prefix),
    )
}

fn chip_run(path: String, samples: &[(&str, &str, &str)], input: (&str, &str)) -> SequencingRun {
    let mut run = SequencingRun::new(path);
    for &(name, prefix, mark) in samples {
        let (r1, r2) = fastq_pair(prefix);
        run.samples.insert(name.to_string(), Sample::new(r1, r2, mark));
    }
    let (r1, r2) = fastq_pair(input.1);
    let mut inputs = IndexMap::new();
    inputs.insert(input.0.to_string(), ReadPair::new(r1, r2));
    run.input = Some(inputs);
    run.r1_adaptor = Some(CHIP_R1_ADAPTOR.to_string());
    run.r2_adaptor = Some(CHIP_R2_ADAPTOR.to_string());
    run.parameters.insert("CUTADAPT".to_string(), CUTADAPT_OPTIONS.to_string());
    run
}

/// Build a template with two ChIP-seq runs (with input controls), one
/// ATAC-seq run, one project per mark and a three tier job policy.
/// The result is consistent: `validate_and_clean` changes nothing.
pub fn create_example(params: &ExampleParams) -> Configuration {
    let root = params.root.trim_end_matches('/');
    let run_path = |run: &str| format!("{}/{}/", root, run);

    let mut cfg = Configuration::default();

    cfg.sequencing.insert(
        "MO203".to_string(),
        chip_run(
            run_path("MO203"),
            &[
                ("H3K27ac_BAP1", "H3K27ac_BAP1_111", "H3K27AC"),
                ("Hub2A_PSMC5_D4", "Hub2A_PSMD6_F1Ci", "H2AUB"),
                ("H3K27me3_PSMC5_D4", "H3K27me3_PSMC5_D4", "H3K27ME3"),
                ("Hub2A_USP7_CM", "Hub2A_USP7_Fa", "H2AUB"),
            ],
            ("Input_Batch1", "Input_Batch1"),
        ),
    );

    cfg.sequencing.insert(
        "MO208".to_string(),
        chip_run(
            run_path("MO208"),
            &[
                ("H3K27ac_BAP1_AC", "H3K27ac_BAP1_AC_S18", "H3K27AC"),
                ("H3K27ac_BAP1_HF", "H3K27ac_BAP1_HF_S42", "H3K27AC"),
                ("Hub2A_USP7_MaVL", "Hub2A_USP7_MaVL_S34", "H2AUB"),
            ],
            ("Input_Batch2", "Input_BATCH2_S2"),
        ),
    );

    let mut atac = SequencingRun::new(run_path("MO211"));
    for (name, prefix) in [("USP7-YVL_S20", "USP7-YVL_S20"), ("BAP1-111_S27", "BAP1-111_S27")] {
        let (r1, r2) = fastq_pair(prefix);
        atac.samples.insert(name.to_string(), Sample::new(r1, r2, "ATAC"));
    }
    atac.r1_adaptor = Some(NEXTERA_ADAPTOR.to_string());
    atac.r2_adaptor = Some(NEXTERA_ADAPTOR.to_string());
    atac.parameters.insert("CUTADAPT".to_string(), CUTADAPT_OPTIONS.to_string());
    cfg.sequencing.insert("MO211".to_string(), atac);

    let projects: [(&str, &str, &[&str]); 4] = [
        ("ChIP_H3K27AC", "H3K27AC", &["MO203", "MO208"]),
        ("ChIP_H3K27ME3", "H3K27ME3", &["MO203"]),
        ("ChIP_H2AUB", "H2AUB", &["MO203", "MO208"]),
        ("ChIP_ATAC", "ATAC", &["MO211"]),
    ];
    for (name, mark, runs) in projects {
        cfg.projects.insert(
            name.to_string(),
            Project {
                sequencing: runs.iter().map(|r| r.to_string()).collect(),
                mark: Mark::from(mark),
                min_samples_for_peaks: params.min_samples_for_peaks.get(),
                project_path: format!("{}/{}", root, name),
            },
        );
    }

    let mut jobs = JobsPolicy::default();
    for (step, cores) in [("FASTQC", 10), ("CUTADAPT", 10), ("BOWTIE2", 30)] {
        jobs.cores_per_jobs.insert(step.to_string(), cores);
    }
    let mut tiers = IndexMap::new();
    tiers.insert("short".to_string(), Tier::new(24 * 60));
    tiers.insert("medium".to_string(), Tier::new(3 * 24 * 60));
    tiers.insert("long".to_string(), Tier::new(8 * 24 * 60));
    jobs.tiers = Some(tiers);
    cfg.jobs = jobs;

    cfg
}
