//! proptest strategies for configurations, shared by the test modules.

use proptest::prelude::*;

use super::{Configuration, Mark, Project, ReadPair, Sample, SequencingRun};

pub(crate) const MARKS: [&str; 4] = ["H3K27AC", "H3K27ME3", "H2AUB", "ATAC"];
pub(crate) const RUNS: [&str; 4] = ["RUN_A", "RUN_B", "RUN_C", "RUN_D"];

prop_compose! {
    pub(crate) fn arb_run()(
        marks in prop::collection::vec(0..MARKS.len(), 0..4),
        input in prop::option::of(prop::collection::vec(any::<bool>(), 0..3)),
    ) -> SequencingRun {
        let mut run = SequencingRun::new("/data/run/");
        for (i, m) in marks.into_iter().enumerate() {
            let name = format!("s{}", i);
            run.samples.insert(
                name.clone(),
                Sample::new(format!("{}_R1.fastq.gz", name), format!("{}_R2.fastq.gz", name), MARKS[m]),
            );
        }
        run.input = input.map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, complete)| {
                    let pair = ReadPair {
                        r1: Some(format!("in{}_R1.fastq.gz", i)),
                        r2: if complete { Some(format!("in{}_R2.fastq.gz", i)) } else { None },
                    };
                    (format!("in{}", i), pair)
                })
                .collect()
        });
        run
    }
}

prop_compose! {
    pub(crate) fn arb_config()(
        runs in prop::collection::vec(prop::option::of(arb_run()), RUNS.len()),
        projects in prop::collection::vec(
            (0..MARKS.len(), prop::collection::vec(0..RUNS.len() + 1, 0..5)),
            0..4,
        ),
    ) -> Configuration {
        let mut cfg = Configuration::default();
        for (name, run) in RUNS.iter().zip(runs) {
            if let Some(run) = run {
                cfg.sequencing.insert(name.to_string(), run);
            }
        }
        for (i, (mark, refs)) in projects.into_iter().enumerate() {
            let sequencing = refs
                .into_iter()
                .map(|r| RUNS.get(r).map_or("UNKNOWN".to_string(), |n| n.to_string()))
                .collect();
            cfg.projects.insert(
                format!("project{}", i),
                Project {
                    sequencing,
                    mark: Mark::from(MARKS[mark]),
                    min_samples_for_peaks: 2,
                    project_path: format!("/data/project{}", i),
                },
            );
        }
        cfg
    }
}
