//! In-place updates of a loaded configuration. Each update ends with the
//! consistency pass, so the document is always left clean.

use super::{Configuration, JobsPolicy};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

impl Configuration {
    /// Merge a partial `JOBS` payload.
    ///
    /// Core counts present in `partial` are created or overwritten. The tier
    /// table is upserted per tier: tiers named in `partial` get its
    /// `MaxWall` (and `QOS` / `PARTITION` when given), tiers it doesn't
    /// name are left alone. A target without a tier table takes the
    /// payload's table as is.
    pub fn merge_jobs(&mut self, partial: &JobsPolicy) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for (step, cores) in &partial.cores_per_jobs {
            self.jobs.cores_per_jobs.insert(step.clone(), *cores);
            diags.info(
                DiagnosticKind::JobsUpdated,
                step.as_str(),
                format!("set CORES_PER_JOBS {} to {}", step, cores),
            );
        }

        if let Some(tiers) = &partial.tiers {
            let target = self.jobs.tiers.get_or_insert_with(Default::default);
            for (name, tier) in tiers {
                match target.get_mut(name) {
                    Some(existing) => {
                        existing.max_wall = tier.max_wall;
                        if tier.qos.is_some() {
                            existing.qos = tier.qos.clone();
                        }
                        if tier.partition.is_some() {
                            existing.partition = tier.partition.clone();
                        }
                    }
                    None => {
                        target.insert(name.clone(), tier.clone());
                    }
                }
                diags.info(
                    DiagnosticKind::JobsUpdated,
                    name.as_str(),
                    format!("set QOS_INFOS {} MaxWall to {}", name, tier.max_wall),
                );
            }
        }

        self.clean_into(&mut diags);
        diags
    }

    /// Delete a sequencing run, then clean the projects that referenced it.
    pub fn remove_run(&mut self, name: &str) -> Diagnostics {
        let mut diags = Diagnostics::new();

        if self.sequencing.shift_remove(name).is_some() {
            diags.info(
                DiagnosticKind::RunRemoved,
                name,
                format!("removed sequencing '{}'", name),
            );
        } else {
            diags.warn(
                DiagnosticKind::RunNotFound,
                name,
                format!("sequencing '{}' not found", name),
            );
        }

        self.clean_into(&mut diags);
        diags
    }

    /// Delete samples from a run. A run left with neither samples nor
    /// input is removed entirely.
    pub fn remove_samples<S: AsRef<str>>(&mut self, run_name: &str, samples: &[S]) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let run = match self.sequencing.get_mut(run_name) {
            Some(run) => run,
            None => {
                diags.warn(
                    DiagnosticKind::RunNotFound,
                    run_name,
                    format!("sequencing '{}' not found", run_name),
                );
                return diags;
            }
        };

        let had_samples = !run.samples.is_empty();
        for sample in samples {
            let sample = sample.as_ref();
            let entity = format!("{}/{}", run_name, sample);
            if run.samples.shift_remove(sample).is_some() {
                diags.info(
                    DiagnosticKind::SampleRemoved,
                    entity,
                    format!("removed sample '{}' from sequencing '{}'", sample, run_name),
                );
            } else {
                diags.warn(
                    DiagnosticKind::SampleNotFound,
                    entity,
                    format!("sample '{}' not found in sequencing '{}'", sample, run_name),
                );
            }
        }

        if had_samples && run.samples.is_empty() {
            diags.info(
                DiagnosticKind::SamplesEmptied,
                run_name,
                format!("no samples left in sequencing '{}', removing SAMPLES", run_name),
            );
        }

        if run.has_reads() {
            self.clean_into(&mut diags);
        } else {
            diags.extend(self.remove_run(run_name));
        }
        diags
    }
}
