//! The consistency pass run after every mutation.

use itertools::Itertools;

use super::Configuration;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

impl Configuration {
    /// Repair what can be repaired and report the rest:
    /// 1. drop runs with neither samples nor input,
    /// 2. drop empty `INPUT` mappings,
    /// 3. warn about ChIP runs without a complete input control, and about
    ///    samples missing a FASTQ,
    /// 4. restrict each project's `SEQUENCING` to existing runs that still
    ///    hold a sample of the project's mark,
    /// 5. drop projects left without runs.
    ///
    /// Never fails, and applying it twice is the same as applying it once.
    pub fn validate_and_clean(&mut self) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.clean_into(&mut diags);
        diags
    }

    pub(crate) fn clean_into(&mut self, diags: &mut Diagnostics) {
        self.drop_empty_runs(diags);
        self.drop_empty_inputs(diags);
        self.check_read_pairs(diags);
        self.reconcile_projects(diags);
    }

    fn drop_empty_runs(&mut self, diags: &mut Diagnostics) {
        self.sequencing.retain(|name, run| {
            let keep = run.has_reads();
            if !keep {
                diags.info(
                    DiagnosticKind::RunRemoved,
                    name.as_str(),
                    format!("removed sequencing '{}' as it has no samples or inputs", name),
                );
            }
            keep
        });
    }

    fn drop_empty_inputs(&mut self, diags: &mut Diagnostics) {
        for (name, run) in self.sequencing.iter_mut() {
            if run.input.as_ref().map_or(false, |i| i.is_empty()) {
                run.input = None;
                diags.info(
                    DiagnosticKind::EmptyInputRemoved,
                    name.as_str(),
                    format!("removed the empty INPUT field of sequencing '{}'", name),
                );
            }
        }
    }

    fn check_read_pairs(&self, diags: &mut Diagnostics) {
        for (run_name, run) in &self.sequencing {
            let chip = run.has_chip_samples();

            if chip && run.input.is_none() {
                diags.warn(
                    DiagnosticKind::MissingInput,
                    run_name.as_str(),
                    format!(
                        "sequencing '{}' contains ChIP-seq samples but its INPUT field is missing",
                        run_name
                    ),
                );
            }

            for (input_name, pair) in run.inputs() {
                if pair.is_complete() {
                    continue;
                }
                let (kind, message) = if chip {
                    (
                        DiagnosticKind::MissingInput,
                        format!(
                            "sequencing '{}' contains ChIP-seq samples but INPUT '{}' lacks R1 or R2",
                            run_name, input_name
                        ),
                    )
                } else {
                    (
                        DiagnosticKind::IncompleteReadPair,
                        format!("INPUT '{}' of sequencing '{}' lacks R1 or R2", input_name, run_name),
                    )
                };
                diags.warn(kind, format!("{}/{}", run_name, input_name), message);
            }

            for (sample_name, sample) in &run.samples {
                if !sample.reads.is_complete() {
                    diags.warn(
                        DiagnosticKind::IncompleteReadPair,
                        format!("{}/{}", run_name, sample_name),
                        format!("sample '{}' of sequencing '{}' lacks R1 or R2", sample_name, run_name),
                    );
                }
            }
        }
    }

    fn reconcile_projects(&mut self, diags: &mut Diagnostics) {
        let runs = &self.sequencing;
        self.projects.retain(|name, project| {
            let kept: Vec<String> = project
                .sequencing
                .iter()
                .filter(|r| runs.get(*r).map_or(false, |run| run.has_mark(&project.mark)))
                .unique()
                .cloned()
                .collect();

            if kept != project.sequencing {
                diags.info(
                    DiagnosticKind::ProjectRunsUpdated,
                    name.as_str(),
                    format!(
                        "updated project '{}' to reflect current sequencing: [{}]",
                        name,
                        kept.iter().join(", ")
                    ),
                );
                project.sequencing = kept;
            }

            if project.sequencing.is_empty() {
                diags.info(
                    DiagnosticKind::ProjectRemoved,
                    name.as_str(),
                    format!("removed project '{}' as it has no valid sequencing", name),
                );
                return false;
            }
            true
        });
    }
}
