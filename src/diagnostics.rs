//! Collected, structured diagnostics.
//!
//! Cleanup passes, path lookups and the sample sheet transcoder never fail
//! on data-quality problems. Instead they record a `Diagnostic` per event
//! and hand the whole list back to the caller, who decides whether to log
//! it, show it, or assert on it.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
}

/// What happened. Each variant names the entity kind in `Diagnostic::entity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Run dropped because it had neither samples nor input.
    RunRemoved,
    /// Empty `INPUT` mapping dropped from a run.
    EmptyInputRemoved,
    /// Run holds ChIP-marked samples but declares no usable input control.
    MissingInput,
    /// A sample or input lacks its `R1` or `R2` file.
    IncompleteReadPair,
    /// A project's `SEQUENCING` list was rewritten.
    ProjectRunsUpdated,
    /// Project dropped because no run still feeds it.
    ProjectRemoved,
    RunNotFound,
    SampleRemoved,
    SampleNotFound,
    /// The last sample of a run was removed and `SAMPLES` dropped.
    SamplesEmptied,
    UnknownArtifactKind,
    /// A `JOBS` entry was created or overwritten.
    JobsUpdated,
    /// An absolute path could not be made relative to its run `PATH`.
    PathPrefixUnresolved,
    /// A sample sheet row refers to a project without a known path.
    UnknownProject,
    /// A sample sheet row refers to a run without metadata.
    UnknownRunMetadata,
    /// A sample sheet row has a `STRAND` other than R1/R2.
    UnknownStrand,
    MissingFile,
    /// An engine option was out of range and replaced or dropped.
    OptionAdjusted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Name of the run, project, sample, tier or file concerned.
    pub entity: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Ordered list of diagnostics produced by one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, kind: DiagnosticKind, entity: impl Into<String>, message: String) {
        self.push(Diagnostic {
            kind,
            severity: Severity::Info,
            entity: entity.into(),
            message,
        });
    }

    pub fn warn(&mut self, kind: DiagnosticKind, entity: impl Into<String>, message: String) {
        self.push(Diagnostic {
            kind,
            severity: Severity::Warning,
            entity: entity.into(),
            message,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Warning)
    }

    /// All diagnostics of one kind, in the order they were recorded.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn contains(&self, kind: DiagnosticKind, entity: &str) -> bool {
        self.of_kind(kind).any(|d| d.entity == entity)
    }

    /// Forward every diagnostic to the `log` facade.
    pub fn log(&self) {
        for d in &self.items {
            match d.severity {
                Severity::Info => log::info!("{}", d.message),
                Severity::Warning => log::warn!("{}", d.message),
            }
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A value computed without mutating anything, plus what was noticed on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct Reported<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Reported<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Reported { value, diagnostics }
    }

    pub fn into_parts(self) -> (T, Diagnostics) {
        (self.value, self.diagnostics)
    }
}
