//! Conversion between a `Configuration` and a flat sample sheet.
//!
//! A sample sheet has one row per sample (wide layout, `R1` and `R2`
//! columns) or one row per FASTQ file (long layout, `STRAND` and `PATH`
//! columns). Paths in a sheet are absolute; in the configuration they are
//! stored relative to the run's `PATH` whenever possible. Input controls
//! carry the pseudo-project `INPUT` and an empty `TYPE`.
//!
//! Sheets are stored as delimited text or as an Excel workbook.

use calamine::{open_workbook_auto, Reader};
use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::config::{Configuration, JobsPolicy, Mark, Project, ReadPair, Sample, SequencingRun, Strand};
use crate::diagnostics::{DiagnosticKind, Diagnostics, Reported};
use crate::error::{ConfigError, Result};
use crate::utils;

/// `PROJECT` value of input controls and of samples no project claims.
pub const INPUT_PROJECT: &str = "INPUT";

/// `MIN_SAMPLES_FOR_PEAKS` given to projects created from a sheet.
pub const DEFAULT_MIN_SAMPLES_FOR_PEAKS: u32 = 2;

/// Columns `read_table` requires.
pub const REQUIRED_COLUMNS: [&str; 6] = ["SAMPLE", "SEQUENCING", "PROJECT", "TYPE", "STRAND", "PATH"];

const WIDE_COLUMNS: [&str; 6] = ["SAMPLE", "SEQUENCING", "PROJECT", "TYPE", "R1", "R2"];

/// One sample per row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WideRow {
    #[serde(rename = "SAMPLE")]
    pub sample: String,
    #[serde(rename = "SEQUENCING")]
    pub sequencing: String,
    #[serde(rename = "PROJECT")]
    pub project: String,
    #[serde(rename = "TYPE")]
    pub mark: String,
    #[serde(rename = "R1")]
    pub r1: String,
    #[serde(rename = "R2")]
    pub r2: String,
}

/// One FASTQ file per row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LongRow {
    #[serde(rename = "SAMPLE")]
    pub sample: String,
    #[serde(rename = "SEQUENCING")]
    pub sequencing: String,
    #[serde(rename = "PROJECT")]
    pub project: String,
    #[serde(rename = "TYPE", default)]
    pub mark: String,
    #[serde(rename = "STRAND")]
    pub strand: String,
    #[serde(rename = "PATH")]
    pub path: String,
}

impl WideRow {
    fn fields(&self) -> [&str; 6] {
        [&self.sample, &self.sequencing, &self.project, &self.mark, &self.r1, &self.r2]
    }

    /// Split into one row per declared strand, R1 first.
    pub fn into_long(self) -> Vec<LongRow> {
        let WideRow {
            sample,
            sequencing,
            project,
            mark,
            r1,
            r2,
        } = self;
        [(Strand::R1, r1), (Strand::R2, r2)]
            .into_iter()
            .filter(|(_, path)| !path.is_empty())
            .map(|(strand, path)| LongRow {
                sample: sample.clone(),
                sequencing: sequencing.clone(),
                project: project.clone(),
                mark: mark.clone(),
                strand: strand.to_string(),
                path,
            })
            .collect()
    }
}

impl LongRow {
    fn fields(&self) -> [&str; 6] {
        [&self.sample, &self.sequencing, &self.project, &self.mark, &self.strand, &self.path]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Wide,
    Long,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleSheet {
    Wide(Vec<WideRow>),
    Long(Vec<LongRow>),
}

impl SampleSheet {
    pub fn len(&self) -> usize {
        match self {
            SampleSheet::Wide(rows) => rows.len(),
            SampleSheet::Long(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rows in long layout, whatever the layout of `self`.
    pub fn into_long(self) -> Vec<LongRow> {
        match self {
            SampleSheet::Wide(rows) => rows.into_iter().flat_map(WideRow::into_long).collect(),
            SampleSheet::Long(rows) => rows,
        }
    }
}

/// Run-level fields a sample sheet doesn't carry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct RunMetadata {
    #[serde(rename = "PATH")]
    pub path: String,
    #[serde(rename = "R1_ADAPTOR", default, skip_serializing_if = "Option::is_none")]
    pub r1_adaptor: Option<String>,
    #[serde(rename = "R2_ADAPTOR", default, skip_serializing_if = "Option::is_none")]
    pub r2_adaptor: Option<String>,
    #[serde(rename = "PARAMETERS", default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
}

impl From<&SequencingRun> for RunMetadata {
    fn from(run: &SequencingRun) -> Self {
        RunMetadata {
            path: run.path.clone(),
            r1_adaptor: run.r1_adaptor.clone(),
            r2_adaptor: run.r2_adaptor.clone(),
            parameters: run.parameters.clone(),
        }
    }
}

impl RunMetadata {
    fn new_run(&self) -> SequencingRun {
        SequencingRun {
            path: self.path.clone(),
            r1_adaptor: self.r1_adaptor.clone(),
            r2_adaptor: self.r2_adaptor.clone(),
            parameters: self.parameters.clone(),
            ..Default::default()
        }
    }
}

/// Absolute form of a declared file: joined onto the run `PATH` unless
/// already absolute.
fn absolute(run: &SequencingRun, file: Option<&str>) -> String {
    match file {
        None => String::new(),
        Some(f) if run.path.is_empty() || Path::new(f).is_absolute() => f.to_string(),
        Some(f) => Path::new(&run.path).join(f).display().to_string(),
    }
}

/// Flatten every run's samples and inputs into sheet rows.
///
/// A sample's `PROJECT` is the first project declared for its mark;
/// samples no project claims, and all inputs, get `INPUT`.
pub fn to_table(cfg: &Configuration, layout: Layout) -> SampleSheet {
    let mut rows = Vec::new();

    for (run_name, run) in &cfg.sequencing {
        for (name, sample) in &run.samples {
            let project = cfg
                .project_for_mark(&sample.mark)
                .map_or(INPUT_PROJECT, |(project, _)| project.as_str());
            rows.push(WideRow {
                sample: name.clone(),
                sequencing: run_name.clone(),
                project: project.to_string(),
                mark: sample.mark.to_string(),
                r1: absolute(run, sample.reads.get(Strand::R1)),
                r2: absolute(run, sample.reads.get(Strand::R2)),
            });
        }

        for (name, pair) in run.inputs() {
            rows.push(WideRow {
                sample: name.clone(),
                sequencing: run_name.clone(),
                project: INPUT_PROJECT.to_string(),
                mark: String::new(),
                r1: absolute(run, pair.get(Strand::R1)),
                r2: absolute(run, pair.get(Strand::R2)),
            });
        }
    }

    match layout {
        Layout::Wide => SampleSheet::Wide(rows),
        Layout::Long => SampleSheet::Wide(rows).into_long().into(),
    }
}

impl From<Vec<LongRow>> for SampleSheet {
    fn from(rows: Vec<LongRow>) -> Self {
        SampleSheet::Long(rows)
    }
}

/// Store `file` relative to the run `PATH` when it lies beneath it.
fn relative_to_run(file: &str, run_path: &str, entity: &str, diags: &mut Diagnostics) -> String {
    let p = Path::new(file);
    if run_path.is_empty() || !p.is_absolute() {
        return file.to_string();
    }
    match p.strip_prefix(run_path) {
        Ok(rel) => rel.display().to_string(),
        Err(_) => {
            diags.warn(
                DiagnosticKind::PathPrefixUnresolved,
                entity,
                format!(
                    "path {} does not start with the expected sequencing path {}, keeping absolute path",
                    file, run_path
                ),
            );
            file.to_string()
        }
    }
}

/// Rebuild a configuration from long-layout rows.
///
/// Rows are grouped by `SEQUENCING` in order of first appearance. Rows of
/// the `INPUT` project fill the run's `INPUT`, the others its `SAMPLES`.
/// Projects are created on first sight with the path from
/// `project_paths`, and list every run contributing a row. Run paths,
/// adapters and parameters come from `run_metadata`.
///
/// The result is not cleaned; callers run `validate_and_clean` before
/// persisting it.
pub fn from_table(
    rows: &[LongRow],
    project_paths: &IndexMap<String, String>,
    run_metadata: &IndexMap<String, RunMetadata>,
    jobs: Option<JobsPolicy>,
) -> Reported<Configuration> {
    let mut diags = Diagnostics::new();
    let mut cfg = Configuration {
        jobs: jobs.unwrap_or_default(),
        ..Default::default()
    };

    for row in rows {
        let entity = format!("{}/{}", row.sequencing, row.sample);

        let strand = match row.strand.parse::<Strand>() {
            Ok(strand) => strand,
            Err(e) => {
                diags.warn(
                    DiagnosticKind::UnknownStrand,
                    entity.as_str(),
                    format!("skipping row for '{}': {}", entity, e),
                );
                continue;
            }
        };
        if row.path.is_empty() {
            diags.warn(
                DiagnosticKind::IncompleteReadPair,
                entity.as_str(),
                format!("skipping row for '{}': empty {} PATH", entity, strand),
            );
            continue;
        }

        let run = cfg
            .sequencing
            .entry(row.sequencing.clone())
            .or_insert_with(|| match run_metadata.get(&row.sequencing) {
                Some(meta) => meta.new_run(),
                None => {
                    diags.warn(
                        DiagnosticKind::UnknownRunMetadata,
                        row.sequencing.as_str(),
                        format!("no PATH given for sequencing '{}'", row.sequencing),
                    );
                    SequencingRun::default()
                }
            });

        let file = relative_to_run(&row.path, &run.path, &entity, &mut diags);

        if row.project == INPUT_PROJECT {
            run.input
                .get_or_insert_with(IndexMap::new)
                .entry(row.sample.clone())
                .or_insert_with(ReadPair::default)
                .set(strand, file);
            continue;
        }

        let sample = run.samples.entry(row.sample.clone()).or_insert_with(|| Sample {
            reads: ReadPair::default(),
            mark: Mark::new(row.mark.clone()),
        });
        sample.mark = Mark::new(row.mark.clone());
        sample.reads.set(strand, file);

        let project = cfg
            .projects
            .entry(row.project.clone())
            .or_insert_with(|| {
                let project_path = match project_paths.get(&row.project) {
                    Some(path) => path.clone(),
                    None => {
                        diags.warn(
                            DiagnosticKind::UnknownProject,
                            row.project.as_str(),
                            format!("no PROJECT_PATH given for project '{}'", row.project),
                        );
                        String::new()
                    }
                };
                Project {
                    sequencing: Vec::new(),
                    mark: Mark::new(row.mark.clone()),
                    min_samples_for_peaks: DEFAULT_MIN_SAMPLES_FOR_PEAKS,
                    project_path,
                }
            });
        if !project.sequencing.contains(&row.sequencing) {
            project.sequencing.push(row.sequencing.clone());
        }
    }

    Reported::new(cfg, diags)
}

enum TableFormat {
    Delimited(u8),
    Spreadsheet,
}

/// Format of a sample sheet file from its extension. Legacy and
/// OpenDocument workbooks can be read but only `.xlsx` is written.
fn table_format(path: &Path, writing: bool) -> Result<TableFormat> {
    match utils::extension(path).as_deref() {
        Some("csv") => Ok(TableFormat::Delimited(b',')),
        Some("tsv") | Some("txt") => Ok(TableFormat::Delimited(b'\t')),
        Some("xlsx") => Ok(TableFormat::Spreadsheet),
        Some("xls") | Some("xlsm") | Some("ods") if !writing => Ok(TableFormat::Spreadsheet),
        Some(ext) => Err(ConfigError::UnsupportedFormat(format!(".{}", ext))),
        None => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Position of each required column in `headers`, failing with every
/// absent one.
fn required_column_indices(headers: &[String]) -> Result<[usize; 6]> {
    let mut indices = [0; 6];
    let mut missing = Vec::new();
    for (slot, column) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|h| h == column) {
            Some(i) => *slot = i,
            None => missing.push(column.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(ConfigError::MissingColumns(missing))
    }
}

/// Read a long-layout sample sheet: `.csv` (comma), `.tsv` / `.txt` (tab),
/// or the first worksheet of an `.xlsx`, `.xls`, `.xlsm` or `.ods`
/// workbook. Other columns are ignored.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<LongRow>> {
    let path = path.as_ref();
    let rows = match table_format(path, false)? {
        TableFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
        TableFormat::Spreadsheet => read_spreadsheet(path)?,
    };
    log::debug!("read {} sample sheet rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<LongRow>> {
    let file = File::open(path).map_err(|e| ConfigError::io(path, e))?;

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    required_column_indices(&headers)?;

    let rows = rdr.deserialize().collect::<std::result::Result<Vec<LongRow>, _>>()?;
    Ok(rows)
}

fn read_spreadsheet(path: &Path) -> Result<Vec<LongRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(ConfigError::MissingColumns(REQUIRED_COLUMNS.map(String::from).to_vec())),
    };

    let mut cells = range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect::<Vec<_>>());
    let headers = cells.next().unwrap_or_default();
    let columns = required_column_indices(&headers)?;

    let rows = cells
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            let cell = |i: usize| row.get(columns[i]).cloned().unwrap_or_default();
            LongRow {
                sample: cell(0),
                sequencing: cell(1),
                project: cell(2),
                mark: cell(3),
                strand: cell(4),
                path: cell(5),
            }
        })
        .collect();
    Ok(rows)
}

/// Write a sample sheet as `.csv`, `.tsv` / `.txt` or `.xlsx`, following
/// the extension of `path`.
pub fn write_table(sheet: &SampleSheet, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let buf = match table_format(path, true)? {
        TableFormat::Delimited(delimiter) => delimited_bytes(sheet, delimiter, path)?,
        TableFormat::Spreadsheet => spreadsheet_bytes(sheet)?,
    };
    utils::write_atomically(path, &buf)
}

fn delimited_bytes(sheet: &SampleSheet, delimiter: u8, path: &Path) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(&mut buf);
        match sheet {
            SampleSheet::Wide(rows) if rows.is_empty() => wtr.write_record(WIDE_COLUMNS)?,
            SampleSheet::Long(rows) if rows.is_empty() => wtr.write_record(REQUIRED_COLUMNS)?,
            SampleSheet::Wide(rows) => {
                for row in rows {
                    wtr.serialize(row)?;
                }
            }
            SampleSheet::Long(rows) => {
                for row in rows {
                    wtr.serialize(row)?;
                }
            }
        }
        wtr.flush().map_err(|e| ConfigError::io(path, e))?;
    }
    Ok(buf)
}

/// One worksheet: a header row, then one row per record. Empty fields are
/// left as blank cells.
fn spreadsheet_bytes(sheet: &SampleSheet) -> Result<Vec<u8>> {
    let (header, records): ([&str; 6], Vec<[&str; 6]>) = match sheet {
        SampleSheet::Wide(rows) => (WIDE_COLUMNS, rows.iter().map(WideRow::fields).collect()),
        SampleSheet::Long(rows) => (REQUIRED_COLUMNS, rows.iter().map(LongRow::fields).collect()),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (row, record) in (0u32..).zip(std::iter::once(header).chain(records)) {
        for (col, value) in (0u16..).zip(record) {
            if !value.is_empty() {
                worksheet.write_string(row, col, value)?;
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::testing::arb_config;
    use crate::config::{create_example, ExampleParams};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn example() -> Configuration {
        create_example(&ExampleParams::default())
    }

    fn metadata(cfg: &Configuration) -> (IndexMap<String, String>, IndexMap<String, RunMetadata>) {
        let projects = cfg
            .projects
            .iter()
            .map(|(name, p)| (name.clone(), p.project_path.clone()))
            .collect();
        let runs = cfg
            .sequencing
            .iter()
            .map(|(name, run)| (name.clone(), RunMetadata::from(run)))
            .collect();
        (projects, runs)
    }

    fn long_row(sample: &str, seq: &str, project: &str, mark: &str, strand: &str, path: &str) -> LongRow {
        LongRow {
            sample: sample.to_string(),
            sequencing: seq.to_string(),
            project: project.to_string(),
            mark: mark.to_string(),
            strand: strand.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn wide_rows() {
        let sheet = to_table(&example(), Layout::Wide);
        let rows = match sheet {
            SampleSheet::Wide(rows) => rows,
            other => panic!("expected wide rows, got {:?}", other),
        };
        // 4 + 1 rows for MO203, 3 + 1 for MO208, 2 for MO211
        assert_eq!(rows.len(), 11);
        assert_eq!(
            rows[0],
            WideRow {
                sample: "H3K27ac_BAP1".to_string(),
                sequencing: "MO203".to_string(),
                project: "ChIP_H3K27AC".to_string(),
                mark: "H3K27AC".to_string(),
                r1: "/scratch/chromake/MO203/FASTQ/H3K27ac_BAP1_111_R1_001.fastq.gz".to_string(),
                r2: "/scratch/chromake/MO203/FASTQ/H3K27ac_BAP1_111_R2_001.fastq.gz".to_string(),
            }
        );
        assert_eq!(rows[4].sample, "Input_Batch1");
        assert_eq!(rows[4].project, INPUT_PROJECT);
        assert_eq!(rows[4].mark, "");
    }

    #[test]
    fn long_rows_one_per_strand() {
        let sheet = to_table(&example(), Layout::Long);
        assert_eq!(sheet.len(), 22);
        let rows = sheet.into_long();
        assert_eq!(rows[0].strand, "R1");
        assert_eq!(rows[1].strand, "R2");
        assert_eq!(rows[0].sample, rows[1].sample);
    }

    #[test]
    fn absolute_paths_kept_and_unowned_samples_are_input() {
        let mut cfg = example();
        let run = cfg.sequencing.get_mut("MO211").unwrap();
        run.samples["USP7-YVL_S20"].reads.r1 = Some("/elsewhere/x_R1.fastq.gz".to_string());
        cfg.projects.shift_remove("ChIP_ATAC");

        let rows = to_table(&cfg, Layout::Wide).into_long();
        let usp7: Vec<_> = rows.iter().filter(|r| r.sample == "USP7-YVL_S20").collect();
        assert_eq!(usp7[0].path, "/elsewhere/x_R1.fastq.gz");
        assert_eq!(usp7[0].project, INPUT_PROJECT);
        assert_eq!(usp7[0].mark, "ATAC");
    }

    #[test]
    fn table_round_trip() {
        let cfg = example();
        let (projects, runs) = metadata(&cfg);
        let rows = to_table(&cfg, Layout::Long).into_long();

        let rebuilt = from_table(&rows, &projects, &runs, Some(cfg.jobs.clone()));
        assert!(rebuilt.diagnostics.is_empty(), "{:?}", rebuilt.diagnostics);
        assert_eq!(rebuilt.value, cfg);
    }

    #[test]
    fn round_trip_through_wide_layout() {
        let cfg = example();
        let (projects, runs) = metadata(&cfg);
        let rows = to_table(&cfg, Layout::Wide).into_long();
        let rebuilt = from_table(&rows, &projects, &runs, Some(cfg.jobs.clone()));
        assert_eq!(rebuilt.value, cfg);
    }

    #[test]
    fn unresolved_prefix_keeps_absolute_path() {
        let mut runs = IndexMap::new();
        runs.insert("RUN1".to_string(), RunMetadata {
            path: "/data/run1/".to_string(),
            ..Default::default()
        });
        let mut projects = IndexMap::new();
        projects.insert("atac".to_string(), "/data/atac".to_string());

        let rows = vec![
            long_row("s1", "RUN1", "atac", "ATAC", "R1", "/data/run1/FASTQ/s1_R1.fastq.gz"),
            long_row("s1", "RUN1", "atac", "ATAC", "R2", "/other/s1_R2.fastq.gz"),
            long_row("ctl", "RUN1", "INPUT", "", "R1", "ctl_R1.fastq.gz"),
        ];
        let r = from_table(&rows, &projects, &runs, None);
        let run = r.value.run("RUN1").unwrap();

        assert_eq!(run.samples["s1"].reads.r1.as_deref(), Some("FASTQ/s1_R1.fastq.gz"));
        assert_eq!(run.samples["s1"].reads.r2.as_deref(), Some("/other/s1_R2.fastq.gz"));
        assert_eq!(run.input.as_ref().unwrap()["ctl"].r1.as_deref(), Some("ctl_R1.fastq.gz"));
        assert!(r.diagnostics.contains(DiagnosticKind::PathPrefixUnresolved, "RUN1/s1"));
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.value.projects["atac"].min_samples_for_peaks, DEFAULT_MIN_SAMPLES_FOR_PEAKS);
        assert!(r.value.jobs.is_empty());
    }

    #[test]
    fn project_membership_is_a_set_union() {
        let rows = vec![
            long_row("a", "RUN2", "p", "H3K27AC", "R1", "a1"),
            long_row("b", "RUN1", "p", "H3K27AC", "R1", "b1"),
            long_row("a", "RUN2", "p", "H3K27AC", "R2", "a2"),
            long_row("c", "RUN2", "p", "H3K27AC", "R1", "c1"),
        ];
        let r = from_table(&rows, &IndexMap::new(), &IndexMap::new(), None);
        assert_eq!(
            r.value.projects["p"].sequencing,
            vec!["RUN2".to_string(), "RUN1".to_string()]
        );
        assert_eq!(r.value.sequencing.keys().collect::<Vec<_>>(), vec!["RUN2", "RUN1"]);
        assert!(r.diagnostics.contains(DiagnosticKind::UnknownRunMetadata, "RUN1"));
        assert!(r.diagnostics.contains(DiagnosticKind::UnknownRunMetadata, "RUN2"));
        assert!(r.diagnostics.contains(DiagnosticKind::UnknownProject, "p"));
    }

    #[test]
    fn bad_rows_are_skipped() {
        let rows = vec![
            long_row("a", "RUN1", "p", "ATAC", "I1", "a_I1.fastq.gz"),
            long_row("a", "RUN1", "p", "ATAC", "R1", ""),
        ];
        let r = from_table(&rows, &IndexMap::new(), &IndexMap::new(), None);
        assert!(r.value.sequencing.is_empty());
        assert!(r.diagnostics.contains(DiagnosticKind::UnknownStrand, "RUN1/a"));
        assert!(r.diagnostics.contains(DiagnosticKind::IncompleteReadPair, "RUN1/a"));
    }

    #[test]
    fn csv_and_tsv_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = to_table(&example(), Layout::Long);

        for name in ["out/sheet.csv", "sheet.tsv"] {
            let path = dir.path().join(name);
            write_table(&sheet, &path).unwrap();
            let rows = read_table(&path).unwrap();
            assert_eq!(SampleSheet::Long(rows), sheet);
        }
    }

    #[test]
    fn wide_sheet_cannot_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        write_table(&to_table(&example(), Layout::Wide), &path).unwrap();

        match read_table(&path) {
            Err(ConfigError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["STRAND".to_string(), "PATH".to_string()])
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn empty_sheet_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_table(&SampleSheet::Long(Vec::new()), &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim(),
            "SAMPLE,SEQUENCING,PROJECT,TYPE,STRAND,PATH"
        );
        assert!(read_table(&path).unwrap().is_empty());
    }

    #[test]
    fn xlsx_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets").join("samples.xlsx");
        let sheet = to_table(&example(), Layout::Long);

        write_table(&sheet, &path).unwrap();
        let rows = read_table(&path).unwrap();
        assert_eq!(SampleSheet::Long(rows), sheet);
    }

    #[test]
    fn xlsx_checks_required_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.xlsx");
        write_table(&to_table(&example(), Layout::Wide), &path).unwrap();

        match read_table(&path) {
            Err(ConfigError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["STRAND".to_string(), "PATH".to_string()])
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn unsupported_formats() {
        let err = read_table("sheet.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == ".json"));

        // Legacy workbooks are read-only.
        let err = write_table(&SampleSheet::Long(Vec::new()), "sheet.xls").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == ".xls"));

        let err = write_table(&SampleSheet::Long(Vec::new()), "sheet").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn extra_columns_and_blank_type_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        std::fs::write(
            &path,
            "SAMPLE,SEQUENCING,PROJECT,TYPE,STRAND,PATH,NOTE\n\
             ctl,RUN1,INPUT,,R1,/d/ctl_R1.fastq.gz,control\n",
        )
        .unwrap();
        let rows = read_table(&path).unwrap();
        assert_eq!(rows, vec![long_row("ctl", "RUN1", "INPUT", "", "R1", "/d/ctl_R1.fastq.gz")]);
    }

    /// Reduce a configuration to what a sheet can carry: one project per
    /// mark, listing every run holding that mark, and no unclaimed samples.
    fn sheet_consistent(mut cfg: Configuration) -> Configuration {
        cfg.validate_and_clean();

        let mut marks = Vec::new();
        cfg.projects.retain(|_, p| {
            if marks.contains(&p.mark) {
                return false;
            }
            marks.push(p.mark.clone());
            true
        });
        for run in cfg.sequencing.values_mut() {
            run.samples.retain(|_, s| marks.contains(&s.mark));
        }
        cfg.sequencing.retain(|_, run| run.has_reads());

        let runs = &cfg.sequencing;
        for project in cfg.projects.values_mut() {
            project.sequencing = runs
                .iter()
                .filter(|(_, run)| run.has_mark(&project.mark))
                .map(|(name, _)| name.clone())
                .collect();
        }
        cfg.projects.retain(|_, p| !p.sequencing.is_empty());
        cfg
    }

    proptest! {
        #[test]
        fn prop_table_round_trip(cfg in arb_config()) {
            let cfg = sheet_consistent(cfg);
            let (projects, runs) = metadata(&cfg);

            for layout in [Layout::Long, Layout::Wide] {
                let rows = to_table(&cfg, layout).into_long();
                let rebuilt = from_table(&rows, &projects, &runs, Some(cfg.jobs.clone()));
                prop_assert!(rebuilt.diagnostics.is_empty());
                prop_assert_eq!(&rebuilt.value, &cfg);
            }
        }
    }
}
