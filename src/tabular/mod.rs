use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{ConvertReport, DelimitedRecord, DELIMITED_EXTENSION};

mod workbook;
pub use workbook::WorkbookDecoder;

/// One decoded worksheet, rows in sheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<DelimitedRecord>,
}

pub trait TabularDecoder: Send + Sync {
    /// All sheets of the workbook at `path`, in workbook order.
    fn decode(&self, path: &Path) -> Result<Vec<Sheet>>;
}

/// Writes every row of every sheet to `target`; returns the record count.
pub fn convert_file<D: TabularDecoder + ?Sized>(
    decoder: &D,
    source: &Path,
    target: &Path,
) -> Result<u64> {
    let sheets = decoder.decode(source)?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(target)
        .map_err(|e| PipelineError::csv(target, e))?;

    let mut records = 0;
    for sheet in &sheets {
        debug!("{}: sheet {} has {} rows", source.display(), sheet.name, sheet.rows.len());
        for row in &sheet.rows {
            writer
                .write_record(row)
                .map_err(|e| PipelineError::csv(target, e))?;
            records += 1;
        }
    }

    writer.flush().map_err(|e| PipelineError::file(target, e))?;
    Ok(records)
}

/// Converts every file in `source_dir` ending with `suffix` into
/// `<target_dir>/<stem>.csv`, stopping at the first failure.
pub fn convert_dir<D: TabularDecoder + ?Sized>(
    decoder: &D,
    source_dir: &Path,
    target_dir: &Path,
    suffix: &str,
) -> Result<ConvertReport> {
    fs::create_dir_all(target_dir).map_err(|e| PipelineError::file(target_dir, e))?;

    let mut report = ConvertReport::default();
    for source in files_with_suffix(source_dir, suffix)? {
        let target = target_dir.join(delimited_name(&source, suffix));
        let records = convert_file(decoder, &source, &target)?;

        info!("Converted {} ({} records)", source.display(), records);
        report.records += records;
        report.outputs.push(target);
    }

    Ok(report)
}

/// Regular files directly inside `dir` whose name ends with `suffix`, sorted.
pub(crate) fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::file(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::file(dir, e))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(suffix))
            .unwrap_or(false);

        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn delimited_name(source: &Path, suffix: &str) -> String {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(suffix).unwrap_or(&name);
    format!("{}.{}", stem, DELIMITED_EXTENSION)
}
