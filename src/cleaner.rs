use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ShortRecordPolicy;
use crate::error::{PipelineError, Result};
use crate::models::{CleanReport, DelimitedRecord, DELIMITED_EXTENSION};
use crate::parsers::clean_text;
use crate::tabular::files_with_suffix;

/// Number of leading fields the cleaner reads.
pub const CLEANED_FIELDS: usize = 9;

const NAME: usize = 0;
const IFSC: usize = 1;
const MICR: usize = 2;
const LINE_FIELDS: [usize; 4] = [3, 4, 6, 7];
const STATE: usize = 8;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("Invalid alphanumeric regex"));

/// A record too short to clean. The record is left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("record has {found} fields, expected at least {}", CLEANED_FIELDS)]
pub struct ShortRecord {
    pub found: usize,
}

/// Normalizes one data record in place.
///
/// Field 5 (contact) and anything past field 8 pass through untouched.
pub fn clean_row(row: &mut [String]) -> std::result::Result<(), ShortRecord> {
    if row.len() < CLEANED_FIELDS {
        return Err(ShortRecord { found: row.len() });
    }

    row[NAME] = clean_name(&row[NAME]);
    row[IFSC] = row[IFSC].to_uppercase();
    row[MICR] = clean_micr(&row[MICR]);
    for i in LINE_FIELDS {
        row[i] = clean_line(&row[i]);
    }
    row[STATE] = clean_state(&row[STATE]);

    Ok(())
}

fn clean_name(name: &str) -> String {
    name.to_uppercase()
}

fn clean_micr(micr: &str) -> String {
    if micr.len() > 5 {
        NON_ALPHANUMERIC.replace_all(micr, "").into_owned()
    } else {
        micr.to_string()
    }
}

fn clean_line(line: &str) -> String {
    clean_text(line)
}

// Kept apart from the other line fields: state names are expected to need
// their own normalization.
fn clean_state(line: &str) -> String {
    clean_text(line)
}

/// Cleans `source` into `target`, copying the header record verbatim.
pub fn clean_file(source: &Path, target: &Path, policy: ShortRecordPolicy) -> Result<CleanReport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(source)
        .map_err(|e| PipelineError::csv(source, e))?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(target)
        .map_err(|e| PipelineError::csv(target, e))?;

    let mut report = CleanReport {
        files: 1,
        ..CleanReport::default()
    };

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PipelineError::csv(source, e))?;
        let mut row: DelimitedRecord = record.iter().map(str::to_string).collect();

        if i > 0 {
            if let Err(ShortRecord { found }) = clean_row(&mut row) {
                let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
                let error = PipelineError::Schema {
                    path: source.to_path_buf(),
                    line,
                    found,
                    expected: CLEANED_FIELDS,
                };

                match policy {
                    ShortRecordPolicy::Fail => return Err(error),
                    ShortRecordPolicy::Skip => {
                        warn!("Skipping record: {}", error);
                        report.skipped += 1;
                        continue;
                    }
                }
            }
        }

        writer
            .write_record(&row)
            .map_err(|e| PipelineError::csv(target, e))?;
        report.records += 1;
    }

    writer.flush().map_err(|e| PipelineError::file(target, e))?;
    Ok(report)
}

/// Cleans every `.csv` in `source_dir` into a file of the same name in
/// `target_dir`.
pub fn clean_dir(source_dir: &Path, target_dir: &Path, policy: ShortRecordPolicy) -> Result<CleanReport> {
    fs::create_dir_all(target_dir).map_err(|e| PipelineError::file(target_dir, e))?;

    let suffix = format!(".{}", DELIMITED_EXTENSION);
    let mut report = CleanReport::default();

    for source in files_with_suffix(source_dir, &suffix)? {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = target_dir.join(name);
        let file_report = clean_file(&source, &target, policy)?;

        info!(
            "Cleaned {} ({} records, {} skipped)",
            source.display(),
            file_report.records,
            file_report.skipped
        );
        report.absorb(file_report);
    }

    Ok(report)
}
