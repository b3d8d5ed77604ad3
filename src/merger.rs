use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::models::{MergeReport, DELIMITED_EXTENSION, MASTER_HEADER};

/// Every `.csv` under `source_dir`, in file-name order per directory.
///
/// `exclude` is compared after resolving `.`, `..` and symlinks, so the
/// master is left out however its path is spelled.
pub fn delimited_files(source_dir: &Path, exclude: &Path) -> Result<Vec<PathBuf>> {
    let exclude = canonical_target(exclude);
    let mut files = Vec::new();

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_dir).to_path_buf();
            PipelineError::file(path, e.into())
        })?;

        let path = entry.path();
        let is_delimited = path
            .extension()
            .map(|ext| ext == DELIMITED_EXTENSION)
            .unwrap_or(false);

        if entry.file_type().is_file() && is_delimited && !is_same_file(path, &exclude) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

// The target may not exist yet, so only its directory is resolved.
fn canonical_target(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn is_same_file(path: &Path, canonical: &Path) -> bool {
    fs::canonicalize(path)
        .map(|p| p == canonical)
        .unwrap_or(path == canonical)
}

/// Writes the master header followed by every non-header record of every
/// delimited file under `source_dir`.
///
/// Any unreadable input aborts the merge. Output goes to a temp file that only
/// replaces `target` once everything has been written.
pub fn merge_dir(source_dir: &Path, target: &Path) -> Result<MergeReport> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::file(parent, e))?;
    }

    let inputs = delimited_files(source_dir, target)?;

    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = write_master(&inputs, &tmp);
    let rows = match result {
        Ok(rows) => rows,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };

    fs::rename(&tmp, target).map_err(|e| PipelineError::file(target, e))?;
    info!("Wrote {} rows to {}", rows, target.display());

    Ok(MergeReport { inputs, rows })
}

fn write_master(inputs: &[PathBuf], path: &Path) -> Result<u64> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    writer
        .write_record(MASTER_HEADER)
        .map_err(|e| PipelineError::csv(path, e))?;

    let mut rows = 0;
    for input in inputs {
        let appended = append_records(input, &mut writer, path)?;
        debug!("Appended {} rows from {}", appended, input.display());
        rows += appended;
    }

    writer.flush().map_err(|e| PipelineError::file(path, e))?;
    Ok(rows)
}

fn append_records(input: &Path, writer: &mut csv::Writer<fs::File>, output: &Path) -> Result<u64> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(input)
        .map_err(|e| PipelineError::csv(input, e))?;

    let mut rows = 0;
    // Skip header
    for result in reader.records().skip(1) {
        let record = result.map_err(|e| PipelineError::csv(input, e))?;
        writer
            .write_record(&record)
            .map_err(|e| PipelineError::csv(output, e))?;
        rows += 1;
    }

    Ok(rows)
}
