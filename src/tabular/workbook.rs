use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDateTime, NaiveTime};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::tabular::{Sheet, TabularDecoder};

/// Reads `.xlsx`, `.xls`, `.xlsb` and `.ods` workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookDecoder;

impl TabularDecoder for WorkbookDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Sheet>> {
        let mut workbook = open_workbook_auto(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: format!("sheet {}: {}", name, e),
                })?;

            // The used range starts at the first non-empty cell; pad so
            // columns keep their sheet positions.
            let leading = range.start().map(|(_, col)| col as usize).unwrap_or(0);

            let rows = range
                .rows()
                .map(|row| {
                    let mut cells = vec![String::new(); leading];
                    cells.extend(row.iter().map(cell_text));
                    cells
                })
                .collect();

            sheets.push(Sheet { name, rows });
        }

        Ok(sheets)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // Stored as a day serial; print the calendar value instead.
        Data::DateTime(_) => cell
            .as_datetime()
            .map(format_datetime)
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
