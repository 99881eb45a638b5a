use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::report::{
    column_widths, row_cells, trial_sheet_name, BenchSummary, Cell, ReportEmitter, COLUMNS,
    MEAN_SHEET_NAME,
};

/// Writes the summary as a spreadsheet: the means first, then one sheet per trial.
#[derive(Debug, Clone)]
pub struct XlsxReport {
    path: PathBuf,
}

impl XlsxReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportEmitter for XlsxReport {
    type Error = XlsxError;

    fn emit(&mut self, summary: &BenchSummary) -> Result<(), Self::Error> {
        let mut workbook = Workbook::new();

        let mean_rows = summary
            .means
            .iter()
            .map(|mean| row_cells(&mean.key, &mean.metrics))
            .collect::<Vec<_>>();
        write_sheet(workbook.add_worksheet(), MEAN_SHEET_NAME, &mean_rows)?;

        for trial in summary.runs.iter() {
            let rows = trial
                .records
                .iter()
                .map(|record| row_cells(&record.key, &record.metrics))
                .collect::<Vec<_>>();
            write_sheet(
                workbook.add_worksheet(),
                &trial_sheet_name(trial.trial),
                &rows,
            )?;
        }

        workbook.save(&self.path)?;
        log::info!(
            "Wrote report with {} trial sheets to {}",
            summary.runs.len(),
            self.path.display()
        );

        Ok(())
    }
}

fn write_sheet(sheet: &mut Worksheet, name: &str, rows: &[Vec<Cell>]) -> Result<(), XlsxError> {
    sheet.set_name(name)?;

    let bold = Format::new().set_bold();
    for (col, header) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (row_index, row) in rows.iter().enumerate() {
        let row_num = row_index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(text) => sheet.write_string(row_num, col as u16, text)?,
                Cell::Number(number) => sheet.write_number(row_num, col as u16, *number)?,
            };
        }
    }

    for (col, width) in column_widths(rows).into_iter().enumerate() {
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use fio_bench_summary_model::{GroupKey, JobMetrics, JobRecord, RunCollection};

    use super::*;

    #[test]
    fn test_should_write_workbook() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.xlsx");

        let mut runs = RunCollection::new();
        for trial in [1, 3] {
            runs.push(
                trial,
                vec![JobRecord::new(
                    GroupKey {
                        group_id: 0,
                        job_name: "seq-read".to_string(),
                        description: "顺序读".to_string(),
                        mode: "read".to_string(),
                        block_size: "1M".to_string(),
                        queue_depth: "32".to_string(),
                        job_count: "1".to_string(),
                    },
                    JobMetrics {
                        read_mb: trial as f64,
                        ..Default::default()
                    },
                )],
            );
        }

        let mut report = XlsxReport::new(&path);
        report.emit(&BenchSummary::new(runs)).unwrap();

        let content = std::fs::read(report.path()).unwrap();
        // xlsx files are zip archives
        assert_eq!(&content[..2], b"PK");
    }

    #[test]
    fn test_should_fail_for_unwritable_path() {
        let mut report = XlsxReport::new("/non/existent/dir/report.xlsx");
        assert!(report.emit(&BenchSummary::new(RunCollection::new())).is_err());
    }
}
