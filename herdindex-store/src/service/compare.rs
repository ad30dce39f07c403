//! Scoring & Comparison Engine
//!
//! Ranks a database's records by a job's economic index. The CSV is streamed
//! one record at a time through a reused buffer; only the selected columns
//! and the score of each record are kept, since ranking needs every score
//! before anything can be written.
//!
//! Job weights and requested columns the database cannot resolve are skipped
//! and reported in the returned [`Comparison`].

use herdindex_core::domain::field::{SCORE_COLUMN, Xref};
use herdindex_core::domain::job::Job;
use herdindex_core::domain::traits::TraitWeight;
use herdindex_core::dto::compare::Comparison;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use tracing::{debug, info};

use super::database::BreedDatabase;
use crate::error::{Result, StoreError};
use crate::repository::database_repository;

/// A database column contributing to the score
struct WeightedColumn {
    column: usize,
    marginal_economic_value: f64,
}

/// One ranked record
struct ScoredRecord {
    values: Vec<String>,
    score: f64,
}

impl ScoredRecord {
    fn into_row(self) -> Vec<String> {
        let mut row = self.values;
        row.push(format!("{:.2}", self.score));
        row
    }
}

impl BreedDatabase {
    /// Ranks this database's records with the job's weights
    ///
    /// # Arguments
    /// * `job` - Job whose output supplies the weights
    /// * `columns` - Field keys to export, in output order
    ///
    /// # Returns
    /// The ranked CSV plus the trait keys and columns that were skipped
    pub fn compare_job<S: AsRef<str>>(&self, job: &Job, columns: &[S]) -> Result<Comparison> {
        let data_file = database_repository::find_data_file(self.dir(), self.name())?;
        let file = File::open(&data_file)
            .map_err(|e| StoreError::io(format!("opening {}", data_file.display()), e))?;

        let comparison = rank_records(self.xref(), &job.output, columns, file)?;

        info!(
            "Compared job {}/{} against database {}: {} records, {} unmatched traits",
            job.owner,
            job.name,
            self.name(),
            comparison.records,
            comparison.unmatched_traits.len()
        );

        Ok(comparison)
    }
}

/// Scores and ranks CSV records read from `source`
///
/// The first record is the header. Every weighted column must parse as a
/// finite decimal number in every record, otherwise the comparison fails without
/// output. Scores are sorted descending; records with equal scores keep
/// their file order.
pub fn rank_records<R: Read, S: AsRef<str>>(
    xref: &Xref,
    weights: &[TraitWeight],
    columns: &[S],
    source: R,
) -> Result<Comparison> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| read_error("reading header", e))?
        .clone();
    if headers.is_empty() {
        return Err(StoreError::DataFormat("missing header row".into()));
    }

    let header_index: HashMap<&str, usize> =
        headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let resolve = |key: &str| {
        xref.header_for(key)
            .and_then(|header| header_index.get(header).copied())
    };

    let mut plan = Vec::with_capacity(weights.len());
    let mut unmatched_traits = Vec::new();
    for weight in weights {
        let key = weight.key();
        match resolve(&key) {
            Some(column) => plan.push(WeightedColumn {
                column,
                marginal_economic_value: weight.marginal_economic_value,
            }),
            None => unmatched_traits.push(key),
        }
    }

    let mut selected = Vec::with_capacity(columns.len());
    let mut names = Vec::with_capacity(columns.len() + 1);
    let mut unmatched_columns = Vec::new();
    for key in columns {
        let key = key.as_ref();
        match resolve(key) {
            Some(column) => {
                selected.push(column);
                names.push(key.to_string());
            }
            None => unmatched_columns.push(key.to_string()),
        }
    }

    debug!(
        "Weighting {} columns, exporting {} columns",
        plan.len(),
        selected.len()
    );

    let mut records = Vec::new();
    let mut row = csv::StringRecord::new();
    while reader
        .read_record(&mut row)
        .map_err(|e| read_error("reading record", e))?
    {
        let mut score = 0.0;
        for weighted in &plan {
            let raw = row.get(weighted.column).unwrap_or_default();
            let value = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    StoreError::DataFormat(format!(
                        "line {}: column '{}' value '{}' is not a number",
                        line_of(&row),
                        &headers[weighted.column],
                        raw
                    ))
                })?;
            score += value * weighted.marginal_economic_value;
        }

        let values = selected
            .iter()
            .map(|&column| row.get(column).unwrap_or_default().to_string())
            .collect();

        records.push(ScoredRecord { values, score });
    }

    records.sort_by(|a, b| b.score.total_cmp(&a.score));

    let record_count = records.len();
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    names.push(SCORE_COLUMN.to_string());
    writer.write_record(&names)?;
    for record in records {
        writer.write_record(record.into_row())?;
    }

    let csv = writer
        .into_inner()
        .map_err(|e| StoreError::io("flushing comparison", std::io::Error::other(e.to_string())))?;

    Ok(Comparison {
        csv,
        records: record_count,
        unmatched_traits,
        unmatched_columns,
    })
}

fn line_of(row: &csv::StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or_default()
}

fn read_error(context: &str, err: csv::Error) -> StoreError {
    if err.is_io_error() {
        StoreError::Csv(err)
    } else {
        StoreError::DataFormat(format!("{context}: {err}"))
    }
}
