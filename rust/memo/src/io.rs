//! Delimited text export/import of labelled tables.
//!
//! Layout: a header row `filename<sep><col 1><sep><col 2>...` followed by
//! one row per sample. Integral values are written without a fractional
//! part.

use crate::errors::{
    MemoError,
    Result,
};
use crate::models::{
    ColumnKey,
    LabeledTable,
};
use std::io::{
    Read,
    Write,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Name of the row label column in exported tables.
pub const ROW_LABEL_COLUMN: &str = "filename";

pub fn write_delimited<C: ColumnKey, W: Write>(
    table: &LabeledTable<C>,
    writer: W,
    delimiter: u8,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    let mut header = Vec::with_capacity(table.ncols() + 1);
    header.push(ROW_LABEL_COLUMN.to_string());
    header.extend(table.col_labels().iter().map(|c| c.to_string()));
    wtr.write_record(&header)?;

    let mut record = Vec::with_capacity(table.ncols() + 1);
    for (label, row) in table.rows() {
        record.clear();
        record.push(label.to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_path<C: ColumnKey>(
    table: &LabeledTable<C>,
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| MemoError::io(e, path))?;
    write_delimited(table, std::io::BufWriter::new(file), delimiter)?;
    info!(
        "Exported {}x{} table to {}",
        table.nrows(),
        table.ncols(),
        path.display()
    );
    Ok(())
}

/// Reads back a table written by [`write_delimited`]. Empty cells are read as 0.
pub fn read_delimited<C, R>(reader: R, delimiter: u8) -> Result<LabeledTable<C>>
where
    C: ColumnKey + FromStr,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let col_labels = headers
        .iter()
        .skip(1)
        .map(|h| {
            C::from_str(h.trim())
                .map_err(|_| MemoError::data(format!("unable to parse column label '{}'", h)))
        })
        .collect::<Result<Vec<C>>>()?;

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        let label = record
            .get(0)
            .ok_or_else(|| MemoError::data(format!("row {} is empty", row_no)))?;
        row_labels.push(label.to_string());
        for (j, cell) in record.iter().skip(1).enumerate() {
            let value = parse_cell(cell).map_err(|e| {
                let column = headers.get(j + 1).unwrap_or("?");
                e.append_to_context(&format!("row {}, column {}", label, column))
            })?;
            values.push(value);
        }
    }
    LabeledTable::new(row_labels, col_labels, values)
}

pub fn read_path<C>(path: impl AsRef<Path>, delimiter: u8) -> Result<LabeledTable<C>>
where
    C: ColumnKey + FromStr,
{
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| MemoError::io(e, path))?;
    read_delimited(std::io::BufReader::new(file), delimiter)
        .map_err(|e| e.append_to_context(&format!("reading {}", path.display())))
}

/// Parses a numeric cell. Empty and NaN-like cells are absent, hence 0.
pub(crate) fn parse_cell(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("na") {
        return Ok(0.0);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(0.0),
        Ok(v) => Ok(v),
        Err(_) => Err(MemoError::data(format!("'{}' is not a number", cell))),
    }
}
