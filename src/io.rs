use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Reads a delimited table with a header row. Tab and comma separators are
/// detected from the extension (`.csv` is comma, anything else tab); empty
/// strings, `NA`, `NaN` and `.` parse as null.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let separator = if ext == "csv" { b',' } else { b'\t' };

    CsvReadOptions::default()
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_null_values(Some(NullValues::AllColumns(vec![
                    "".into(),
                    "NA".into(),
                    "NaN".into(),
                    ".".into(),
                ])))
                .with_missing_is_null(true),
        )
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))
}

/// Converts every column of a frame to `f64` and packs it row-major into an
/// `Array2`. Unparseable cells become NaN.
pub fn frame_to_array2(df: &DataFrame) -> Result<Array2<f64>> {
    let n = df.height();
    let m = df.width();
    let mut out = Array2::<f64>::from_elem((n, m), f64::NAN);
    for (j, name) in df.get_column_names().iter().enumerate() {
        let series = df
            .column(name)?
            .as_series()
            .context("series")?
            .cast(&DataType::Float64)?;
        let col = series.f64()?;
        for i in 0..n {
            out[[i, j]] = col.get(i).unwrap_or(f64::NAN);
        }
    }
    Ok(out)
}

pub fn write_dataframe(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut csv = CsvWriter::new(&mut file).with_separator(b'\t');
    let mut df = df.clone();
    csv.finish(&mut df)?;
    Ok(())
}

/// Writes an N x N matrix as a labeled TSV: label header row, label first
/// column, the layout the plotting collaborator consumes.
pub fn write_labeled_matrix(matrix: &Array2<f64>, labels: &[String], path: &Path) -> Result<()> {
    let n = matrix.nrows();
    if n != labels.len() || n != matrix.ncols() {
        return Err(anyhow::anyhow!(
            "matrix is {n}x{} but {} labels were given",
            matrix.ncols(),
            labels.len()
        ));
    }
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    writeln!(file, "\t{}", labels.join("\t"))?;
    for (i, label) in labels.iter().enumerate() {
        let row = matrix
            .row(i)
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(file, "{label}\t{row}")?;
    }
    Ok(())
}
