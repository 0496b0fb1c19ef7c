use anyhow::{Context, Result};
use polars::prelude::*;

/// Casts the named phenotype columns to `f64` in place, leaving columns that
/// are already numeric untouched.
pub fn ensure_f64(mut df: DataFrame, cols: &[&str]) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && let Some(series) = column.as_series()
            && series.dtype() != &DataType::Float64
        {
            let mut casted = series.cast(&DataType::Float64)?;
            casted.rename((*col).into());
            df.with_column(Column::from(casted))?;
        }
    }
    Ok(df)
}

/// Casts the named columns to strings, used for categorical covariates read
/// from numerically-coded phenotype files.
pub fn ensure_utf8(mut df: DataFrame, cols: &[&str]) -> Result<DataFrame> {
    for col in cols {
        if let Ok(column) = df.column(col)
            && let Some(series) = column.as_series()
            && series.dtype() != &DataType::String
        {
            let mut casted = series.cast(&DataType::String)?;
            casted.rename((*col).into());
            df.with_column(Column::from(casted))?;
        }
    }
    Ok(df)
}

/// Drops rows where `col` is null (or NaN for float columns), returning the
/// filtered frame and the number of rows removed.
pub fn filter_missing(mut df: DataFrame, col: &str) -> Result<(DataFrame, usize)> {
    if df.column(col).is_err() {
        return Ok((df, 0));
    }
    let before = df.height();
    let column = df.column(col)?;
    let series = column.as_series().context("series")?;
    let mask = match series.dtype() {
        DataType::Float64 => series.is_not_null() & series.f64()?.is_not_nan(),
        _ => series.is_not_null(),
    };
    df = df.filter(&mask)?;
    let removed = before.saturating_sub(df.height());
    Ok((df, removed))
}

/// String column as owned values; nulls become `None`.
pub fn str_column(df: &DataFrame, col: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(col)?.as_series().context(col.to_string())?;
    let utf8 = series
        .str()
        .with_context(|| format!("column {col} is not a string column"))?;
    Ok(utf8
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Float column as owned values; nulls become NaN.
pub fn f64_column(df: &DataFrame, col: &str) -> Result<Vec<f64>> {
    let series = df
        .column(col)?
        .as_series()
        .context(col.to_string())?
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Restricts a frame to the rows where `keep` is true.
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    if keep.len() != df.height() {
        return Err(anyhow::anyhow!(
            "mask length {} does not match frame height {}",
            keep.len(),
            df.height()
        ));
    }
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}
