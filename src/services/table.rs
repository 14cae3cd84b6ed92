// src/services/table.rs
use chrono::NaiveDate;

use crate::models::{DatedValue, PoolSeries, ProtocolSeries};

/// How side-by-side concatenation lines rows up across series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Row N of each series sits on output row N, whatever its date. This
    /// reproduces the historical workbook layout; series of different
    /// lengths silently misalign dates past the shortest one.
    Positional,
    /// One shared date column over the union of all dates, each series
    /// matched by date. The safe mode.
    DateKeyed,
}

/// A single entity's table: a date column plus named numeric columns,
/// newest date first.
#[derive(Debug, Clone)]
pub struct SeriesFrame {
    pub label: String,
    pub date_column: String,
    pub value_columns: Vec<String>,
    pub rows: Vec<FrameRow>,
}

#[derive(Debug, Clone)]
pub struct FrameRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Final wide table handed to the spreadsheet sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SeriesFrame {
    pub fn from_protocol(series: &ProtocolSeries) -> Self {
        SeriesFrame {
            label: series.name.clone(),
            date_column: "date".to_string(),
            value_columns: vec!["totalLiquidityUSD".to_string()],
            rows: series
                .points
                .iter()
                .map(|p| FrameRow {
                    date: p.date,
                    values: vec![Some(p.value)],
                })
                .collect(),
        }
    }

    pub fn from_pool(series: &PoolSeries) -> Self {
        SeriesFrame {
            label: series.pool_id.clone(),
            date_column: "timestamp".to_string(),
            value_columns: vec![
                "tvlUsd".to_string(),
                "apy".to_string(),
                "apyBase".to_string(),
                "apyReward".to_string(),
            ],
            rows: series
                .records
                .iter()
                .map(|r| FrameRow {
                    date: r.date,
                    values: vec![Some(r.tvl_usd), r.apy, r.apy_base, r.apy_reward],
                })
                .collect(),
        }
    }

    pub fn from_chain(label: &str, series: &[DatedValue]) -> Self {
        SeriesFrame {
            label: label.to_string(),
            date_column: "date".to_string(),
            value_columns: vec!["tvl".to_string()],
            rows: series
                .iter()
                .map(|p| FrameRow {
                    date: p.date,
                    values: vec![Some(p.value)],
                })
                .collect(),
        }
    }

    fn width(&self) -> usize {
        1 + self.value_columns.len()
    }
}

/// Concatenate per-entity frames side by side into one wide table.
pub fn concat_wide(frames: &[SeriesFrame], mode: AlignMode) -> Table {
    match mode {
        AlignMode::Positional => concat_positional(frames),
        AlignMode::DateKeyed => concat_date_keyed(frames),
    }
}

fn render_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn concat_positional(frames: &[SeriesFrame]) -> Table {
    let mut header = Vec::new();
    for frame in frames {
        header.push(frame.date_column.clone());
        header.extend(frame.value_columns.iter().cloned());
    }

    let depth = frames.iter().map(|f| f.rows.len()).max().unwrap_or(0);
    let mut rows = Vec::with_capacity(depth);
    for i in 0..depth {
        let mut row = Vec::new();
        for frame in frames {
            match frame.rows.get(i) {
                Some(r) => {
                    row.push(r.date.to_string());
                    row.extend(r.values.iter().map(|v| render_cell(*v)));
                }
                None => row.extend(std::iter::repeat(String::new()).take(frame.width())),
            }
        }
        rows.push(row);
    }

    Table { header, rows }
}

fn concat_date_keyed(frames: &[SeriesFrame]) -> Table {
    let mut header = vec!["date".to_string()];
    for frame in frames {
        for column in &frame.value_columns {
            header.push(format!("{} {}", frame.label, column));
        }
    }

    let mut dates: Vec<NaiveDate> = frames
        .iter()
        .flat_map(|f| f.rows.iter().map(|r| r.date))
        .collect();
    dates.sort();
    dates.dedup();
    dates.reverse();

    let mut rows = Vec::with_capacity(dates.len());
    for date in dates {
        let mut row = vec![date.to_string()];
        for frame in frames {
            match frame.rows.iter().find(|r| r.date == date) {
                Some(r) => row.extend(r.values.iter().map(|v| render_cell(*v))),
                None => row.extend(
                    std::iter::repeat(String::new()).take(frame.value_columns.len()),
                ),
            }
        }
        rows.push(row);
    }

    Table { header, rows }
}
