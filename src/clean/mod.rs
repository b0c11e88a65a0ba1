// src/clean/mod.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::table::RawTable;

static NOT_MONEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d.]").expect("money regex should parse"));
static NOT_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("digit regex should parse"));

/// Outcome of reading a money cell.
///
/// `Defaulted` and a genuine zero both count as 0.0 downstream; the variant
/// only keeps the difference visible for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Money {
    Parsed(f64),
    Defaulted,
}

impl Money {
    pub fn value(self) -> f64 {
        match self {
            Money::Parsed(v) => v,
            Money::Defaulted => 0.0,
        }
    }
}

/// Keep digits and dots, then parse as a float.
pub fn parse_money(raw: &str) -> Money {
    let kept = NOT_MONEY.replace_all(raw, "");
    match kept.parse::<f64>() {
        Ok(v) => Money::Parsed(v),
        Err(_) => Money::Defaulted,
    }
}

/// Money cell as a number; anything unparseable (including "") is 0.0.
pub fn clean_money(raw: &str) -> f64 {
    parse_money(raw).value()
}

/// Keep digits only. No digits, or more than fit in a u64, is `None`.
pub fn clean_int(raw: &str) -> Option<u64> {
    let digits = NOT_DIGIT.replace_all(raw, "");
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// A film row that survived cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub rank: u64,
    pub peak: u64,
    pub year: u64,
    pub title: String,
    pub worldwide_gross: Money,
}

impl CleanedRecord {
    pub fn gross(&self) -> f64 {
        self.worldwide_gross.value()
    }
}

/// Clean the film columns and drop rows missing rank, peak or year.
///
/// The table must already carry the required columns; rows from a table
/// that lacks one simply come out empty.
#[instrument(level = "debug", skip(table), fields(rows = table.rows.len()))]
pub fn clean_table(table: &RawTable) -> Vec<CleanedRecord> {
    let (Some(rank), Some(peak), Some(title), Some(gross), Some(year)) = (
        table.column_index("Rank"),
        table.column_index("Peak"),
        table.column_index("Title"),
        table.column_index("Worldwide gross"),
        table.column_index("Year"),
    ) else {
        return Vec::new();
    };

    let mut dropped = 0usize;
    let mut defaulted = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());

    for row in 0..table.rows.len() {
        let worldwide_gross = parse_money(table.cell(row, gross));
        if worldwide_gross == Money::Defaulted {
            defaulted += 1;
        }
        match (
            clean_int(table.cell(row, rank)),
            clean_int(table.cell(row, peak)),
            clean_int(table.cell(row, year)),
        ) {
            (Some(rank), Some(peak), Some(year)) => records.push(CleanedRecord {
                rank,
                peak,
                year,
                title: table.cell(row, title).to_string(),
                worldwide_gross,
            }),
            _ => dropped += 1,
        }
    }

    debug!(kept = records.len(), dropped, defaulted, "cleaned table");
    records
}
