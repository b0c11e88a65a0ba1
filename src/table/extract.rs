// src/table/extract.rs

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument, trace};

use super::RawTable;

// HTML caps for span attributes.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("table selector should parse"));
static HIDDEN_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"display:\s*none").expect("hidden-style regex should parse"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\u{a0}]+").expect("whitespace regex should parse"));

/// One `th`/`td` before span expansion.
struct Cell {
    text: String,
    colspan: usize,
    rowspan: usize,
}

/// A span still covering later rows: (column, text, rows left).
type Carry = (usize, String, usize);

/// Parse every `<table>` in `html`, in document order.
///
/// Nested tables come out as tables of their own; their rows are not mixed
/// into the enclosing table.
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn extract_tables(html: &str) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let tables: Vec<RawTable> = doc
        .select(&TABLE_SELECTOR)
        .filter(|t| !is_hidden(t))
        .filter_map(parse_table)
        .collect();
    debug!(tables = tables.len(), "extracted tables");
    tables
}

fn parse_table(table: ElementRef<'_>) -> Option<RawTable> {
    let mut header_rows = Vec::new();
    let mut body_rows = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => header_rows.extend(child_rows(child)),
            "tbody" | "tfoot" => body_rows.extend(child_rows(child)),
            "tr" => body_rows.push(child),
            _ => {}
        }
    }

    // Without a <thead>, leading all-<th> rows are the header. A row with no
    // cells at all also counts, as it does for pandas.
    if header_rows.is_empty() {
        let leading = body_rows.iter().take_while(|r| is_all_th(r)).count();
        header_rows = body_rows.drain(..leading).collect();
    }

    let header = expand_spans(header_rows.iter().map(|r| row_cells(*r)).collect());
    let names = header.iter().rev().find(|r| !r.is_empty());
    let mut rows = expand_spans(body_rows.iter().map(|r| row_cells(*r)).collect());
    rows.retain(|r| !r.is_empty());
    if rows.is_empty() {
        trace!("skipping table without body rows");
        return None;
    }

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(names.map(Vec::len))
        .max()
        .unwrap_or(0);

    let headers: Vec<String> = match names {
        Some(names) => (0..width)
            .map(|i| match names.get(i) {
                Some(name) if !name.is_empty() => name.clone(),
                _ => format!("Unnamed: {}", i),
            })
            .collect(),
        None => (0..width).map(|i| i.to_string()).collect(),
    };

    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }

    Some(RawTable { headers, rows })
}

fn child_rows(section: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
}

fn cell_elements(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "th" | "td"))
        .filter(|e| !is_hidden(e))
}

fn is_all_th(row: &ElementRef<'_>) -> bool {
    cell_elements(*row).all(|c| c.value().name() == "th")
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    el.value()
        .attr("style")
        .map(|s| HIDDEN_STYLE.is_match(s))
        .unwrap_or(false)
}

fn span_attr(el: &ElementRef<'_>, name: &str, max: usize) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

fn row_cells(row: ElementRef<'_>) -> Vec<Cell> {
    cell_elements(row)
        .map(|c| Cell {
            text: cell_text(c),
            colspan: span_attr(&c, "colspan", MAX_COLSPAN),
            rowspan: span_attr(&c, "rowspan", MAX_ROWSPAN),
        })
        .collect()
}

/// Visible descendant text with whitespace runs collapsed.
fn cell_text(cell: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(cell, &mut raw);
    WHITESPACE.replace_all(&raw, " ").trim().to_string()
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_hidden(&child_el) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Turn rows of spanning cells into a plain grid.
///
/// A cell with `colspan = n` repeats its text across n columns; with
/// `rowspan = m` it is carried into the same column of the next m - 1 rows.
fn expand_spans(rows: Vec<Vec<Cell>>) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(rows.len());
    let mut carry: Vec<Carry> = Vec::new();

    for cells in rows {
        let mut texts = Vec::new();
        let mut next_carry: Vec<Carry> = Vec::new();
        let mut index = 0;
        let mut pending = carry.into_iter().peekable();

        for cell in cells {
            while let Some((_, text, left)) = pending.next_if(|(col, _, _)| *col <= index) {
                push_spanned(&mut texts, &mut next_carry, index, text, left);
                index += 1;
            }
            for _ in 0..cell.colspan {
                push_spanned(&mut texts, &mut next_carry, index, cell.text.clone(), cell.rowspan);
                index += 1;
            }
        }
        for (_, text, left) in pending {
            push_spanned(&mut texts, &mut next_carry, index, text, left);
            index += 1;
        }

        grid.push(texts);
        carry = next_carry;
    }

    // Spans running past the last row become rows of their own.
    while !carry.is_empty() {
        let mut texts = Vec::new();
        let mut next_carry = Vec::new();
        for (index, (_, text, left)) in carry.into_iter().enumerate() {
            push_spanned(&mut texts, &mut next_carry, index, text, left);
        }
        grid.push(texts);
        carry = next_carry;
    }

    grid
}

fn push_spanned(texts: &mut Vec<String>, carry: &mut Vec<Carry>, index: usize, text: String, rowspan: usize) {
    if rowspan > 1 {
        carry.push((index, text.clone(), rowspan - 1));
    }
    texts.push(text);
}
