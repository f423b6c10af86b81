//! Group positioned text fragments into table grids.
//!
//! Statements lay transactions out as aligned columns but rarely draw a full
//! ruling grid, so tables are recovered from text positions alone:
//!
//! 1. fragments sharing a baseline (within [`TableSettings::row_tolerance`])
//!    form a line;
//! 2. fragments on a line closer than [`TableSettings::column_gap`] merge
//!    into one cell;
//! 3. a line with at least [`TableSettings::min_columns`] cells is tabular,
//!    and a run of at least [`TableSettings::min_rows`] tabular lines is a
//!    table;
//! 4. columns are the union of overlapping cell spans across the run, which
//!    keeps right-aligned amount columns together.
//!
//! Coordinates are PDF points with the origin at the bottom-left, so `top`
//! is larger than `bottom` and lines are emitted from the highest `top` down.

/// A run of text with its bounding box on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            top,
            bottom,
        }
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// A rectangular grid of cells; `None` marks an empty cell.
pub type TableGrid = Vec<Vec<Option<String>>>;

/// Tolerances for [`detect_tables`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSettings {
    /// Max vertical distance between fragment centres on one line (pt).
    pub row_tolerance: f32,
    /// Min horizontal gap separating two cells (pt).
    pub column_gap: f32,
    pub min_columns: usize,
    pub min_rows: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            row_tolerance: 3.0,
            column_gap: 8.0,
            min_columns: 3,
            min_rows: 2,
        }
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

/// Detect tables among the fragments of one page, top to bottom.
pub fn detect_tables(fragments: &[TextFragment], settings: &TableSettings) -> Vec<TableGrid> {
    let lines = group_lines(fragments, settings);

    let mut tables = Vec::new();
    let mut run: Vec<Vec<Cell>> = Vec::new();
    for line in lines {
        let cells = merge_cells(line, settings);
        if cells.len() >= settings.min_columns {
            run.push(cells);
        } else {
            flush_run(&mut run, settings, &mut tables);
        }
    }
    flush_run(&mut run, settings, &mut tables);
    tables
}

fn flush_run(run: &mut Vec<Vec<Cell>>, settings: &TableSettings, tables: &mut Vec<TableGrid>) {
    if run.len() >= settings.min_rows {
        tables.push(build_grid(run, settings));
    }
    run.clear();
}

fn group_lines<'a>(fragments: &'a [TextFragment], settings: &TableSettings) -> Vec<Vec<&'a TextFragment>> {
    let mut sorted: Vec<&TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect();
    sorted.sort_by(|a, b| {
        b.center_y()
            .total_cmp(&a.center_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut lines: Vec<Vec<&TextFragment>> = Vec::new();
    let mut line_y = f32::NAN;
    for frag in sorted {
        match lines.last_mut() {
            Some(line) if (line_y - frag.center_y()).abs() <= settings.row_tolerance => {
                line.push(frag);
            }
            _ => {
                line_y = frag.center_y();
                lines.push(vec![frag]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    lines
}

fn merge_cells(line: Vec<&TextFragment>, settings: &TableSettings) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for frag in line {
        let text = frag.text.trim();
        match cells.last_mut() {
            Some(cell) if frag.left - cell.right < settings.column_gap => {
                cell.text.push(' ');
                cell.text.push_str(text);
                cell.right = cell.right.max(frag.right);
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                left: frag.left,
                right: frag.right,
            }),
        }
    }
    cells
}

fn build_grid(rows: &[Vec<Cell>], settings: &TableSettings) -> TableGrid {
    let columns = column_spans(rows, settings);

    rows.iter()
        .map(|cells| {
            let mut row: Vec<Option<String>> = vec![None; columns.len()];
            for cell in cells {
                let center = (cell.left + cell.right) / 2.0;
                let col = columns
                    .iter()
                    .position(|&(l, r)| center >= l && center <= r)
                    .unwrap_or_else(|| nearest_column(&columns, center));
                match &mut row[col] {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&cell.text);
                    }
                    slot => *slot = Some(cell.text.clone()),
                }
            }
            row
        })
        .collect()
}

fn column_spans(rows: &[Vec<Cell>], settings: &TableSettings) -> Vec<(f32, f32)> {
    let mut spans: Vec<(f32, f32)> = rows
        .iter()
        .flatten()
        .map(|c| (c.left, c.right))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));

    let slack = settings.column_gap / 2.0;
    let mut merged: Vec<(f32, f32)> = Vec::new();
    for (l, r) in spans {
        match merged.last_mut() {
            Some(last) if l <= last.1 + slack => last.1 = last.1.max(r),
            _ => merged.push((l, r)),
        }
    }
    merged
}

fn nearest_column(columns: &[(f32, f32)], x: f32) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (a.0 - x).abs().min((a.1 - x).abs());
            let db = (b.0 - x).abs().min((b.1 - x).abs());
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
