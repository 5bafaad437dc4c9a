//! Keyed outer joins over tables, used to merge per-source roll extracts.

use crate::error::PipelineError;
use crate::table::Table;

/// Full outer join of two tables on one column.
///
/// Output headers are the left headers followed by the right ones minus the
/// key; a right header colliding with a left one gets a `_y` suffix. Rows
/// with a missing key never match anything. Unmatched right rows are
/// appended with missing left cells. Every right row matches at most once
/// per left row, so duplicated keys multiply as in a relational join.
pub fn join_tables(left: &Table, right: &Table, on: &str) -> Result<Table, PipelineError> {
    let left_key = left.require_column(on)?;
    let right_key = right.require_column(on)?;

    let right_cols: Vec<usize> = (0..right.n_cols()).filter(|&c| c != right_key).collect();
    let mut headers = left.headers().to_vec();
    for &c in &right_cols {
        let name = &right.headers()[c];
        if headers.contains(name) {
            headers.push(format!("{name}_y"));
        } else {
            headers.push(name.clone());
        }
    }

    let mut out = Table::new(headers);
    let mut right_matched = vec![false; right.n_rows()];

    for i in 0..left.n_rows() {
        let key = left.get(i, left_key);
        let mut any = false;
        if key.is_some() {
            for j in 0..right.n_rows() {
                if right.get(j, right_key) != key {
                    continue;
                }
                right_matched[j] = true;
                any = true;
                let mut row = left.row(i).to_vec();
                row.extend(right_cols.iter().map(|&c| right.get(j, c).map(str::to_string)));
                out.push_row(row);
            }
        }
        if !any {
            out.push_row(left.row(i).to_vec());
        }
    }

    for j in 0..right.n_rows() {
        if right_matched[j] {
            continue;
        }
        let mut row: Vec<Option<String>> = vec![None; left.n_cols()];
        row[left_key] = right.get(j, right_key).map(str::to_string);
        row.extend(right_cols.iter().map(|&c| right.get(j, c).map(str::to_string)));
        out.push_row(row);
    }

    Ok(out)
}

/// Fold a list of tables into one with repeated outer joins on `on`.
pub fn join_many(tables: &[Table], on: &str) -> Result<Table, PipelineError> {
    let (first, rest) = tables.split_first().ok_or(PipelineError::EmptyInput)?;
    let mut acc = first.clone();
    for t in rest {
        acc = join_tables(&acc, t, on)?;
    }
    Ok(acc)
}
