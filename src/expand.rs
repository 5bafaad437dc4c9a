//! Leg expansion and embark-location backfill.
//!
//! Expansion turns each roll row into one row per voyage leg and materializes
//! the extracted movement columns. Backfill then walks the sorted table and
//! fills a leg's missing embarkation port from the previous leg's
//! disembarkation port, but only for legs that carry a `rembarqué` clause and
//! only within one person's run of rows.

use crate::error::PipelineError;
use crate::extractor::{split_remarks, RemarkScanner};
use crate::table::Table;

pub const COL_REMARKS: &str = "Remarks";
pub const COL_EMB_LOC: &str = "Emb_loc";
pub const COL_EMB_DATE: &str = "Emb_date";
pub const COL_DISEMB_LOC: &str = "Disemb_loc";
pub const COL_DISEMB_DATE: &str = "Disemb_date";

/// Columns identifying a person; backfill never crosses a boundary where
/// any of these differ.
const PERSON_COLUMNS: &[&str] = &["Last Name", "First Name", "Function"];

/// Expand every row into one row per leg of its remark.
///
/// Output rows keep all original cells. The remark cell is replaced by the
/// leg's own text, and the four movement columns are written unconditionally
/// from extraction, so stale input values never survive. A row with no
/// usable remark still produces exactly one output row, with the movement
/// columns unset.
pub fn expand_legs(table: &Table, scanner: &RemarkScanner) -> Result<Table, PipelineError> {
    let remarks_col = table.require_column(COL_REMARKS)?;

    let mut out = Table::new(table.headers().to_vec());
    let emb_loc = out.ensure_column(COL_EMB_LOC);
    let emb_date = out.ensure_column(COL_EMB_DATE);
    let disemb_loc = out.ensure_column(COL_DISEMB_LOC);
    let disemb_date = out.ensure_column(COL_DISEMB_DATE);

    for i in 0..table.n_rows() {
        for leg in split_remarks(table.get(i, remarks_col)) {
            let mut row: Vec<Option<String>> = table.row(i).to_vec();
            row.resize(out.n_cols(), None);
            out.push_row(row);

            let r = out.n_rows() - 1;
            out.set(r, remarks_col, leg.clone());
            let details = match leg.as_deref() {
                Some(text) => scanner.extract_details(text),
                None => Default::default(),
            };
            out.set(r, emb_loc, details.embark_location);
            out.set(r, emb_date, details.embark_date);
            out.set(r, disemb_loc, details.disembark_location);
            out.set(r, disemb_date, details.disembark_date);
        }
    }

    Ok(out)
}

/// Sort rows so each person's legs sit together in embarkation-date order.
/// Rows with missing keys go last within their group, keeping input order.
/// Every sort column must exist; a roll without the person columns cannot
/// be ordered for backfill.
pub fn sort_for_backfill(table: &mut Table) -> Result<(), PipelineError> {
    let mut cols = Vec::with_capacity(PERSON_COLUMNS.len() + 1);
    for name in PERSON_COLUMNS {
        cols.push(table.require_column(name)?);
    }
    cols.push(table.require_column(COL_EMB_DATE)?);
    table.sort_by_columns(&cols);
    Ok(())
}

/// Fill missing embarkation ports from the previous row's disembarkation
/// port. The table must already be sorted by `sort_for_backfill`. Reads see
/// earlier writes of the same pass, so a chain of consecutive re-embarkation
/// legs propagates one port forward. Returns how many cells were filled.
pub fn backfill_embark_locations(table: &mut Table) -> Result<usize, PipelineError> {
    let remarks = table.require_column(COL_REMARKS)?;
    let emb_loc = table.require_column(COL_EMB_LOC)?;
    let disemb_loc = table.require_column(COL_DISEMB_LOC)?;
    let mut person_cols = Vec::with_capacity(PERSON_COLUMNS.len());
    for name in PERSON_COLUMNS {
        person_cols.push(table.require_column(name)?);
    }

    let mut filled = 0;
    for i in 1..table.n_rows() {
        if table.get(i, emb_loc).is_some() {
            continue;
        }
        let has_reembark = table
            .get(i, remarks)
            .is_some_and(|r| r.to_lowercase().contains("rembarqué"));
        if !has_reembark {
            continue;
        }
        let same_person = person_cols
            .iter()
            .all(|&c| table.get(i, c) == table.get(i - 1, c));
        if !same_person {
            continue;
        }
        if let Some(port) = table.get(i - 1, disemb_loc).map(str::to_string) {
            table.set(i, emb_loc, Some(port));
            filled += 1;
        }
    }
    Ok(filled)
}
