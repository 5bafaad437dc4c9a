//! End-to-end processing stages, in fixed order: load, prune, clean,
//! expand, sort, backfill, re-derive dates, annotate, write.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::classification::{classify_disembark, classify_embark};
use crate::cleaning::{clean_places, clean_text, fix_voyage_ids, standardize_date};
use crate::error::PipelineError;
use crate::expand::{
    backfill_embark_locations, expand_legs, sort_for_backfill, COL_DISEMB_DATE, COL_DISEMB_LOC,
    COL_EMB_DATE, COL_EMB_LOC, COL_REMARKS,
};
use crate::extractor::{extract_date, RemarkScanner};
use crate::join::join_many;
use crate::routes::RouteGraph;
use crate::table::Table;

pub const COL_DETAILS: &str = "details";
pub const COL_EMB_CLASS: &str = "emb_class";
pub const COL_DISEMB_CLASS: &str = "disemb_class";

#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_rows: usize,
    pub dropped_columns: usize,
    pub backfilled: usize,
}

/// Run every stage on an in-memory roll.
pub fn process_table(mut table: Table) -> Result<(Table, PipelineSummary), PipelineError> {
    let scanner = RemarkScanner::new();
    let mut summary = PipelineSummary {
        rows_in: table.n_rows(),
        ..Default::default()
    };

    summary.dropped_rows = table.drop_empty_rows();
    summary.dropped_columns = table.drop_empty_columns();
    info!(
        dropped_rows = summary.dropped_rows,
        dropped_columns = summary.dropped_columns,
        "pruned empty rows and columns"
    );

    for name in [COL_REMARKS, COL_EMB_LOC, COL_DISEMB_LOC] {
        if let Some(col) = table.column_index(name) {
            for i in 0..table.n_rows() {
                let cleaned = clean_text(table.get(i, col));
                table.set(i, col, cleaned);
            }
        }
    }

    let mut table = expand_legs(&table, &scanner)?;
    info!(rows = table.n_rows(), "expanded remarks into legs");

    sort_for_backfill(&mut table)?;
    summary.backfilled = backfill_embark_locations(&mut table)?;
    // second pass over the same ordering, after the first pass's writes
    summary.backfilled += backfill_embark_locations(&mut table)?;
    info!(filled = summary.backfilled, "backfilled embark locations");

    rederive_dates(&mut table)?;
    annotate(&mut table, &scanner)?;

    summary.rows_out = table.n_rows();
    Ok((table, summary))
}

/// Overwrite both date columns with the first date token of the leg's
/// remark, normalized to `dd/mm/yyyy`. Legs without a parseable token end
/// up with both dates unset, whatever the family grammars extracted.
fn rederive_dates(table: &mut Table) -> Result<(), PipelineError> {
    let remarks = table.require_column(COL_REMARKS)?;
    let emb_date = table.ensure_column(COL_EMB_DATE);
    let disemb_date = table.ensure_column(COL_DISEMB_DATE);

    for i in 0..table.n_rows() {
        let date = table
            .get(i, remarks)
            .and_then(extract_date)
            .and_then(|raw| standardize_date(&raw));
        table.set(i, emb_date, date.clone());
        table.set(i, disemb_date, date);
    }
    Ok(())
}

/// Add the JSON details column and both reason-code columns.
fn annotate(table: &mut Table, scanner: &RemarkScanner) -> Result<(), PipelineError> {
    let remarks = table.require_column(COL_REMARKS)?;
    let emb_loc = table.require_column(COL_EMB_LOC)?;
    let disemb_loc = table.require_column(COL_DISEMB_LOC)?;
    let details_col = table.ensure_column(COL_DETAILS);
    let emb_class = table.ensure_column(COL_EMB_CLASS);
    let disemb_class = table.ensure_column(COL_DISEMB_CLASS);

    for i in 0..table.n_rows() {
        let remark = table.get(i, remarks).map(str::to_string);
        let details = remark
            .as_deref()
            .map(|text| scanner.extract_details(text))
            .unwrap_or_default();
        table.set(i, details_col, Some(serde_json::to_string(&details)?));

        let emb = classify_embark(remark.as_deref());
        let disemb = classify_disembark(
            remark.as_deref(),
            table.get(i, emb_loc),
            table.get(i, disemb_loc),
        );
        table.set(i, emb_class, Some(emb.code().to_string()));
        table.set(i, disemb_class, Some(disemb.code().to_string()));
    }
    Ok(())
}

/// Process one roll CSV into an annotated per-leg CSV.
pub fn run_process(input: &Path, output: &Path) -> Result<PipelineSummary, PipelineError> {
    info!(path = %input.display(), "loading roll");
    let table = Table::from_csv_path(input)?;
    let (table, summary) = process_table(table)?;
    table.to_csv_path(output)?;
    info!(rows = summary.rows_out, path = %output.display(), "wrote processed roll");
    Ok(summary)
}

/// Join several source CSVs on a key column and tidy shared columns.
pub fn run_prepare(
    inputs: &[PathBuf],
    output: &Path,
    on: &str,
    explode_column: Option<&str>,
    place_column: Option<&str>,
    voyage_id_column: Option<&str>,
) -> Result<usize, PipelineError> {
    let mut tables = Vec::with_capacity(inputs.len());
    for path in inputs {
        info!(path = %path.display(), "loading source table");
        tables.push(Table::from_csv_path(path)?);
    }
    let mut joined = join_many(&tables, on)?;
    if let Some(name) = explode_column {
        let col = joined.require_column(name)?;
        let before = joined.n_rows();
        joined.explode_column(col);
        info!(column = name, rows_added = joined.n_rows() - before, "exploded index column");
    }
    if let Some(col) = voyage_id_column {
        fix_voyage_ids(&mut joined, col)?;
    }
    if let Some(col) = place_column {
        clean_places(&mut joined, col)?;
    }
    joined.to_csv_path(output)?;
    info!(rows = joined.n_rows(), path = %output.display(), "wrote joined table");
    Ok(joined.n_rows())
}

/// Build the route graph from a processed roll.
pub fn run_routes(input: &Path, from: &str, to: &str) -> Result<RouteGraph, PipelineError> {
    let table = Table::from_csv_path(input)?;
    RouteGraph::from_table(&table, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_named(t: &Table, row: usize, col: &str) -> Option<String> {
        t.get(row, t.column_index(col).unwrap()).map(str::to_string)
    }

    fn roll_with_remark(remark: &str) -> Table {
        let mut t = Table::new(vec![
            "Last Name".into(),
            "First Name".into(),
            "Function".into(),
            COL_REMARKS.into(),
        ]);
        t.push_row(vec![
            Some("Durand".into()),
            Some("Jean".into()),
            Some("matelot".into()),
            Some(remark.into()),
        ]);
        t
    }

    #[test]
    fn test_process_three_leg_remark() {
        let t = roll_with_remark(
            "embarqué à Brest le 01/01/1750 débarqué à Toulon le 02/02/1750 \
             rembarqué le 03/03/1750 rembarqué à Lorient le 04/04/1750",
        );
        let (out, summary) = process_table(t).unwrap();

        assert_eq!(summary.rows_in, 1);
        assert_eq!(summary.rows_out, 3);
        assert_eq!(summary.backfilled, 1);

        // leg 1: full embark and disembark clauses
        assert_eq!(get_named(&out, 0, COL_EMB_LOC).as_deref(), Some("Brest"));
        assert_eq!(get_named(&out, 0, COL_DISEMB_LOC).as_deref(), Some("Toulon"));
        // leg 2: embark port backfilled from leg 1's disembark port
        assert_eq!(get_named(&out, 1, COL_EMB_LOC).as_deref(), Some("Toulon"));
        assert_eq!(get_named(&out, 1, COL_DISEMB_LOC), None);
        // leg 3: no verb of its own, nothing extracted or filled
        assert_eq!(get_named(&out, 2, COL_EMB_LOC), None);

        // both date columns re-derive from the leg's first date token
        for (row, date) in [(0, "01/01/1750"), (1, "03/03/1750"), (2, "04/04/1750")] {
            assert_eq!(get_named(&out, row, COL_EMB_DATE).as_deref(), Some(date));
            assert_eq!(get_named(&out, row, COL_DISEMB_DATE).as_deref(), Some(date));
        }

        assert_eq!(get_named(&out, 0, COL_EMB_CLASS).as_deref(), Some("301"));
        assert_eq!(get_named(&out, 1, COL_EMB_CLASS).as_deref(), Some("301"));
        assert_eq!(get_named(&out, 2, COL_EMB_CLASS).as_deref(), Some("309"));
        for row in 0..3 {
            assert_eq!(get_named(&out, row, COL_DISEMB_CLASS).as_deref(), Some("302"));
        }

        let details: crate::extractor::ExtractedDetails =
            serde_json::from_str(&get_named(&out, 0, COL_DETAILS).unwrap()).unwrap();
        assert_eq!(details.embark_location.as_deref(), Some("Brest"));
    }

    #[test]
    fn test_process_keeps_blank_remark_rows() {
        let mut t = roll_with_remark("embarqué à Brest le 01/01/1750");
        t.push_row(vec![
            Some("Martin".into()),
            Some("Paul".into()),
            Some("matelot".into()),
            None,
        ]);
        let (out, summary) = process_table(t).unwrap();
        assert_eq!(summary.rows_out, 2);
        let martin = (0..out.n_rows())
            .find(|&i| get_named(&out, i, "Last Name").as_deref() == Some("Martin"))
            .unwrap();
        assert_eq!(get_named(&out, martin, COL_EMB_CLASS).as_deref(), Some("309"));
        assert_eq!(get_named(&out, martin, COL_DISEMB_CLASS).as_deref(), Some("309"));
        assert_eq!(get_named(&out, martin, COL_EMB_DATE), None);
    }

    #[test]
    fn test_process_missing_remarks_column_is_fatal() {
        let mut t = Table::new(vec!["Last Name".into()]);
        t.push_row(vec![Some("Durand".into())]);
        assert!(matches!(
            process_table(t),
            Err(PipelineError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_run_process_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("roll.csv");
        let output = dir.path().join("out.csv");
        roll_with_remark("embarqué à Nantes le 01/01/1750 mort en mer le 19/06/1752")
            .to_csv_path(&input)
            .unwrap();

        let summary = run_process(&input, &output).unwrap();
        assert_eq!(summary.rows_out, 1);

        let out = Table::from_csv_path(&output).unwrap();
        assert_eq!(get_named(&out, 0, COL_EMB_LOC).as_deref(), Some("Nantes"));
        assert_eq!(get_named(&out, 0, COL_DISEMB_LOC).as_deref(), Some("at sea"));
        assert_eq!(get_named(&out, 0, COL_DISEMB_CLASS).as_deref(), Some("305"));
    }

    #[test]
    fn test_run_prepare_joins_and_cleans() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let out_path = dir.path().join("joined.csv");

        let mut left = Table::new(vec!["voyage_id".into(), "place".into()]);
        left.push_row(vec![Some("v 1".into()), Some("St. John's".into())]);
        left.to_csv_path(&a).unwrap();

        let mut right = Table::new(vec!["voyage_id".into(), "captain".into()]);
        right.push_row(vec![Some("v 1".into()), Some("Morel".into())]);
        right.to_csv_path(&b).unwrap();

        // ids are fixed after the join, so the raw keys still match
        let rows = run_prepare(
            &[a, b],
            &out_path,
            "voyage_id",
            None,
            Some("place"),
            Some("voyage_id"),
        )
        .unwrap();
        assert_eq!(rows, 1);

        let out = Table::from_csv_path(&out_path).unwrap();
        assert_eq!(get_named(&out, 0, "voyage_id").as_deref(), Some("v-1"));
        assert_eq!(get_named(&out, 0, "place").as_deref(), Some("St Johns"));
        assert_eq!(get_named(&out, 0, "captain").as_deref(), Some("Morel"));
    }

    #[test]
    fn test_run_prepare_explodes_index_column() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let out_path = dir.path().join("exploded.csv");

        let mut src = Table::new(vec!["record_index".into(), "ship".into()]);
        src.push_row(vec![Some("12/13".into()), Some("Junon".into())]);
        src.push_row(vec![Some("14".into()), Some("Aurore".into())]);
        src.to_csv_path(&a).unwrap();

        let rows = run_prepare(&[a], &out_path, "record_index", Some("record_index"), None, None)
            .unwrap();
        assert_eq!(rows, 3);

        let out = Table::from_csv_path(&out_path).unwrap();
        assert_eq!(get_named(&out, 0, "record_index").as_deref(), Some("12"));
        assert_eq!(get_named(&out, 1, "record_index").as_deref(), Some("13"));
        assert_eq!(get_named(&out, 1, "ship").as_deref(), Some("Junon"));
        assert_eq!(get_named(&out, 2, "record_index").as_deref(), Some("14"));
    }

    #[test]
    fn test_run_prepare_unknown_explode_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let out_path = dir.path().join("out.csv");
        let mut src = Table::new(vec!["k".into()]);
        src.push_row(vec![Some("1".into())]);
        src.to_csv_path(&a).unwrap();

        let err = run_prepare(&[a], &out_path, "k", Some("nope"), None, None).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(_)));
        assert!(!out_path.exists());
    }
}
