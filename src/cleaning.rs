//! Text and column cleaning: remark normalization, place-name aliasing,
//! voyage-id fixing, and date standardization.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;
use crate::table::Table;

/// Known alternative spellings seen in the transcribed rolls.
const PLACE_ALIASES: &[(&str, &str)] = &[
    ("St. Johns", "St Johns"),
    ("St. John's", "St Johns"),
    ("N. York", "New York"),
];

/// Normalize a single free-text cell: missing stays missing; otherwise the
/// literal `[nan]` marker is removed and surrounding whitespace trimmed.
/// Total — never fails.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    value.map(|s| s.replace("[nan]", "").trim().to_string())
}

/// Normalize a place name: unify apostrophes, strip list punctuation,
/// collapse whitespace, then apply the alias map.
pub fn normalize_place(name: Option<&str>) -> Option<String> {
    let name = name?;
    let s: String = name
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            other => other,
        })
        .filter(|c| *c != ',' && *c != ';')
        .collect();
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");

    let mapped = PLACE_ALIASES
        .iter()
        .find(|(from, _)| *from == s)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or(s);
    Some(mapped)
}

static RE_ID_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\s_]+").expect("id separators regex"));
static RE_ID_DASH_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("id dash runs regex"));

/// Standardize a voyage id: stray separators become single dashes.
pub fn fix_voyage_id(id: Option<&str>) -> Option<String> {
    let id = id?;
    let s = RE_ID_SEPARATORS.replace_all(id.trim(), "-");
    let s = RE_ID_DASH_RUNS.replace_all(&s, "-");
    Some(s.into_owned())
}

/// Re-emit a `d/m/yyyy`-shaped date as zero-padded `dd/mm/yyyy`.
/// Tokens that merely look like dates but do not parse (e.g. 99/99/1750)
/// yield `None` — a malformed date is an extraction miss, not an error.
pub fn standardize_date(raw: &str) -> Option<String> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
        .ok()
        .map(|d| d.format("%d/%m/%Y").to_string())
}

/// Apply `normalize_place` to every cell of one column.
pub fn clean_places(table: &mut Table, column: &str) -> Result<(), PipelineError> {
    let col = table.require_column(column)?;
    for row in 0..table.n_rows() {
        let cleaned = normalize_place(table.get(row, col));
        table.set(row, col, cleaned);
    }
    Ok(())
}

/// Apply `fix_voyage_id` to every cell of one column.
pub fn fix_voyage_ids(table: &mut Table, column: &str) -> Result<(), PipelineError> {
    let col = table.require_column(column)?;
    for row in 0..table.n_rows() {
        let fixed = fix_voyage_id(table.get(row, col));
        table.set(row, col, fixed);
    }
    Ok(())
}
