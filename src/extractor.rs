//! Remark splitting and pattern-family extraction.
//!
//! Remarks are free-text French administrative notes from 18th/19th-century
//! crew rolls. Real data examples:
//!
//!   embarqué à Brest le 01/01/1750 débarqué à Toulon le 12/08/1750
//!   embarqué à Lorient le 03/02/1752 mort en mer le 19/06/1752
//!   resté à terre malade au départ de Paimboeuf le 09/04/1749
//!   trouvé caché à bord après le départ de Brest le 07/03/1755
//!   débarqué malade à l'hôpital de Port Louis le 30/11/1751
//!
//! A remark may chain several voyage legs with `rembarqué`; legs are split
//! off first, then each leg goes through two independent cascades of
//! mutually-exclusive pattern families (embarkation and disembarkation).
//! First matching family wins; unmatched fields stay unset. Extraction is
//! total — malformed text degrades to "no extraction", never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Location sentinel: the person never went ashore.
pub const AT_SEA: &str = "at sea";
/// Location sentinel: the event happened on the vessel itself.
pub const ON_BOARD: &str = "on board";

/// Structured fields extracted from one leg of a remark.
///
/// Unset means the leg's text gave no information — distinct from the
/// explicit `"at sea"` / `"on board"` sentinels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDetails {
    pub embark_location: Option<String>,
    pub embark_date: Option<String>,
    pub disembark_location: Option<String>,
    pub disembark_date: Option<String>,
}

// ── Leg splitting ──────────────────────────────────────────────────

static RE_REEMBARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rembarqué").expect("reembark regex"));

/// Split a remark into voyage legs at every `rembarqué` boundary.
///
/// The split point sits immediately *after* the token, so the token stays
/// attached to the leg that precedes it — that leg owns the re-embarkation
/// clause, and the backfill pass keys on it. Segments that trim to empty
/// are dropped. A missing or blank remark yields a single `None` leg, so
/// the row expander still emits exactly one row for it.
pub fn split_remarks(remarks: Option<&str>) -> Vec<Option<String>> {
    let Some(text) = remarks else {
        return vec![None];
    };

    let mut legs = Vec::new();
    let mut start = 0;
    for m in RE_REEMBARK.find_iter(text) {
        let seg = text[start..m.end()].trim();
        if !seg.is_empty() {
            legs.push(Some(seg.to_string()));
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        legs.push(Some(tail.to_string()));
    }

    if legs.is_empty() {
        // blank remark, or one that trimmed away entirely
        vec![None]
    } else {
        legs
    }
}

// ── Generic date token ─────────────────────────────────────────────

static RE_DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").expect("date token regex"));

/// First date-looking token anywhere in the text, as written.
pub fn extract_date(text: &str) -> Option<String> {
    RE_DATE_TOKEN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// ── Pattern families ───────────────────────────────────────────────

/// One family's grammar: a date pattern and a location pattern, matched
/// independently (a leg can carry one without the other).
struct Grammar {
    /// When set, the date pattern only sees the clause running from this
    /// anchor to the next disembarkation verb — a date belonging to the
    /// disembarkation clause must not leak into the embarkation date.
    anchor: Option<Regex>,
    date: Regex,
    location: Regex,
}

/// Dispatch entry: lowercase keywords that select this family.
struct Family {
    keywords: &'static [&'static str],
    grammar: Grammar,
}

/// Compiled extraction engine. Build once, reuse across all rows.
pub struct RemarkScanner {
    embark: Vec<Family>,
    disembark: Vec<Family>,
    /// Disembarkation-reason verbs that end an embarkation clause.
    stop: Regex,
    re_died_on_board: Regex,
    re_died_at_sea: Regex,
    re_born_at_sea: Regex,
    re_born_on_board: Regex,
}

impl RemarkScanner {
    pub fn new() -> Self {
        // Shared fragments. `infl` covers the -é/-ée/-és/-ées inflections,
        // `loc` is a lazy place-name chunk, `date` an explicit day/month/year.
        let infl = r"(?:es|e|s)?";
        let loc = r"[\w\s'-]+?";
        let date = r"\d{2}/\d{2}/\d{4}";
        let stop_verbs = format!(
            r"\b(?:débarqué{infl}|déserté{infl}|mort{infl}|passé{infl}|resté{infl}|tombé{infl})\b"
        );

        let embark = vec![
            Family {
                keywords: &["embarqué", "rembarqué"],
                grammar: Grammar {
                    anchor: Some(
                        Regex::new(&format!(r"(?i)\br?embarqué{infl}\b"))
                            .expect("embarked anchor"),
                    ),
                    date: Regex::new(&format!(r"(?i)\br?embarqué{infl}\b.*? le ({date})\b"))
                        .expect("embarked date"),
                    location: Regex::new(&format!(
                        r"(?i)\br?embarqué{infl}\b à ({loc})(?: {stop_verbs}| le {date}|,| ---|\n|$)"
                    ))
                    .expect("embarked location"),
                },
            },
            Family {
                keywords: &["fait la campagne"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(r"(?i)\bremplacement du ({date})"))
                        .expect("campaign date"),
                    location: Regex::new(&format!(r"(?i)\b[aà] fait la campagne de ({loc}) à "))
                        .expect("campaign location"),
                },
            },
            Family {
                keywords: &["supplément"],
                grammar: Grammar {
                    anchor: Some(Regex::new(r"(?i)\bsupplément\b").expect("supplement anchor")),
                    date: Regex::new(&format!(r"(?i)\bsupplément à {loc} du ({date})"))
                        .expect("supplement date"),
                    location: Regex::new(&format!(r"(?i)\bsupplément à ({loc}) du {date}"))
                        .expect("supplement location"),
                },
            },
            Family {
                keywords: &["remplacement"],
                grammar: Grammar {
                    anchor: Some(Regex::new(r"(?i)\bremplacement\b").expect("replacement anchor")),
                    date: Regex::new(&format!(
                        r"(?i)\bremplacement (?:au|à)?{loc}(?: le| du) ({date})"
                    ))
                    .expect("replacement date"),
                    location: Regex::new(&format!(
                        r"(?i)\bremplacement (?:au|à)? ({loc})(?: en| le| du|\n|,| ---|$)"
                    ))
                    .expect("replacement location"),
                },
            },
            Family {
                keywords: &["trouvé"],
                grammar: Grammar {
                    anchor: Some(
                        Regex::new(&format!(r"(?i)\btrouvé{infl} caché{infl} à bord"))
                            .expect("stowaway anchor"),
                    ),
                    date: Regex::new(&format!(
                        r"(?i)\btrouvé{infl} caché{infl} à bord[^\n]*? le ({date})"
                    ))
                    .expect("stowaway date"),
                    location: Regex::new(&format!(
                        r"(?i)\btrouvé{infl} caché{infl} à bord (?:après le départ de|le {date})\s+({loc})(?: le {date}| ---|,|\n|$| (?:débarqué{infl}|sert|déserté{infl}|mort{infl}|passé{infl})\b)"
                    ))
                    .expect("stowaway location"),
                },
            },
        ];

        // Optional qualifiers between the verb and the place name, longest
        // alternative first so the place capture starts after the qualifier.
        let disembarked_qualifiers = r"(?:désarmement à |malade et mort à l'hôpital (?:de|du) |malade à l'hôpital (?:de|du) |malade à )?";
        let remained_prefixes = r"(?:malade au départ de|malade à l'hôpital de|à terre au départ de|à terre malade au départ de|à terre malade à|à|en|au départ de)";

        let disembark = vec![
            Family {
                keywords: &["débarqué"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(r"(?i)\bdébarqué{infl}.*? le ({date})\b"))
                        .expect("disembarked date"),
                    location: Regex::new(&format!(
                        r"(?i)\bdébarqué{infl} (?:au |à |furtivement à |malade après être tombé du haut mal à )?{disembarked_qualifiers}({loc})(?: le {date}| ---|,|\n|$| mort{infl}\b)"
                    ))
                    .expect("disembarked location"),
                },
            },
            Family {
                keywords: &["déserté"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(
                        r"(?i)\bdéserté{infl} (?:à {loc}|sur le vaisseau de côte le {loc}|en {loc}) le ({date})"
                    ))
                    .expect("deserted date"),
                    location: Regex::new(&format!(
                        r"(?i)\bdéserté{infl} (?:à|en|au départ de) ({loc})(?: le|\n|,| ---|$)"
                    ))
                    .expect("deserted location"),
                },
            },
            Family {
                keywords: &["mort"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(
                        r"(?i)\b(?:mort{infl} (?:en mer|noyé en {loc}|du {loc} en {loc}|à l'hôpital de {loc}|à la ration|à {loc})|tombé à la mer et mort noyé) le ({date})"
                    ))
                    .expect("died date"),
                    location: Regex::new(&format!(
                        r"(?i)\bmort{infl} (?:en mer|à l'hôpital (?:du|de)|à la ration|à) ({loc}) le {date}"
                    ))
                    .expect("died location"),
                },
            },
            Family {
                keywords: &["passé"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(
                        r"(?i)\bpassé{infl} sur la {loc} en rade de {loc} le ({date})"
                    ))
                    .expect("transferred date"),
                    location: Regex::new(&format!(
                        r"(?i)\bpassé{infl} sur la {loc} en rade de ({loc})(?: le {date}|,| ---|\n|$)"
                    ))
                    .expect("transferred location"),
                },
            },
            Family {
                keywords: &["fait la campagne"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(r"(?i)\blevé{infl} du ({date})"))
                        .expect("campaign-end date"),
                    location: Regex::new(&format!(
                        r"(?i)\b[aà] fait la campagne de {loc} à ({loc})(?:\s*(?:du|le) {date}|\s*---|,| en |\n|$)"
                    ))
                    .expect("campaign-end location"),
                },
            },
            Family {
                keywords: &["resté"],
                grammar: Grammar {
                    anchor: None,
                    date: Regex::new(&format!(
                        r"(?i)\bresté{infl} {remained_prefixes} {loc} le\s*({date})(?: rejoint|\n|,| ---|$)"
                    ))
                    .expect("remained date"),
                    location: Regex::new(&format!(
                        r"(?i)\bresté{infl} {remained_prefixes} ({loc})(?: le| rejoint|\n|,| ---|$)"
                    ))
                    .expect("remained location"),
                },
            },
        ];

        RemarkScanner {
            embark,
            disembark,
            stop: Regex::new(&format!("(?i){stop_verbs}")).expect("stop verbs regex"),
            re_died_on_board: Regex::new(&format!(r"(?i)mort{infl} à bord"))
                .expect("died-on-board regex"),
            re_died_at_sea: Regex::new(&format!(r"(?i)mort{infl} en mer"))
                .expect("died-at-sea regex"),
            re_born_at_sea: Regex::new(&format!(r"(?i)né{infl} en mer"))
                .expect("born-at-sea regex"),
            re_born_on_board: Regex::new(&format!(r"(?i)né{infl} à bord"))
                .expect("born-on-board regex"),
        }
    }

    /// Extract embarkation and disembarkation details from one leg.
    pub fn extract_details(&self, text: &str) -> ExtractedDetails {
        let lower = text.to_lowercase();
        let mut details = ExtractedDetails::default();

        if let Some(grammar) = family_for(&self.embark, &lower) {
            details.embark_date = self.date_in_clause(text, grammar);
            details.embark_location = capture(&grammar.location, text);
        }
        if let Some(grammar) = family_for(&self.disembark, &lower) {
            details.disembark_date = self.date_in_clause(text, grammar);
            details.disembark_location = capture(&grammar.location, text);
        }

        // Sentinel overrides come last and win over anything captured above.
        if self.re_died_on_board.is_match(text) {
            details.disembark_location = Some(ON_BOARD.to_string());
        } else if self.re_died_at_sea.is_match(text) {
            details.disembark_location = Some(AT_SEA.to_string());
        }
        if self.re_born_at_sea.is_match(text) {
            details.embark_location = Some(AT_SEA.to_string());
        } else if self.re_born_on_board.is_match(text) {
            details.embark_location = Some(ON_BOARD.to_string());
        }

        details
    }

    /// Run a family's date pattern. With an anchor, only the clause between
    /// each anchor occurrence and the next disembarkation verb is searched,
    /// so the terminator set is never crossed.
    fn date_in_clause(&self, text: &str, grammar: &Grammar) -> Option<String> {
        let Some(anchor) = &grammar.anchor else {
            return capture(&grammar.date, text);
        };
        for m in anchor.find_iter(text) {
            let stop_at = self
                .stop
                .find(&text[m.end()..])
                .map(|s| m.end() + s.start())
                .unwrap_or(text.len());
            if let Some(d) = capture(&grammar.date, &text[m.start()..stop_at]) {
                return Some(d);
            }
        }
        None
    }
}

impl Default for RemarkScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// First family whose keyword appears in the lowercased text wins;
/// families after it are never consulted.
fn family_for<'a>(families: &'a [Family], lower: &str) -> Option<&'a Grammar> {
    families
        .iter()
        .find(|f| f.keywords.iter().any(|k| lower.contains(k)))
        .map(|f| &f.grammar)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> RemarkScanner {
        RemarkScanner::new()
    }

    // ── split_remarks ────────────────────────────────────────────────

    #[test]
    fn test_split_no_boundary_single_leg() {
        let legs = split_remarks(Some("  embarqué à Brest le 01/01/1750  "));
        assert_eq!(legs, vec![Some("embarqué à Brest le 01/01/1750".into())]);
    }

    #[test]
    fn test_split_missing_and_blank() {
        assert_eq!(split_remarks(None), vec![None]);
        assert_eq!(split_remarks(Some("   ")), vec![None]);
    }

    #[test]
    fn test_split_token_stays_with_preceding_leg() {
        let legs = split_remarks(Some("embarqué à Brest rembarqué à Lorient"));
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].as_deref(), Some("embarqué à Brest rembarqué"));
        assert_eq!(legs[1].as_deref(), Some("à Lorient"));
    }

    #[test]
    fn test_split_case_insensitive_and_ordered() {
        let legs = split_remarks(Some("a REMBARQUÉ b rembarqué c"));
        assert_eq!(legs.len(), 3);
        assert_eq!(legs[0].as_deref(), Some("a REMBARQUÉ"));
        assert_eq!(legs[1].as_deref(), Some("b rembarqué"));
        assert_eq!(legs[2].as_deref(), Some("c"));
    }

    #[test]
    fn test_split_trailing_boundary_yields_no_empty_leg() {
        let legs = split_remarks(Some("débarqué à Toulon rembarqué"));
        assert_eq!(legs, vec![Some("débarqué à Toulon rembarqué".into())]);
    }

    // ── extract_date ─────────────────────────────────────────────────

    #[test]
    fn test_extract_date_first_token() {
        assert_eq!(
            extract_date("débarqué le 2/3/1750 puis le 04/05/1751"),
            Some("2/3/1750".to_string())
        );
        assert_eq!(extract_date("aucune date ici"), None);
    }

    // ── embarked family ──────────────────────────────────────────────

    #[test]
    fn test_embarked_location_and_date() {
        let d = scanner().extract_details("embarqué à Nantes le 01/01/1750");
        assert_eq!(d.embark_location.as_deref(), Some("Nantes"));
        assert_eq!(d.embark_date.as_deref(), Some("01/01/1750"));
        assert_eq!(d.disembark_location, None);
    }

    #[test]
    fn test_embarked_location_stops_before_disembark_verb() {
        let d = scanner().extract_details("embarqué à Brest débarqué à Toulon le 02/02/1750");
        assert_eq!(d.embark_location.as_deref(), Some("Brest"));
        // the date belongs to the disembarkation clause, not the embarkation
        assert_eq!(d.embark_date, None);
        assert_eq!(d.disembark_location.as_deref(), Some("Toulon"));
        assert_eq!(d.disembark_date.as_deref(), Some("02/02/1750"));
    }

    #[test]
    fn test_bare_reembark_leg_has_no_embark_fields() {
        // A leg that ends at the split boundary carries the token but no
        // location clause of its own — the backfill pass fills it later.
        let d = scanner().extract_details("le 03/03/1750 rembarqué");
        assert_eq!(d.embark_location, None);
        assert_eq!(d.embark_date, None);
    }

    #[test]
    fn test_embarked_date_without_location() {
        let d = scanner().extract_details("embarqué le 07/09/1748");
        assert_eq!(d.embark_date.as_deref(), Some("07/09/1748"));
        assert_eq!(d.embark_location, None);
    }

    // ── other embark families ────────────────────────────────────────

    #[test]
    fn test_campaign_embark_and_disembark_places() {
        let d = scanner().extract_details("a fait la campagne de Brest à Québec");
        assert_eq!(d.embark_location.as_deref(), Some("Brest"));
        assert_eq!(d.disembark_location.as_deref(), Some("Québec"));
    }

    #[test]
    fn test_supplement_family() {
        let d = scanner().extract_details("supplément à Rochefort du 05/05/1750");
        assert_eq!(d.embark_location.as_deref(), Some("Rochefort"));
        assert_eq!(d.embark_date.as_deref(), Some("05/05/1750"));
    }

    #[test]
    fn test_replacement_family() {
        let d = scanner().extract_details("remplacement à Lorient le 02/02/1750");
        assert_eq!(d.embark_location.as_deref(), Some("Lorient"));
        assert_eq!(d.embark_date.as_deref(), Some("02/02/1750"));
    }

    #[test]
    fn test_stowaway_family() {
        let d = scanner().extract_details("trouvé caché à bord après le départ de Brest le 07/03/1755");
        assert_eq!(d.embark_location.as_deref(), Some("Brest"));
        assert_eq!(d.embark_date.as_deref(), Some("07/03/1755"));
    }

    #[test]
    fn test_family_priority_embarked_wins_over_supplement() {
        // both keywords present — "embarqué" is tested first and wins
        let d = scanner().extract_details("embarqué à Nantes le 01/01/1750 supplément à Brest du 02/02/1750");
        assert_eq!(d.embark_location.as_deref(), Some("Nantes"));
    }

    // ── disembark families ───────────────────────────────────────────

    #[test]
    fn test_disembarked_with_hospital_qualifier() {
        let d = scanner().extract_details("débarqué malade à l'hôpital de Port Louis le 30/11/1751");
        assert_eq!(d.disembark_location.as_deref(), Some("Port Louis"));
        assert_eq!(d.disembark_date.as_deref(), Some("30/11/1751"));
    }

    #[test]
    fn test_disembarked_stops_before_trailing_mort() {
        let d = scanner().extract_details("débarqué à Toulon mort le 04/06/1750");
        assert_eq!(d.disembark_location.as_deref(), Some("Toulon"));
    }

    #[test]
    fn test_deserted_family() {
        let d = scanner().extract_details("déserté à Cadix le 03/03/1750");
        assert_eq!(d.disembark_location.as_deref(), Some("Cadix"));
        assert_eq!(d.disembark_date.as_deref(), Some("03/03/1750"));
    }

    #[test]
    fn test_transferred_family() {
        let d = scanner().extract_details("passé sur la Junon en rade de Brest le 04/04/1750");
        assert_eq!(d.disembark_location.as_deref(), Some("Brest"));
        assert_eq!(d.disembark_date.as_deref(), Some("04/04/1750"));
    }

    #[test]
    fn test_remained_family_with_long_prefix() {
        let d = scanner().extract_details("resté à terre malade au départ de Paimboeuf le 09/04/1749");
        assert_eq!(d.disembark_location.as_deref(), Some("Paimboeuf"));
        assert_eq!(d.disembark_date.as_deref(), Some("09/04/1749"));
    }

    #[test]
    fn test_no_family_no_extraction() {
        let d = scanner().extract_details("fils de Jean et de Marie");
        assert_eq!(d, ExtractedDetails::default());
    }

    // ── sentinels ────────────────────────────────────────────────────

    #[test]
    fn test_died_at_sea_sentinel() {
        let d = scanner().extract_details("mort en mer le 19/06/1752");
        assert_eq!(d.disembark_location.as_deref(), Some(AT_SEA));
        assert_eq!(d.disembark_date.as_deref(), Some("19/06/1752"));
    }

    #[test]
    fn test_died_on_board_beats_at_sea() {
        // both phrases present: the on-board check runs first
        let d = scanner().extract_details("morts à bord en mer");
        assert_eq!(d.disembark_location.as_deref(), Some(ON_BOARD));
    }

    #[test]
    fn test_died_inflections() {
        for text in ["morte à bord", "morts à bord", "mortes à bord"] {
            let d = scanner().extract_details(text);
            assert_eq!(d.disembark_location.as_deref(), Some(ON_BOARD), "{text}");
        }
    }

    #[test]
    fn test_born_sentinels_set_embark_location() {
        let d = scanner().extract_details("née en mer le 02/08/1753");
        assert_eq!(d.embark_location.as_deref(), Some(AT_SEA));

        let d = scanner().extract_details("né à bord");
        assert_eq!(d.embark_location.as_deref(), Some(ON_BOARD));
    }

    #[test]
    fn test_sentinel_overrides_captured_location() {
        let d = scanner().extract_details("mort à l'hôpital de Brest puis mort en mer le 01/01/1750");
        assert_eq!(d.disembark_location.as_deref(), Some(AT_SEA));
    }
}
