//! Movement-reason classification.
//!
//! Each expanded leg gets a numeric embarkation and disembarkation reason
//! code in the 301..=309 range. Rules are keyword tables over the lowercased
//! remark, checked in order with first match winning, so overlapping
//! keywords resolve by position — `embarqué` is a substring of `rembarqué`
//! and sits earlier in the table, which means a re-embarkation leg still
//! classifies as an ordinary enlistment.

/// Why the person came aboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbarkReason {
    /// Signed on at fit-out or embarked normally.
    Enlisted,
    /// Came aboard as a replacement or supernumerary supplement.
    Replacement,
    /// Transferred in from another vessel.
    Transferred,
    /// Stowaway discovered after departure.
    Stowaway,
    /// Born during the voyage.
    Born,
    /// Re-embarked after an earlier leg.
    ReEmbarked,
    /// Stayed ashore at departure but remains on the roll.
    Remained,
    /// Remark missing or matching no rule.
    Unknown,
}

impl EmbarkReason {
    pub fn code(self) -> u16 {
        match self {
            EmbarkReason::Enlisted => 301,
            EmbarkReason::Replacement => 302,
            EmbarkReason::Transferred => 303,
            EmbarkReason::Stowaway => 304,
            EmbarkReason::Born => 305,
            EmbarkReason::ReEmbarked => 306,
            EmbarkReason::Remained => 308,
            EmbarkReason::Unknown => 309,
        }
    }
}

/// Why the person left the roll at the end of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisembarkReason {
    /// Came back to the port of embarkation.
    RoundTrip,
    /// Remark matched no rule.
    Unspecified,
    /// Transferred out to another vessel.
    Transferred,
    /// Deserted or escaped.
    Deserted,
    /// Died during the leg.
    Died,
    /// Landed sick or left at a hospital.
    Sick,
    /// Taken when the vessel was captured.
    Captured,
    /// Remained ashore.
    Remained,
    /// No remark at all.
    NoRemark,
}

impl DisembarkReason {
    pub fn code(self) -> u16 {
        match self {
            DisembarkReason::RoundTrip => 301,
            DisembarkReason::Unspecified => 302,
            DisembarkReason::Transferred => 303,
            DisembarkReason::Deserted => 304,
            DisembarkReason::Died => 305,
            DisembarkReason::Sick => 306,
            DisembarkReason::Captured => 307,
            DisembarkReason::Remained => 308,
            DisembarkReason::NoRemark => 309,
        }
    }
}

/// Ordered keyword table for embarkation reasons.
const EMBARK_RULES: &[(&[&str], EmbarkReason)] = &[
    (&["armement", "embarqué", "fait la campagne"], EmbarkReason::Enlisted),
    (&["remplacement", "supplément"], EmbarkReason::Replacement),
    (&["renversement", "vient"], EmbarkReason::Transferred),
    (&["clandestin", "caché"], EmbarkReason::Stowaway),
    (&["né"], EmbarkReason::Born),
    (&["rembarqué"], EmbarkReason::ReEmbarked),
    (&["resté"], EmbarkReason::Remained),
];

pub fn classify_embark(remark: Option<&str>) -> EmbarkReason {
    let Some(remark) = remark else {
        return EmbarkReason::Unknown;
    };
    let lower = remark.to_lowercase();
    if lower.trim().is_empty() {
        return EmbarkReason::Unknown;
    }
    for (keywords, reason) in EMBARK_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *reason;
        }
    }
    EmbarkReason::Unknown
}

/// Classify the end of a leg. Besides the remark this looks at the two
/// extracted locations: a leg whose disembarkation port equals its
/// embarkation port is a round trip no matter what the remark says, and
/// that check runs before every keyword rule.
pub fn classify_disembark(
    remark: Option<&str>,
    embark_location: Option<&str>,
    disembark_location: Option<&str>,
) -> DisembarkReason {
    let Some(remark) = remark else {
        return DisembarkReason::NoRemark;
    };
    if remark.trim().is_empty() {
        return DisembarkReason::NoRemark;
    }

    if let (Some(from), Some(to)) = (embark_location, disembark_location)
        && !from.is_empty()
        && from == to
    {
        return DisembarkReason::RoundTrip;
    }

    let lower = remark.to_lowercase();
    if lower.contains("passé") {
        DisembarkReason::Transferred
    } else if ["déserté", "fugitif", "échapé"].iter().any(|k| lower.contains(k)) {
        DisembarkReason::Deserted
    } else if lower.contains("mort") {
        DisembarkReason::Died
    } else if lower.contains("malade") || lower.contains("hôpital") {
        DisembarkReason::Sick
    } else if lower.contains("prise") {
        DisembarkReason::Captured
    } else if lower.contains("resté") {
        DisembarkReason::Remained
    } else {
        DisembarkReason::Unspecified
    }
}
