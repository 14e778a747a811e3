//! # Scoring Engine
//! Pure, testable logic that maps `(profile, instrument, policy, today)` →
//! `ScoredResult`. No I/O, no shared state; identical inputs always produce
//! identical output, so concurrent scoring passes need no locking.
//!
//! Each criterion yields a sub-score in [0, 1]. Criteria that do not apply to
//! the request (empty needs, fully open amount range) drop out of the weight
//! denominator instead of dragging the score down. Urgency is an additive
//! bonus on top of the weighted mean so a missing deadline stays neutral.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::{GeographyScope, InstrumentRecord};
use crate::explain;
use crate::profile::{Geography, RequestProfile, Stage};
use crate::weights::ScorePolicy;

/// Closed set of scoring criteria. Declaration order is the canonical
/// rendering order used by the explanation builder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Geography,
    Stage,
    Needs,
    Industry,
    Amount,
    Urgency,
}

/// One contributing criterion: tag, points on the final 0–100 scale, and a
/// short phrase for the explanation. Only non-zero contributions are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub criterion: Criterion,
    pub points: f32,
    pub phrase: String,
}

/// Engine output for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub instrument_id: String,
    /// Aggregate score, clamped to [0, 100].
    pub score: f32,
    /// Deadline copied from the instrument; ranking tie-break input.
    pub deadline: Option<NaiveDate>,
    /// True when the deadline lies strictly in the past.
    pub deadline_passed: bool,
    pub reasons: Vec<ReasonEntry>,
    /// Rule-based explanation; always present even when reasons are empty.
    pub explanation: String,
}

/// Score one instrument against a profile. `today` is explicit so the result
/// is a pure function of its arguments.
pub fn score(
    profile: &RequestProfile,
    instrument: &InstrumentRecord,
    policy: &ScorePolicy,
    today: NaiveDate,
) -> ScoredResult {
    // (criterion, weight * sub-score, phrase); scaled to points once the
    // denominator over the applicable criteria is known.
    let mut contributions: Vec<(Criterion, f32, String)> = Vec::new();
    let mut denom = 0.0f32;

    // Geography: absent profile geography contributes zero, not a penalty.
    denom += policy.w_geography;
    let geo = geography_fit(profile.geography.as_ref(), &instrument.geography_scope);
    if geo > 0.0 {
        let phrase = match &instrument.geography_scope {
            GeographyScope::National => "is available nationwide".to_string(),
            GeographyScope::Eu => "is open EU-wide".to_string(),
            GeographyScope::Regional(_) => {
                let region = profile
                    .geography
                    .as_ref()
                    .and_then(|g| g.region.as_deref())
                    .unwrap_or_default();
                format!("covers your region {region}")
            }
            GeographyScope::Other => String::new(),
        };
        contributions.push((Criterion::Geography, policy.w_geography * geo, phrase));
    }

    // Stage fit with one-step adjacency.
    denom += policy.w_stage;
    let stage = stage_fit(
        profile.stage,
        &instrument.eligible_stages,
        policy.adjacent_stage_factor,
    );
    if stage > 0.0 {
        let phrase = if instrument.eligible_stages.is_empty() {
            "is open to companies at any stage".to_string()
        } else if instrument.eligible_stages.contains(&profile.stage) {
            format!("targets your {} stage", profile.stage)
        } else {
            format!("sits one step from your {} stage", profile.stage)
        };
        contributions.push((Criterion::Stage, policy.w_stage * stage, phrase));
    }

    // Need-type overlap: coverage of the requester's stated needs.
    if !profile.needs.is_empty() {
        denom += policy.w_needs;
        let overlap = profile
            .needs
            .iter()
            .filter(|n| instrument.need_types.contains(n))
            .count();
        if overlap > 0 {
            let coverage = overlap as f32 / profile.needs.len() as f32;
            let phrase = format!(
                "covers {overlap} of {} requested funding needs",
                profile.needs.len()
            );
            contributions.push((Criterion::Needs, policy.w_needs * coverage, phrase));
        }
    }

    // Industry: token overlap, unrestricted instruments get full weight.
    denom += policy.w_industry;
    let industry = industry_fit(&profile.industry, &instrument.eligible_industries);
    if industry > 0.0 {
        let phrase = if unrestricted_industries(&instrument.eligible_industries) {
            "is open to all industries".to_string()
        } else {
            match first_industry_hit(&profile.industry, &instrument.eligible_industries) {
                Some(tag) => format!("matches your '{tag}' industry focus"),
                None => "matches your industry focus".to_string(),
            }
        };
        contributions.push((Criterion::Industry, policy.w_industry * industry, phrase));
    }

    // Amount range overlap; fully open request drops out of the denominator.
    if let Some(amount) = amount_fit(
        profile.amount_min,
        profile.amount_max,
        instrument.amount_min,
        instrument.amount_max,
        policy.partial_amount_factor,
    ) {
        denom += policy.w_amount;
        if amount > 0.0 {
            let phrase = if (amount - 1.0).abs() < f32::EPSILON {
                "fully covers your requested amount range".to_string()
            } else {
                "partially overlaps your requested amount range".to_string()
            };
            contributions.push((Criterion::Amount, policy.w_amount * amount, phrase));
        }
    }

    let scale = if denom > 0.0 { 100.0 / denom } else { 0.0 };
    let mut reasons: Vec<ReasonEntry> = contributions
        .into_iter()
        .map(|(criterion, raw, phrase)| ReasonEntry {
            criterion,
            points: raw * scale,
            phrase,
        })
        .collect();
    let base: f32 = reasons.iter().map(|r| r.points).sum();

    // Urgency: near-deadline bonus, zero (never negative) once expired.
    let days_left = instrument.deadline.map(|d| (d - today).num_days());
    let deadline_passed = matches!(days_left, Some(d) if d < 0);
    let urgency = days_left
        .map(|d| urgency_fit(d, policy.urgency_window_days))
        .unwrap_or(0.0);
    if urgency > 0.0 {
        let phrase = match days_left {
            Some(0) => "closes today".to_string(),
            Some(1) => "closes in 1 day".to_string(),
            Some(d) => format!("closes in {d} days"),
            None => String::new(),
        };
        reasons.push(ReasonEntry {
            criterion: Criterion::Urgency,
            points: policy.urgency_bonus * urgency,
            phrase,
        });
    }

    let score = (base + policy.urgency_bonus * urgency).clamp(0.0, 100.0);
    let explanation = explain::render(&reasons);

    ScoredResult {
        instrument_id: instrument.id.clone(),
        score,
        deadline: instrument.deadline,
        deadline_passed,
        reasons,
        explanation,
    }
}

/// 1.0 for an eligible or unrestricted stage, `adjacent_factor` one step
/// away on the ordered scale, 0 otherwise.
pub fn stage_fit(stage: Stage, eligible: &[Stage], adjacent_factor: f32) -> f32 {
    if eligible.is_empty() || eligible.contains(&stage) {
        return 1.0;
    }
    if eligible.iter().any(|s| s.distance(stage) == 1) {
        adjacent_factor
    } else {
        0.0
    }
}

/// Full weight when the instrument scope matches or subsumes the profile
/// geography; zero otherwise. Missing profile geography is neutral.
pub fn geography_fit(geo: Option<&Geography>, scope: &GeographyScope) -> f32 {
    let Some(geo) = geo else {
        return 0.0;
    };
    match scope {
        GeographyScope::National => 1.0,
        GeographyScope::Eu => {
            if is_eu_member(&geo.country) {
                1.0
            } else {
                0.0
            }
        }
        GeographyScope::Regional(regions) => match geo.region.as_deref() {
            Some(region) => {
                let needle = region.trim().to_lowercase();
                if regions.iter().any(|r| r.trim().to_lowercase() == needle) {
                    1.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        },
        GeographyScope::Other => 0.0,
    }
}

/// Token-overlap industry check; an unrestricted instrument scores 1.0.
pub fn industry_fit(profile_tags: &[String], instrument_tokens: &[String]) -> f32 {
    if unrestricted_industries(instrument_tokens) {
        return 1.0;
    }
    if first_industry_hit(profile_tags, instrument_tokens).is_some() {
        1.0
    } else {
        0.0
    }
}

fn unrestricted_industries(instrument_tokens: &[String]) -> bool {
    instrument_tokens.is_empty()
        || instrument_tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case("all"))
}

/// First profile tag whose token overlaps an instrument token, substring
/// match either way, case-insensitive.
fn first_industry_hit(profile_tags: &[String], instrument_tokens: &[String]) -> Option<String> {
    let inds: Vec<String> = instrument_tokens
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    for tag in profile_tags {
        for tok in tag
            .to_lowercase()
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            if inds
                .iter()
                .any(|ind| !ind.is_empty() && (ind.contains(tok) || tok.contains(ind)))
            {
                return Some(tag.clone());
            }
        }
    }
    None
}

/// Overlap of the requested and offered amount ranges, relative to the
/// requested span. `None` means the criterion does not apply (fully open
/// request). Open edges on either side are treated as non-constraining;
/// containment in either direction scores 1.0 so widening a request to
/// enclose an instrument's range never lowers the sub-score.
pub fn amount_fit(
    p_min: Option<i64>,
    p_max: Option<i64>,
    i_min: Option<i64>,
    i_max: Option<i64>,
    partial_factor: f32,
) -> Option<f32> {
    if p_min.is_none() && p_max.is_none() {
        return None;
    }

    // Disjoint ranges score zero.
    if let (Some(pmax), Some(imin)) = (p_max, i_min) {
        if pmax < imin {
            return Some(0.0);
        }
    }
    if let (Some(pmin), Some(imax)) = (p_min, i_max) {
        if pmin > imax {
            return Some(0.0);
        }
    }

    let instrument_contains_request = p_min.map_or(true, |p| i_min.map_or(true, |i| i <= p))
        && p_max.map_or(true, |p| i_max.map_or(true, |i| i >= p));
    let request_contains_instrument = match (p_min, i_min) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(p), Some(i)) => p <= i,
    } && match (p_max, i_max) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(p), Some(i)) => p >= i,
    };
    if instrument_contains_request || request_contains_instrument {
        return Some(1.0);
    }

    match (p_min, p_max) {
        (Some(pmin), Some(pmax)) => {
            let span = (pmax - pmin) as f64;
            if span <= 0.0 {
                // Degenerate point request that intersects the range.
                return Some(1.0);
            }
            let lo = i_min.map_or(pmin, |i| i.max(pmin));
            let hi = i_max.map_or(pmax, |i| i.min(pmax));
            let ratio = ((hi - lo) as f64 / span).clamp(0.0, 1.0);
            Some(ratio as f32)
        }
        // Half-open request intersecting without containment.
        _ => Some(partial_factor),
    }
}

/// Linear near-deadline bonus: 1.0 on the day itself, fading to zero at the
/// window edge. Past deadlines and far-out deadlines score zero.
pub fn urgency_fit(days_left: i64, window_days: i64) -> f32 {
    if window_days <= 0 || days_left < 0 || days_left > window_days {
        return 0.0;
    }
    (window_days - days_left) as f32 / window_days as f32
}

fn is_eu_member(country: &str) -> bool {
    EU_MEMBERS.contains(country.trim().to_lowercase().as_str())
}

/// EU member states, english names and ISO 3166-1 alpha-2 codes, lowercase.
static EU_MEMBERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "austria", "at", "belgium", "be", "bulgaria", "bg", "croatia", "hr", "cyprus", "cy",
        "czechia", "czech republic", "cz", "denmark", "dk", "estonia", "ee", "finland", "fi",
        "france", "fr", "germany", "de", "greece", "gr", "hungary", "hu", "ireland", "ie",
        "italy", "it", "latvia", "lv", "lithuania", "lt", "luxembourg", "lu", "malta", "mt",
        "netherlands", "nl", "poland", "pl", "portugal", "pt", "romania", "ro", "slovakia", "sk",
        "slovenia", "si", "spain", "es", "sweden", "se",
    ])
});
