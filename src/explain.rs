//! # Explanation Builder
//! Turns reason entries into one or two plain sentences. Phrases are rendered
//! in the canonical criterion order (geography, stage, needs, industry,
//! amount, urgency) regardless of computation order, so output is stable and
//! testable. This rule-based text is always available; the optional polisher
//! only ever rewrites it.

use crate::scoring::{Criterion, ReasonEntry};

/// Fixed message for an instrument with no contributing criteria.
pub const NO_MATCH_MESSAGE: &str =
    "No strong match for your profile; check eligibility with the provider directly.";

/// Render reason phrases into explanation text. Never returns an empty string.
pub fn render(reasons: &[ReasonEntry]) -> String {
    if reasons.is_empty() {
        return NO_MATCH_MESSAGE.to_string();
    }

    let mut ordered: Vec<&ReasonEntry> = reasons.iter().filter(|r| !r.phrase.is_empty()).collect();
    ordered.sort_by_key(|r| r.criterion);
    if ordered.is_empty() {
        return NO_MATCH_MESSAGE.to_string();
    }

    // First sentence: eligibility criteria. Second: terms and timing.
    let (eligibility, terms): (Vec<&ReasonEntry>, Vec<&ReasonEntry>) = ordered
        .into_iter()
        .partition(|r| r.criterion <= Criterion::Needs);

    let mut out = String::new();
    if !eligibility.is_empty() {
        out.push_str("This instrument ");
        out.push_str(&join_phrases(&eligibility));
        out.push('.');
    }
    if !terms.is_empty() {
        if !out.is_empty() {
            out.push(' ');
            out.push_str("It ");
        } else {
            out.push_str("This instrument ");
        }
        out.push_str(&join_phrases(&terms));
        out.push('.');
    }
    out
}

/// "a", "a and b", "a, b and c".
fn join_phrases(entries: &[&ReasonEntry]) -> String {
    let phrases: Vec<&str> = entries.iter().map(|e| e.phrase.as_str()).collect();
    match phrases.len() {
        0 => String::new(),
        1 => phrases[0].to_string(),
        n => {
            let head = phrases[..n - 1].join(", ");
            format!("{head} and {}", phrases[n - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(criterion: Criterion, phrase: &str) -> ReasonEntry {
        ReasonEntry {
            criterion,
            points: 10.0,
            phrase: phrase.to_string(),
        }
    }

    #[test]
    fn empty_reasons_yield_the_fixed_fallback() {
        assert_eq!(render(&[]), NO_MATCH_MESSAGE);
    }

    #[test]
    fn renders_in_canonical_order_regardless_of_input_order() {
        let reasons = vec![
            entry(Criterion::Urgency, "closes in 10 days"),
            entry(Criterion::Needs, "covers 2 of 2 requested funding needs"),
            entry(Criterion::Geography, "is available nationwide"),
            entry(Criterion::Stage, "targets your seed stage"),
        ];
        let text = render(&reasons);
        assert_eq!(
            text,
            "This instrument is available nationwide, targets your seed stage \
             and covers 2 of 2 requested funding needs. It closes in 10 days."
        );
    }

    #[test]
    fn single_terms_reason_still_forms_a_sentence() {
        let reasons = vec![entry(Criterion::Amount, "fully covers your requested amount range")];
        assert_eq!(
            render(&reasons),
            "This instrument fully covers your requested amount range."
        );
    }

    #[test]
    fn two_phrases_join_with_and() {
        let reasons = vec![
            entry(Criterion::Stage, "targets your seed stage"),
            entry(Criterion::Geography, "is available nationwide"),
        ];
        assert_eq!(
            render(&reasons),
            "This instrument is available nationwide and targets your seed stage."
        );
    }
}
