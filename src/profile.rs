//! Request-side types: company funding stage, need categories, and the
//! per-request profile the scoring engine consumes.
//!
//! A `RequestProfile` is built once per request (inline fields or registry
//! autofill), validated, and never mutated during a scoring pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Company funding stage on an explicit ordered scale.
/// Adjacency ("one step away") is defined by position on this scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PreSeed,
    Seed,
    Growth,
    ScaleUp,
}

impl Stage {
    pub const ORDERED: [Stage; 4] = [Stage::PreSeed, Stage::Seed, Stage::Growth, Stage::ScaleUp];

    /// Position on the ordered scale.
    pub fn position(self) -> usize {
        match self {
            Stage::PreSeed => 0,
            Stage::Seed => 1,
            Stage::Growth => 2,
            Stage::ScaleUp => 3,
        }
    }

    /// Distance in steps between two stages.
    pub fn distance(self, other: Stage) -> usize {
        self.position().abs_diff(other.position())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PreSeed => "pre-seed",
            Stage::Seed => "seed",
            Stage::Growth => "growth",
            Stage::ScaleUp => "scale-up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre-seed" | "preseed" => Ok(Stage::PreSeed),
            "seed" => Ok(Stage::Seed),
            "growth" => Ok(Stage::Growth),
            "scale-up" | "scaleup" => Ok(Stage::ScaleUp),
            other => Err(ValidationError::UnknownStage(other.to_string())),
        }
    }
}

/// Closed set of funding-need categories shared by profiles and instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NeedType {
    #[serde(rename = "RDI")]
    Rdi,
    #[serde(rename = "internationalization")]
    Internationalization,
    #[serde(rename = "investments")]
    Investments,
    #[serde(rename = "working capital")]
    WorkingCapital,
}

impl NeedType {
    pub fn as_str(self) -> &'static str {
        match self {
            NeedType::Rdi => "RDI",
            NeedType::Internationalization => "internationalization",
            NeedType::Investments => "investments",
            NeedType::WorkingCapital => "working capital",
        }
    }
}

impl fmt::Display for NeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeedType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rdi" | "r&d" => Ok(NeedType::Rdi),
            "internationalization" | "internationalisation" => Ok(NeedType::Internationalization),
            "investments" | "investment" => Ok(NeedType::Investments),
            "working capital" | "working-capital" => Ok(NeedType::WorkingCapital),
            other => Err(ValidationError::UnknownNeedType(other.to_string())),
        }
    }
}

/// Company location as the engine sees it: a country plus an optional region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geography {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Geography {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Caller-owned funding-need profile for one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    /// Free-text industry tags (e.g. "software", "AI"). May be empty.
    #[serde(default)]
    pub industry: Vec<String>,
    pub revenue_class: String,
    pub employees: u32,
    pub stage: Stage,
    /// Requested need types; must be non-empty to pass validation.
    pub needs: BTreeSet<NeedType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<i64>,
    /// Absent geography is allowed; that criterion then contributes zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geography: Option<Geography>,
}

impl RequestProfile {
    /// Reject malformed profiles before any scoring happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.needs.is_empty() {
            return Err(ValidationError::EmptyNeeds);
        }
        for bound in [self.amount_min, self.amount_max].into_iter().flatten() {
            if bound < 0 {
                return Err(ValidationError::NegativeAmount(bound));
            }
        }
        if let (Some(min), Some(max)) = (self.amount_min, self.amount_max) {
            if min > max {
                return Err(ValidationError::InvertedAmountRange { min, max });
            }
        }
        Ok(())
    }
}

/// Request-profile constraint violations, surfaced to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("funding_need_types must not be empty")]
    EmptyNeeds,
    #[error("funding amount must not be negative (got {0})")]
    NegativeAmount(i64),
    #[error("funding amount range is inverted (min {min} > max {max})")]
    InvertedAmountRange { min: i64, max: i64 },
    #[error("stage '{0}' is not one of pre-seed|seed|growth|scale-up")]
    UnknownStage(String),
    #[error("unknown funding need type '{0}'")]
    UnknownNeedType(String),
    /// Registry lookup returned nothing usable; the engine refuses to score
    /// a half-populated profile silently.
    #[error("company profile could not be resolved for business id '{0}'")]
    UnresolvedProfile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> RequestProfile {
        RequestProfile {
            name: "Example AI Startup".into(),
            business_id: None,
            industry: vec!["software".into(), "AI".into()],
            revenue_class: "<250k".into(),
            employees: 5,
            stage: Stage::Seed,
            needs: BTreeSet::from([NeedType::Rdi, NeedType::Internationalization]),
            amount_min: Some(50_000),
            amount_max: Some(200_000),
            geography: Some(Geography::new("Finland")),
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert_eq!(profile().validate(), Ok(()));
    }

    #[test]
    fn empty_needs_rejected() {
        let mut p = profile();
        p.needs.clear();
        assert_eq!(p.validate(), Err(ValidationError::EmptyNeeds));
    }

    #[test]
    fn inverted_amount_range_rejected() {
        let mut p = profile();
        p.amount_min = Some(300_000);
        assert_eq!(
            p.validate(),
            Err(ValidationError::InvertedAmountRange {
                min: 300_000,
                max: 200_000
            })
        );
    }

    #[test]
    fn negative_amount_rejected() {
        let mut p = profile();
        p.amount_min = Some(-1);
        assert_eq!(p.validate(), Err(ValidationError::NegativeAmount(-1)));
    }

    #[test]
    fn open_amount_bounds_are_valid() {
        let mut p = profile();
        p.amount_min = None;
        p.amount_max = None;
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn stage_adjacency_is_one_step() {
        assert_eq!(Stage::Seed.distance(Stage::Growth), 1);
        assert_eq!(Stage::PreSeed.distance(Stage::ScaleUp), 3);
        assert_eq!(Stage::Growth.distance(Stage::Growth), 0);
    }

    #[test]
    fn stage_serde_uses_kebab_case() {
        let s: Stage = serde_json::from_str("\"pre-seed\"").unwrap();
        assert_eq!(s, Stage::PreSeed);
        assert_eq!(serde_json::to_string(&Stage::ScaleUp).unwrap(), "\"scale-up\"");
    }

    #[test]
    fn need_type_parses_loosely() {
        assert_eq!("RDI".parse::<NeedType>().unwrap(), NeedType::Rdi);
        assert_eq!(
            "working-capital".parse::<NeedType>().unwrap(),
            NeedType::WorkingCapital
        );
        assert!("marketing".parse::<NeedType>().is_err());
    }
}
