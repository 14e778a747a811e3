//! Company registry client (PRH YTJ open data). Resolves a Finnish business
//! id into the profile fields the caller did not supply: registered name,
//! main business line as industry, country. This is a collaborator of the
//! engine, not part of it — the engine only ever sees a fully resolved
//! profile, and an unresolved lookup fails fast instead of scoring
//! half-populated data silently.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::profile::{Geography, NeedType, RequestProfile, Stage};

pub const DEFAULT_YTJ_BASE_URL: &str = "https://avoindata.prh.fi/opendata-ytj-api/v3";

/// Registry lookup failures; surfaced to the caller, never swallowed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("rate limited by the registry (HTTP 429); try again later")]
    RateLimited,
    #[error("registry returned HTTP {0}")]
    Status(u16),
    #[error("no company found for business id '{0}'")]
    NotFound(String),
}

/// Fields resolved from the registry for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySummary {
    pub name: String,
    pub industry: Option<String>,
    pub country: String,
}

/// Profile fields the registry cannot know; supplied by the caller.
#[derive(Debug, Clone)]
pub struct ProfileSeed {
    pub stage: Stage,
    pub revenue_class: String,
    pub employees: u32,
    pub needs: BTreeSet<NeedType>,
    pub amount_min: Option<i64>,
    pub amount_max: Option<i64>,
    pub region: Option<String>,
}

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_YTJ_BASE_URL)
    }

    /// Base URL override, mainly for tests against a local stub.
    pub fn with_base_url(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("funding-advisor/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the first company matching `business_id`.
    pub async fn company_summary(&self, business_id: &str) -> Result<CompanySummary, RegistryError> {
        let url = format!("{}/companies", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("businessId", business_id)])
            .send()
            .await?;

        match resp.status().as_u16() {
            429 => return Err(RegistryError::RateLimited),
            s if s >= 400 => return Err(RegistryError::Status(s)),
            _ => {}
        }

        let body: CompaniesResponse = resp.json().await?;
        let raw = body
            .companies
            .into_iter()
            .next()
            .filter(|_| body.total_results > 0)
            .ok_or_else(|| RegistryError::NotFound(business_id.to_string()))?;
        Ok(summarize(business_id, raw))
    }

    /// Resolve a business id into a complete request profile.
    pub async fn resolve_profile(
        &self,
        business_id: &str,
        seed: ProfileSeed,
    ) -> Result<RequestProfile, RegistryError> {
        let summary = self.company_summary(business_id).await?;
        let mut geography = Geography::new(summary.country);
        geography.region = seed.region;
        Ok(RequestProfile {
            name: summary.name,
            business_id: Some(business_id.to_string()),
            industry: summary.industry.into_iter().collect(),
            revenue_class: seed.revenue_class,
            employees: seed.employees,
            stage: seed.stage,
            needs: seed.needs,
            amount_min: seed.amount_min,
            amount_max: seed.amount_max,
            geography: Some(geography),
        })
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

// --- YTJ response shapes (only the fields we read) ---

#[derive(Debug, Deserialize)]
struct CompaniesResponse {
    #[serde(rename = "totalResults", default)]
    total_results: i64,
    #[serde(default)]
    companies: Vec<RawCompany>,
}

#[derive(Debug, Deserialize)]
struct RawCompany {
    #[serde(default)]
    names: Vec<RawName>,
    #[serde(rename = "mainBusinessLine", default)]
    main_business_line: Option<RawBusinessLine>,
    #[serde(default)]
    addresses: Vec<RawAddress>,
}

#[derive(Debug, Deserialize)]
struct RawName {
    name: Option<String>,
    version: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawBusinessLine {
    #[serde(rename = "type")]
    type_code: Option<String>,
    #[serde(default)]
    descriptions: Vec<RawDescription>,
}

#[derive(Debug, Deserialize)]
struct RawDescription {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    country: Option<String>,
}

fn summarize(business_id: &str, raw: RawCompany) -> CompanySummary {
    // Current registered name carries version 1; fall back to the first.
    let name = raw
        .names
        .iter()
        .find(|n| n.version == Some(1))
        .and_then(|n| n.name.clone())
        .or_else(|| raw.names.first().and_then(|n| n.name.clone()))
        .unwrap_or_else(|| business_id.to_string());

    let industry = raw.main_business_line.as_ref().and_then(|bl| {
        bl.descriptions
            .iter()
            .find_map(|d| d.description.clone())
            .or_else(|| bl.type_code.clone())
    });

    let country = raw
        .addresses
        .iter()
        .find_map(|a| a.country.clone())
        .map(|c| if c == "FI" { "Finland".to_string() } else { c })
        .unwrap_or_else(|| "Finland".to_string());

    CompanySummary {
        name,
        industry,
        country,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawCompany {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn picks_current_registered_name() {
        let company = raw(json!({
            "names": [
                {"name": "Old Name Oy", "version": 2},
                {"name": "Current Name Oy", "version": 1}
            ]
        }));
        let s = summarize("1234567-8", company);
        assert_eq!(s.name, "Current Name Oy");
    }

    #[test]
    fn falls_back_to_business_id_when_unnamed() {
        let s = summarize("1234567-8", raw(json!({})));
        assert_eq!(s.name, "1234567-8");
        assert_eq!(s.country, "Finland");
        assert_eq!(s.industry, None);
    }

    #[test]
    fn industry_prefers_description_over_tol_code() {
        let company = raw(json!({
            "mainBusinessLine": {
                "type": "62010",
                "descriptions": [{"description": "Computer programming"}]
            }
        }));
        assert_eq!(
            summarize("x", company).industry.as_deref(),
            Some("Computer programming")
        );

        let code_only = raw(json!({"mainBusinessLine": {"type": "62010"}}));
        assert_eq!(summarize("x", code_only).industry.as_deref(), Some("62010"));
    }

    #[test]
    fn country_code_fi_expands() {
        let company = raw(json!({"addresses": [{"country": "FI"}]}));
        assert_eq!(summarize("x", company).country, "Finland");
        let other = raw(json!({"addresses": [{"country": "SE"}]}));
        assert_eq!(summarize("x", other).country, "SE");
    }
}
