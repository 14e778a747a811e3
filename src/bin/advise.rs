//! Batch/offline invocation surface: rank funding instruments for a company
//! profile from the command line, without the HTTP service layer.
//!
//! Examples:
//!   advise --stage seed --needs RDI,internationalization --min-amount 50000 --max-amount 200000
//!   advise --business-id 1234567-8 --stage growth --needs investments

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;

use funding_advisor::catalog::Catalog;
use funding_advisor::polish::{self, DynPolisher, PolishContext};
use funding_advisor::profile::{Geography, NeedType, RequestProfile, Stage};
use funding_advisor::ranker::{rank, RankOptions};
use funding_advisor::registry::{ProfileSeed, RegistryClient};
use funding_advisor::scoring;
use funding_advisor::weights::HotReloadPolicy;

#[derive(Parser, Debug)]
#[command(name = "advise", about = "Rank funding instruments for a company profile.")]
struct Args {
    /// Company name used in the output (overridden with --business-id)
    #[arg(long, default_value = "Example AI Startup")]
    name: String,

    /// Finnish business ID (Y-tunnus) to autofill the profile from the registry
    #[arg(long)]
    business_id: Option<String>,

    /// pre-seed|seed|growth|scale-up
    #[arg(long, default_value = "seed")]
    stage: String,

    /// Revenue class label
    #[arg(long, default_value = "<250k")]
    revenue_class: String,

    /// Number of employees
    #[arg(long, default_value_t = 5)]
    employees: u32,

    /// Comma-separated funding need types (e.g. RDI,internationalization,investments)
    #[arg(long, default_value = "RDI,internationalization")]
    needs: String,

    /// Min amount needed (EUR)
    #[arg(long)]
    min_amount: Option<i64>,

    /// Max amount needed (EUR)
    #[arg(long)]
    max_amount: Option<i64>,

    /// Company country
    #[arg(long, default_value = "Finland")]
    country: String,

    /// Company region (for regionally scoped instruments)
    #[arg(long)]
    region: Option<String>,

    /// Comma-separated industry tags (ignored with --business-id)
    #[arg(long, default_value = "software, AI")]
    industry: String,

    /// Path or URL of the instrument catalog JSON
    #[arg(long, default_value = "config/funding_instruments.json")]
    instruments: String,

    /// Drop results scoring below this value
    #[arg(long)]
    min_score: Option<f32>,

    /// Show at most this many results
    #[arg(long)]
    top: Option<usize>,

    /// Rewrite explanations through the configured polisher
    #[arg(long, default_value_t = false)]
    polish: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let stage: Stage = args.stage.parse().map_err(|e| anyhow::anyhow!("{e}"))?;
    let needs: BTreeSet<NeedType> = args
        .needs
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<NeedType>().map_err(|e| anyhow::anyhow!("{e}")))
        .collect::<Result<_>>()?;
    if needs.is_empty() {
        bail!("--needs must list at least one funding need type");
    }

    let catalog = Catalog::load(&args.instruments)
        .await
        .context("loading instrument catalog")?;

    let profile = if let Some(business_id) = &args.business_id {
        let registry = RegistryClient::new();
        let seed = ProfileSeed {
            stage,
            revenue_class: args.revenue_class.clone(),
            employees: args.employees,
            needs,
            amount_min: args.min_amount,
            amount_max: args.max_amount,
            region: args.region.clone(),
        };
        registry
            .resolve_profile(business_id, seed)
            .await
            .context("registry lookup failed")?
    } else {
        let mut geography = Geography::new(args.country.clone());
        geography.region = args.region.clone();
        RequestProfile {
            name: args.name.clone(),
            business_id: None,
            industry: args
                .industry
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            revenue_class: args.revenue_class.clone(),
            employees: args.employees,
            stage,
            needs,
            amount_min: args.min_amount,
            amount_max: args.max_amount,
            geography: Some(geography),
        }
    };
    profile.validate().map_err(|e| anyhow::anyhow!("{e}"))?;

    let policy = HotReloadPolicy::new(None).current();
    let today = Utc::now().date_naive();
    let results: Vec<_> = catalog
        .records()
        .iter()
        .map(|inst| scoring::score(&profile, inst, &policy, today))
        .collect();
    let ranked = rank(
        results,
        RankOptions {
            min_score: args.min_score,
            limit: args.top,
        },
    );

    let polisher: Option<(DynPolisher, Duration)> = if args.polish {
        let cfg = polish::load_polish_config();
        Some((polish::build_polisher(&cfg), cfg.timeout()))
    } else {
        None
    };

    println!(
        "Top recommendations for {} (stage: {}):\n",
        profile.name, profile.stage
    );
    for result in &ranked {
        let inst = catalog
            .get(&result.instrument_id)
            .context("ranked id missing from catalog")?;
        println!(
            "{} (provider: {}) - score {:.1}",
            inst.name, inst.provider, result.score
        );
        for reason in &result.reasons {
            println!("  - {}", reason.phrase);
        }
        let explanation = match &polisher {
            Some((p, timeout)) => {
                let ctx = PolishContext::new(&inst.name, &inst.provider, result);
                polish::polish_or_fallback(p, &result.explanation, &ctx, *timeout).await
            }
            None => result.explanation.clone(),
        };
        println!("  {explanation}\n");
    }
    if ranked.is_empty() {
        println!("No instruments matched the given profile and filters.");
    }

    Ok(())
}
