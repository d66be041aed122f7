//! Customer-weighted re-ranking of similarity hits.
//!
//! A raw similarity search knows nothing about the customer; this module
//! turns its hits into a shortlist by matching each candidate's risk tier
//! and expense ratio against the profile. The weights are fixed product
//! policy tables, not learned parameters.

use serde::{Deserialize, Serialize};

use crate::index::{Chunk, RiskLevel, SearchHit};

/// Customer investment profile as supplied by the caller. Not owned by
/// this service; holdings decide which product surface the request takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub age: u32,
    pub risk_tolerance: RiskLevel,
    pub monthly_investment: u64,
    #[serde(default)]
    pub income: u64,
    #[serde(default)]
    pub savings: u64,
    #[serde(default)]
    pub etfs_owned: Vec<String>,
}

impl CustomerProfile {
    pub fn has_holdings(&self) -> bool {
        !self.etfs_owned.is_empty()
    }
}

/// Monthly-investment bracket. Thresholds are currency-unit-agnostic and
/// defined only here; every other module classifies through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestmentBracket {
    Low,
    Medium,
    High,
}

impl InvestmentBracket {
    pub fn classify(monthly_investment: u64) -> Self {
        if monthly_investment < 500_000 {
            InvestmentBracket::Low
        } else if monthly_investment < 2_000_000 {
            InvestmentBracket::Medium
        } else {
            InvestmentBracket::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvestmentBracket::Low => "low",
            InvestmentBracket::Medium => "medium",
            InvestmentBracket::High => "high",
        }
    }
}

/// A candidate surviving the weighting step; transient per query.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub chunk: Chunk,
    pub similarity: f32,
    pub weight: f64,
}

// Conservative customers put more of the decision on risk fit; aggressive
// ones are served better by the raw similarity ordering.
fn risk_tier_weight(risk_tolerance: RiskLevel) -> f64 {
    match risk_tolerance {
        RiskLevel::Low => 0.8,
        RiskLevel::Medium => 0.5,
        RiskLevel::High => 0.2,
    }
}

// Small monthly amounts favor low-cost funds; larger budgets can carry
// broader, pricier exposure.
fn investment_tier_weight(bracket: InvestmentBracket) -> f64 {
    match bracket {
        InvestmentBracket::Low => 0.2,
        InvestmentBracket::Medium => 0.5,
        InvestmentBracket::High => 0.8,
    }
}

const EXPENSE_RATIO_CUTOFF: f64 = 0.5;

fn risk_match(candidate: &Chunk, risk_tolerance: RiskLevel) -> f64 {
    // A non-matching (or unannotated) candidate stays eligible, just
    // deprioritized; never zero.
    match candidate.metadata.risk_level {
        Some(level) if level == risk_tolerance => 1.0,
        _ => 0.5,
    }
}

fn expense_match(candidate: &Chunk) -> f64 {
    match candidate.metadata.expense_ratio {
        Some(ratio) if ratio < EXPENSE_RATIO_CUTOFF => 1.0,
        _ => 0.5,
    }
}

pub fn candidate_weight(chunk: &Chunk, profile: &CustomerProfile) -> f64 {
    let bracket = InvestmentBracket::classify(profile.monthly_investment);
    (risk_tier_weight(profile.risk_tolerance) * risk_match(chunk, profile.risk_tolerance)
        + investment_tier_weight(bracket) * expense_match(chunk))
        / 2.0
}

/// Re-ranks similarity hits by customer weight and takes the top `n`.
///
/// `hits` must arrive in similarity order; the sort is stable, so
/// equal-weight candidates keep that order. An empty input is a valid
/// terminal state and yields an empty shortlist.
pub fn rank(hits: Vec<SearchHit>, profile: &CustomerProfile, n: usize) -> Vec<RankedCandidate> {
    let mut candidates: Vec<RankedCandidate> = hits
        .into_iter()
        .map(|hit| RankedCandidate {
            weight: candidate_weight(&hit.chunk, profile),
            similarity: hit.score,
            chunk: hit.chunk,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(n);
    candidates
}

/// Natural-language retrieval query emphasizing the two profile fields
/// the weighting step also uses.
pub fn retrieval_query(profile: &CustomerProfile) -> String {
    let bracket = InvestmentBracket::classify(profile.monthly_investment);
    let mut query = format!(
        "Recommend ETFs suited to this customer profile.\n\
         [Important] Risk tolerance: {}\n\
         [Important] Monthly investment: {} ({} bracket)\n\
         Additional details:\n\
         - Age: {}\n\
         - Monthly income: {}\n\
         - Savings: {}\n",
        profile.risk_tolerance,
        profile.monthly_investment,
        bracket.label(),
        profile.age,
        profile.income,
        profile.savings,
    );
    if profile.has_holdings() {
        query.push_str(&format!(
            "Currently held ETFs: {}\n",
            profile.etfs_owned.join(", ")
        ));
    }
    query
}
