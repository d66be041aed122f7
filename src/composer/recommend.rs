//! Recommendation prompt composition and reply recovery.
//!
//! The completion service gets an explicit structural contract (two
//! section markers, numbered lines) and this module owns getting a usable
//! result back out of whatever it actually returns. The caller always
//! receives exactly `n` recommendations and `n` reasons once a shortlist
//! exists; a malformed reply is padded or truncated, never surfaced.

use serde::{Deserialize, Serialize};

use crate::core::errors::AdvisorError;
use crate::llm::MeteredLlm;
use crate::ranker::{CustomerProfile, InvestmentBracket, RankedCandidate};

const RECOMMENDATIONS_MARKER: &str = "[Recommended ETFs]";
const REASONS_MARKER: &str = "[Reasons]";

const RECOMMENDATION_PLACEHOLDER: &str = "Recommendation is being prepared.";
const REASON_PLACEHOLDER: &str = "The reasoning for this pick is being prepared.";

pub const NO_MATCH_MESSAGE: &str =
    "Sorry, we could not find an ETF matching your profile right now.";

const HOLDINGS_ANALYSIS: &str =
    "Based on the current portfolio analysis, rebalancing is needed.";
const HOLDINGS_SUGGESTIONS: [&str; 2] = [
    "Consider selling part of the current holdings and buying new ETFs to reduce portfolio risk.",
    "Add the recommended ETFs to the current portfolio to strengthen diversification.",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendations: Vec<String>,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebalancing_needed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebalancing_suggestions: Option<Vec<String>>,
}

impl RecommendationResult {
    pub fn no_match() -> Self {
        Self {
            recommendations: Vec::new(),
            reasons: vec![NO_MATCH_MESSAGE.to_string()],
            portfolio_analysis: None,
            rebalancing_needed: None,
            rebalancing_suggestions: None,
        }
    }
}

#[derive(Clone)]
pub struct RecommendComposer {
    llm: MeteredLlm,
    shortlist_size: usize,
}

impl RecommendComposer {
    pub fn new(llm: MeteredLlm, shortlist_size: usize) -> Self {
        Self {
            llm,
            shortlist_size: shortlist_size.max(1),
        }
    }

    /// Composes a recommendation from the ranked shortlist. An empty
    /// shortlist short-circuits to the no-match result without calling
    /// the completion service.
    pub async fn compose(
        &self,
        profile: &CustomerProfile,
        shortlist: &[RankedCandidate],
    ) -> Result<RecommendationResult, AdvisorError> {
        if shortlist.is_empty() {
            tracing::warn!(
                "no candidates for customer {}, returning no-match",
                profile.customer_id
            );
            return Ok(RecommendationResult::no_match());
        }

        let prompt = self.build_prompt(profile, shortlist);
        let reply = self.llm.complete("recommend_etf", &prompt).await?;

        let (mut recommendations, mut reasons) = parse_reply(&reply);

        if recommendations.len() != self.shortlist_size || reasons.len() != self.shortlist_size {
            tracing::warn!(
                "customer {}: reply parsed to {} recommendations / {} reasons, normalizing to {}",
                profile.customer_id,
                recommendations.len(),
                reasons.len(),
                self.shortlist_size
            );
        }
        normalize(&mut recommendations, self.shortlist_size, RECOMMENDATION_PLACEHOLDER);
        normalize(&mut reasons, self.shortlist_size, REASON_PLACEHOLDER);

        let mut result = RecommendationResult {
            recommendations,
            reasons,
            portfolio_analysis: None,
            rebalancing_needed: None,
            rebalancing_suggestions: None,
        };

        // Current policy: any prior holdings flag a rebalancing bundle
        // unconditionally.
        if profile.has_holdings() {
            result.portfolio_analysis = Some(HOLDINGS_ANALYSIS.to_string());
            result.rebalancing_needed = Some(true);
            result.rebalancing_suggestions =
                Some(HOLDINGS_SUGGESTIONS.iter().map(|s| s.to_string()).collect());
        }

        Ok(result)
    }

    fn build_prompt(&self, profile: &CustomerProfile, shortlist: &[RankedCandidate]) -> String {
        let n = self.shortlist_size;
        let bracket = InvestmentBracket::classify(profile.monthly_investment);
        let fund_info = shortlist
            .iter()
            .map(|candidate| candidate.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Recommend exactly {n} ETFs for the customer below, using only the fund \
             information provided.\n\
             \n\
             [Important] Customer risk tolerance: {risk}\n\
             [Important] Monthly investment: {monthly} ({bracket} bracket)\n\
             \n\
             Additional customer details:\n\
             - Age: {age}\n\
             - Monthly income: {income}\n\
             - Savings: {savings}\n\
             \n\
             Fund information:\n\
             {fund_info}\n\
             \n\
             Respond in exactly this format, with {n} ETFs and {n} reasons:\n\
             \n\
             {rec_marker}\n\
             1. Fund code - Fund name\n\
             2. Fund code - Fund name\n\
             3. Fund code - Fund name\n\
             \n\
             {reason_marker}\n\
             1. Reason for the first ETF (address risk tolerance and monthly investment)\n\
             2. Reason for the second ETF (address risk tolerance and monthly investment)\n\
             3. Reason for the third ETF (address risk tolerance and monthly investment)\n\
             \n\
             Important: provide exactly {n} ETFs and {n} reasons, no more and no fewer.",
            n = n,
            risk = profile.risk_tolerance,
            monthly = profile.monthly_investment,
            bracket = bracket.label(),
            age = profile.age,
            income = profile.income,
            savings = profile.savings,
            fund_info = fund_info,
            rec_marker = RECOMMENDATIONS_MARKER,
            reason_marker = REASONS_MARKER,
        )
    }
}

/// Scans the reply line by line, tracking the active section via the two
/// literal markers; a line starting with a digit contributes the text
/// after its first `.` separator.
fn parse_reply(reply: &str) -> (Vec<String>, Vec<String>) {
    #[derive(PartialEq)]
    enum Section {
        None,
        Recommendations,
        Reasons,
    }

    let mut recommendations = Vec::new();
    let mut reasons = Vec::new();
    let mut section = Section::None;

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == RECOMMENDATIONS_MARKER {
            section = Section::Recommendations;
            continue;
        }
        if line == REASONS_MARKER {
            section = Section::Reasons;
            continue;
        }

        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let Some((_, rest)) = line.split_once('.') else {
            continue;
        };
        let item = rest.trim();
        if item.is_empty() {
            continue;
        }

        match section {
            Section::Recommendations => recommendations.push(item.to_string()),
            Section::Reasons => reasons.push(item.to_string()),
            Section::None => {}
        }
    }

    (recommendations, reasons)
}

fn normalize(items: &mut Vec<String>, n: usize, placeholder: &str) {
    items.truncate(n);
    while items.len() < n {
        items.push(placeholder.to_string());
    }
}
