//! Product facade over retrieval, ranking and composition.
//!
//! Everything is constructed explicitly and injected; request handlers
//! only ever see this service. The recommendation path degrades to a
//! fixed generic product list when the retrieval backend is down, so the
//! end user gets an apology instead of an error.

use std::sync::Arc;

use crate::composer::{RebalanceComposer, RebalanceReport, RecommendComposer, RecommendationResult};
use crate::core::errors::AdvisorError;
use crate::index::IndexService;
use crate::ranker::{self, CustomerProfile};

const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "SPY - SPDR S&P 500 ETF Trust",
    "QQQ - Invesco QQQ Trust",
    "VTI - Vanguard Total Stock Market ETF",
];
const FALLBACK_REASON: &str =
    "Sorry, a temporary system issue occurred. Please try again shortly.";

/// Which product surface an analysis request resolved to.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Recommendation(RecommendationResult),
    Rebalance(RebalanceReport),
}

#[derive(Clone)]
pub struct AdvisorService {
    index: Arc<IndexService>,
    recommend: RecommendComposer,
    rebalance: RebalanceComposer,
    search_k: usize,
    shortlist_size: usize,
}

impl AdvisorService {
    pub fn new(
        index: Arc<IndexService>,
        recommend: RecommendComposer,
        rebalance: RebalanceComposer,
        search_k: usize,
        shortlist_size: usize,
    ) -> Self {
        Self {
            index,
            recommend,
            rebalance,
            search_k: search_k.max(shortlist_size).max(1),
            shortlist_size: shortlist_size.max(1),
        }
    }

    /// Recommendation path: similarity search → customer weighting →
    /// composition. Backend failures degrade to the fixed fallback list.
    pub async fn recommend(&self, profile: &CustomerProfile) -> RecommendationResult {
        match self.recommend_inner(profile).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "recommendation for customer {} degraded: {}",
                    profile.customer_id,
                    e
                );
                fallback_recommendation()
            }
        }
    }

    async fn recommend_inner(
        &self,
        profile: &CustomerProfile,
    ) -> Result<RecommendationResult, AdvisorError> {
        let query = ranker::retrieval_query(profile);
        let hits = self.index.search(&query, self.search_k).await?;
        let shortlist = ranker::rank(hits, profile, self.shortlist_size);
        self.recommend.compose(profile, &shortlist).await
    }

    /// Rebalancing path; does not touch the index, and the composer
    /// degrades per narrative, so this cannot fail.
    pub async fn rebalance_report(&self, profile: &CustomerProfile) -> RebalanceReport {
        self.rebalance.compose(profile).await
    }

    /// Routes on holdings: customers with ETFs get a rebalancing report,
    /// everyone else a recommendation.
    pub async fn analyze(&self, profile: &CustomerProfile) -> AnalysisOutcome {
        if profile.has_holdings() {
            AnalysisOutcome::Rebalance(self.rebalance_report(profile).await)
        } else {
            AnalysisOutcome::Recommendation(self.recommend(profile).await)
        }
    }
}

fn fallback_recommendation() -> RecommendationResult {
    RecommendationResult {
        recommendations: FALLBACK_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        reasons: vec![FALLBACK_REASON.to_string(); FALLBACK_RECOMMENDATIONS.len()],
        portfolio_analysis: None,
        rebalancing_needed: None,
        rebalancing_suggestions: None,
    }
}
