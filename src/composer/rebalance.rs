//! Rebalancing-report composition.
//!
//! Three independent completions over fixed templates (performance,
//! need assessment, concrete suggestions), all parameterized by the same
//! profile and holdings. The binary need flag is a literal substring scan
//! of the need narrative; structurally extracting it from the model is
//! the recorded follow-up, not current behavior.

use serde::Serialize;

use crate::llm::MeteredLlm;
use crate::ranker::CustomerProfile;

// The two affirmative phrases the need narrative is scanned for.
const AFFIRMATIVE_PHRASES: [&str; 2] = ["rebalancing is needed", "rebalancing is recommended"];

const NARRATIVE_FALLBACK: &str =
    "Sorry, the service is temporarily unavailable. Please try again shortly.";

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    pub report_id: String,
    pub customer_id: String,
    pub analysis_date: String,
    pub report: String,
    pub performance_analysis: String,
    pub need_assessment: String,
    pub rebalancing_needed: bool,
    pub suggestions: String,
}

#[derive(Clone)]
pub struct RebalanceComposer {
    llm: MeteredLlm,
}

impl RebalanceComposer {
    pub fn new(llm: MeteredLlm) -> Self {
        Self { llm }
    }

    /// Generates the three narratives and assembles the composite report.
    /// A failed completion degrades that narrative to a fixed apology;
    /// the report is always returned.
    pub async fn compose(&self, profile: &CustomerProfile) -> RebalanceReport {
        let performance_analysis = self
            .narrative("rebalance_performance", &performance_prompt(profile))
            .await;
        let need_assessment = self
            .narrative("rebalance_need", &need_prompt(profile))
            .await;
        let suggestions = self
            .narrative("rebalance_suggestions", &suggestions_prompt(profile))
            .await;

        let rebalancing_needed = needs_rebalancing(&need_assessment);
        let analysis_date = chrono::Local::now().format("%Y-%m-%d").to_string();

        let report = format!(
            "Customer ID: {}\n\
             Analysis date: {}\n\
             \n\
             1. Portfolio performance\n\
             {}\n\
             \n\
             2. Rebalancing need\n\
             {}\n\
             \n\
             3. Rebalancing suggestions\n\
             {}",
            profile.customer_id, analysis_date, performance_analysis, need_assessment, suggestions,
        );

        RebalanceReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            customer_id: profile.customer_id.clone(),
            analysis_date,
            report,
            performance_analysis,
            need_assessment,
            rebalancing_needed,
            suggestions,
        }
    }

    async fn narrative(&self, operation: &str, prompt: &str) -> String {
        match self.llm.complete(operation, prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("{} narrative failed: {}", operation, e);
                NARRATIVE_FALLBACK.to_string()
            }
        }
    }
}

/// Literal keyword heuristic over the need narrative. Case-insensitive so
/// sentence-initial phrasing still matches.
pub fn needs_rebalancing(need_narrative: &str) -> bool {
    let lowered = need_narrative.to_lowercase();
    AFFIRMATIVE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

fn profile_preamble(profile: &CustomerProfile) -> String {
    format!(
        "Customer investment profile:\n\
         - Age: {}\n\
         - Risk tolerance: {}\n\
         - Finances: monthly income {}, savings {}\n\
         \n\
         Currently held ETFs: {}\n",
        profile.age,
        profile.risk_tolerance,
        profile.income,
        profile.savings,
        profile.etfs_owned.join(", "),
    )
}

const TONE_GUIDE: &str = "\
When writing, keep in mind:\n\
- Use plain language instead of jargon\n\
- Keep a friendly, conversational tone\n\
- Illustrate with concrete examples\n\
- Stay positive and encouraging";

fn performance_prompt(profile: &CustomerProfile) -> String {
    format!(
        "Hello! Let's review this customer's ETF portfolio.\n\
         \n\
         {}\n\
         Explain the following clearly and kindly:\n\
         1. Each ETF's performance and characteristics over the last year\n\
         2. How well the current portfolio is diversified\n\
         3. Whether it fits the customer's situation (age, risk tolerance, finances)\n\
         \n\
         {}",
        profile_preamble(profile),
        TONE_GUIDE,
    )
}

fn need_prompt(profile: &CustomerProfile) -> String {
    format!(
        "Hello! Let's assess whether this customer's portfolio needs rebalancing.\n\
         \n\
         {}\n\
         Explain the following clearly and kindly:\n\
         1. Whether the current portfolio needs rebalancing; if it does, state \
         plainly that rebalancing is needed\n\
         2. The reasons it is or is not needed\n\
         3. Advice suited to the customer's situation\n\
         \n\
         {}",
        profile_preamble(profile),
        TONE_GUIDE,
    )
}

fn suggestions_prompt(profile: &CustomerProfile) -> String {
    format!(
        "Hello! Let's propose portfolio adjustments for this customer.\n\
         \n\
         {}\n\
         Explain the following clearly and kindly:\n\
         1. A concrete adjustment strategy\n\
         2. A sensible target weight for each ETF\n\
         3. Specific buys or sells where warranted\n\
         4. When and how often to revisit the portfolio\n\
         \n\
         {}",
        profile_preamble(profile),
        TONE_GUIDE,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::index::RiskLevel;
    use crate::llm::mock::MockLlm;
    use crate::llm::{MeteredLlm, UsageMetrics};

    fn composer(mock: Arc<MockLlm>) -> RebalanceComposer {
        let metered =
            MeteredLlm::new(mock, "test-model".to_string(), Arc::new(UsageMetrics::default()));
        RebalanceComposer::new(metered)
    }

    fn profile() -> CustomerProfile {
        CustomerProfile {
            customer_id: "c7".to_string(),
            age: 52,
            risk_tolerance: RiskLevel::Low,
            monthly_investment: 300_000,
            income: 6_000_000,
            savings: 80_000_000,
            etfs_owned: vec!["KX100".to_string(), "GB10".to_string()],
        }
    }

    #[test]
    fn affirmative_phrases_set_the_flag() {
        assert!(needs_rebalancing(
            "Given the drift in your equity weight, rebalancing is needed."
        ));
        assert!(needs_rebalancing(
            "Rebalancing is recommended once a year in your situation."
        ));
        assert!(!needs_rebalancing(
            "Your portfolio looks well balanced; no changes required."
        ));
        assert!(!needs_rebalancing(""));
    }

    #[tokio::test]
    async fn three_narratives_make_one_report() {
        let mock = Arc::new(MockLlm::new());
        mock.push_completion("Performance looks steady.");
        mock.push_completion("In short, rebalancing is needed this quarter.");
        mock.push_completion("Shift 10% from equities into bonds.");

        let report = composer(mock.clone()).compose(&profile()).await;

        assert_eq!(mock.complete_calls(), 3);
        assert!(report.rebalancing_needed);
        assert_eq!(report.customer_id, "c7");
        assert!(report.report.contains("1. Portfolio performance"));
        assert!(report.report.contains("2. Rebalancing need"));
        assert!(report.report.contains("3. Rebalancing suggestions"));
        assert!(report.report.contains("Performance looks steady."));
        assert_eq!(report.suggestions, "Shift 10% from equities into bonds.");
    }

    #[tokio::test]
    async fn failed_narrative_degrades_to_apology() {
        let mock = Arc::new(MockLlm::new());
        // only the first narrative succeeds
        mock.push_completion("Performance looks fine.");

        let report = composer(mock).compose(&profile()).await;

        assert_eq!(report.performance_analysis, "Performance looks fine.");
        assert_eq!(report.need_assessment, NARRATIVE_FALLBACK);
        assert!(!report.rebalancing_needed);
        assert!(report.report.contains(NARRATIVE_FALLBACK));
    }
}
