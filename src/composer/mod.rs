//! Generation-side composition: prompts out, validated structure back.

mod rebalance;
mod recommend;

pub use rebalance::{needs_rebalancing, RebalanceComposer, RebalanceReport};
pub use recommend::{RecommendComposer, RecommendationResult, NO_MATCH_MESSAGE};
