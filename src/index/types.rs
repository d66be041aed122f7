use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Qualitative risk tier shared by fund metadata and customer profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(name)
    }
}

impl FromStr for RiskLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            _ => Err(()),
        }
    }
}

/// Structured metadata attached to a chunk. Only `source_id` is always
/// present; ranking degrades gracefully when the fund fields are missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub fund_code: Option<String>,
    pub fund_name: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub expense_ratio: Option<f64>,
    pub listing_date: Option<String>,
}

impl ChunkMetadata {
    pub fn for_source(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            ..Default::default()
        }
    }
}

/// A unit of ingested text plus metadata; immutable once indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// An indexed chunk with its embedding. Owned exclusively by the index;
/// `chunk_id` is stable and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk_id: u64,
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// One similarity-search result (higher score = more similar).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: u64,
    pub chunk: Chunk,
    pub score: f32,
}
