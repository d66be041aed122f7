//! Filesystem-backed document provider.
//!
//! Scans one docs directory:
//! - `.txt` / `.md` files (prospectus and fact-sheet text extracted
//!   upstream) are chunked with source-id metadata only;
//! - `funds.csv` (the tabular fund catalog) becomes one chunk per fund,
//!   carrying the full metadata the ranker needs.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;

use crate::core::errors::AdvisorError;
use crate::index::{Chunk, ChunkMetadata, RiskLevel};

use super::chunker::TextChunker;
use super::{DocumentProvider, SourceInfo};

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

pub struct FsDocumentProvider {
    docs_dir: PathBuf,
    chunker: TextChunker,
}

impl FsDocumentProvider {
    pub fn new(docs_dir: PathBuf) -> Self {
        Self {
            docs_dir,
            chunker: TextChunker::default(),
        }
    }

    pub fn with_chunker(docs_dir: PathBuf, chunker: TextChunker) -> Self {
        Self { docs_dir, chunker }
    }

    fn source_path(&self, source_id: &str) -> Result<PathBuf, AdvisorError> {
        // source ids are plain file names; reject anything path-like
        if source_id.contains('/') || source_id.contains("..") {
            return Err(AdvisorError::SourceIngest {
                source_id: source_id.to_string(),
                reason: "source id must be a bare file name".to_string(),
            });
        }
        Ok(self.docs_dir.join(source_id))
    }

    fn is_known_source(path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        TEXT_EXTENSIONS.contains(&ext) || ext == "csv"
    }

    fn load_text_source(&self, source_id: &str, path: &Path) -> Result<Vec<Chunk>, AdvisorError> {
        let text = std::fs::read_to_string(path).map_err(|e| AdvisorError::SourceIngest {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })?;

        let metadata = ChunkMetadata::for_source(source_id);
        Ok(self
            .chunker
            .split(&text)
            .into_iter()
            .map(|piece| Chunk {
                text: piece,
                metadata: metadata.clone(),
            })
            .collect())
    }

    fn load_catalog_source(&self, source_id: &str, path: &Path) -> Result<Vec<Chunk>, AdvisorError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AdvisorError::SourceIngest {
            source_id: source_id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(parse_fund_catalog(&raw, source_id))
    }
}

#[async_trait]
impl DocumentProvider for FsDocumentProvider {
    async fn list_sources(&self) -> Result<Vec<SourceInfo>, AdvisorError> {
        let mut sources = Vec::new();
        let entries = std::fs::read_dir(&self.docs_dir)?;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !Self::is_known_source(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let modified_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            sources.push(SourceInfo {
                source_id: name.to_string(),
                modified_at,
            });
        }

        sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(sources)
    }

    async fn load_source(&self, source_id: &str) -> Result<Vec<Chunk>, AdvisorError> {
        let path = self.source_path(source_id)?;
        if !path.is_file() {
            return Err(AdvisorError::SourceIngest {
                source_id: source_id.to_string(),
                reason: "file not found".to_string(),
            });
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        if ext == "csv" {
            self.load_catalog_source(source_id, &path)
        } else {
            self.load_text_source(source_id, &path)
        }
    }
}

/// Parses the fund catalog CSV into one metadata-rich chunk per row.
/// Malformed rows are skipped with a warning rather than failing the
/// whole source.
fn parse_fund_catalog(raw: &str, source_id: &str) -> Vec<Chunk> {
    let mut lines = raw.lines();
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };

    let header: Vec<String> = split_csv_line(header_line)
        .into_iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let column = |name: &str| header.iter().position(|h| h == name);

    let fund_code_col = column("fund_code");
    let fund_name_col = column("fund_name");
    let benchmark_col = column("benchmark");
    let listing_date_col = column("listing_date");
    let objective_col = column("objective");
    let strategy_col = column("strategy");
    let description_col = column("description");
    let risk_level_col = column("risk_level");
    let expense_ratio_col = column("expense_ratio");

    let field = |row: &[String], col: Option<usize>| -> Option<String> {
        col.and_then(|i| row.get(i))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut chunks = Vec::new();
    for (line_no, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = split_csv_line(line);
        if row.len() != header.len() {
            tracing::warn!(
                "{}: row {} has {} fields, expected {}; skipped",
                source_id,
                line_no + 2,
                row.len(),
                header.len()
            );
            continue;
        }

        let fund_code = field(&row, fund_code_col);
        let fund_name = field(&row, fund_name_col);
        let risk_level = field(&row, risk_level_col).and_then(|v| v.parse::<RiskLevel>().ok());
        let expense_ratio = field(&row, expense_ratio_col).and_then(|v| v.parse::<f64>().ok());
        let listing_date = field(&row, listing_date_col);

        let mut text = String::new();
        let mut push_line = |label: &str, value: Option<String>| {
            if let Some(value) = value {
                text.push_str(label);
                text.push_str(": ");
                text.push_str(&value);
                text.push('\n');
            }
        };
        push_line("Fund code", fund_code.clone());
        push_line("Fund name", fund_name.clone());
        push_line("Benchmark index", field(&row, benchmark_col));
        push_line("Listed", listing_date.clone());
        push_line("Objective", field(&row, objective_col));
        push_line("Strategy", field(&row, strategy_col));
        push_line("Description", field(&row, description_col));
        push_line("Risk level", risk_level.map(|r| r.to_string()));
        push_line("Expense ratio", expense_ratio.map(|e| e.to_string()));

        if text.is_empty() {
            continue;
        }

        chunks.push(Chunk {
            text: text.trim_end().to_string(),
            metadata: ChunkMetadata {
                source_id: source_id.to_string(),
                fund_code,
                fund_name,
                risk_level,
                expense_ratio,
                listing_date,
            },
        });
    }

    chunks
}

/// Minimal CSV field splitter: quoted fields may contain commas, doubled
/// quotes escape a quote.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
