// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// One prediction result as returned by `POST /submit/`.
///
/// The response is read-only once received. Fields the client does not know
/// about are kept in `extra` so the JSON export reproduces the server's shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionResponse {
    pub sequence_predictions: Vec<SequencePrediction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SequencePrediction {
    pub sequence_name: String,
    pub sequence: String,
    pub site_predictions: Vec<SitePrediction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scored residue. `site` is 1-based into the owning sequence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SitePrediction {
    pub site: usize,
    pub amino_acid: String,
    pub probability: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SitePrediction {
    pub fn new(site: usize, amino_acid: &str, probability: f64) -> Self {
        Self {
            site,
            amino_acid: amino_acid.to_string(),
            probability,
            extra: Map::new(),
        }
    }
}

impl SequencePrediction {
    pub fn new(sequence_name: &str, sequence: &str, site_predictions: Vec<SitePrediction>) -> Self {
        Self {
            sequence_name: sequence_name.to_string(),
            sequence: sequence.to_string(),
            site_predictions,
            extra: Map::new(),
        }
    }
}

impl PredictionResponse {
    pub fn new(sequence_predictions: Vec<SequencePrediction>) -> Self {
        Self {
            sequence_predictions,
            extra: Map::new(),
        }
    }

    pub fn site_count(&self) -> usize {
        self.sequence_predictions
            .iter()
            .map(|s| s.site_predictions.len())
            .sum()
    }

    /// Collects every place where the response breaks its own shape rules.
    /// None of these are fatal: rendering skips out-of-range sites and the
    /// exports reproduce whatever the server sent.
    pub fn consistency_issues(&self) -> Vec<ConsistencyIssue> {
        let mut issues = Vec::new();
        for seq in &self.sequence_predictions {
            if seq.sequence_name.is_empty() {
                issues.push(ConsistencyIssue::EmptyName);
            }
            let residues: Vec<char> = seq.sequence.chars().collect();
            for site in &seq.site_predictions {
                if site.site == 0 || site.site > residues.len() {
                    issues.push(ConsistencyIssue::SiteOutOfRange {
                        sequence_name: seq.sequence_name.clone(),
                        site: site.site,
                        length: residues.len(),
                    });
                    continue;
                }
                let found = residues[site.site - 1];
                let mut expected = site.amino_acid.chars();
                if expected.next() != Some(found) || expected.next().is_some() {
                    issues.push(ConsistencyIssue::ResidueMismatch {
                        sequence_name: seq.sequence_name.clone(),
                        site: site.site,
                        expected: site.amino_acid.clone(),
                        found,
                    });
                }
            }
        }
        issues
    }

    /// Logs each consistency issue as a warning and returns how many there were.
    pub fn warn_on_inconsistencies(&self) -> usize {
        let issues = self.consistency_issues();
        for issue in &issues {
            warn!("Prediction response: {}", issue);
        }
        issues.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyIssue {
    EmptyName,
    SiteOutOfRange {
        sequence_name: String,
        site: usize,
        length: usize,
    },
    ResidueMismatch {
        sequence_name: String,
        site: usize,
        expected: String,
        found: char,
    },
}

impl fmt::Display for ConsistencyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyIssue::EmptyName => write!(f, "sequence with an empty name"),
            ConsistencyIssue::SiteOutOfRange { sequence_name, site, length } => write!(
                f,
                "{}: site {} is outside the sequence (length {})",
                sequence_name, site, length
            ),
            ConsistencyIssue::ResidueMismatch { sequence_name, site, expected, found } => write!(
                f,
                "{}: site {} is scored as '{}' but the sequence has '{}'",
                sequence_name, site, expected, found
            ),
        }
    }
}

/// Body of `POST /submit/`. All four fields are sent as raw strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SubmitRequest {
    pub ptm: String,
    pub label: String,
    pub organism: String,
    pub text: String,
}

/// One entry of `/ptms`, `/organisms` or `/labels`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReferenceOption {
    pub name: String,
    pub description: String,
}

/// Error body of a rejected submission, e.g. `{"detail": [{"msg": "..."}]}`.
/// Any other shape deserializes with `detail` empty.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "lenient_detail")]
    pub detail: Vec<ErrorDetail>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub msg: String,
}

// `detail` is sometimes a plain string (e.g. 404 "Not Found"); only the list form carries messages.
fn lenient_detail<'de, D>(deserializer: D) -> Result<Vec<ErrorDetail>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ErrorDetail>(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
