//! Analysis of the finished episode table.
//!
//! Everything here is a pure function of the table and the analysis
//! configuration. Model fits that cannot be computed return `ModelError`,
//! which the report records without stopping the other analyses.

pub mod discontinuity;
pub mod group;
pub mod regression;
mod report;
pub mod stats;
pub mod term_frequency;

pub use report::{AnalysisReport, ModelOutcome, TermSummary};

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::models::EpisodeRecord;
use term_frequency::{keyword_matrix, synopsis_matrix, Stopwords};

/// Why a model could not be fit. Distinct from data errors in the table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("insufficient data: need at least {needed} observations, found {found}")]
    InsufficientData { needed: usize, found: usize },

    #[error("degenerate predictor: {0}")]
    DegeneratePredictor(String),

    #[error("design matrix is singular")]
    Singular,

    #[error("response has no variance")]
    ConstantResponse,

    #[error("distribution error: {0}")]
    Distribution(String),
}

/// Run every analysis over the table.
pub fn analyze(records: &[EpisodeRecord], config: &AnalysisConfig) -> AnalysisReport {
    let rated = records.iter().filter(|r| r.is_rated()).count();
    info!("Analyzing {} episodes ({} rated)", records.len(), rated);

    let stopwords = Stopwords::with_extra(&config.extra_stopwords);
    let keywords = keyword_matrix(records, &stopwords);
    let synopsis = synopsis_matrix(records, &stopwords);
    let pruned = synopsis.remove_sparse_terms(config.synopsis_sparsity);

    let terms = TermSummary {
        keyword_terms: keywords.terms().len(),
        synopsis_terms: synopsis.terms().len(),
        synopsis_terms_kept: pruned.terms().len(),
        top_keywords: keywords.top_terms(config.top_terms),
        top_synopsis_terms: synopsis.top_terms(config.top_terms),
        top_tfidf_terms: pruned.tfidf().top_terms(config.top_terms),
    };

    AnalysisReport {
        episodes: records.len(),
        rated,
        terms,
        director_means: group::mean_rating_by_director(records),
        director_comparison: outcome(
            "director comparison",
            group::compare_director(records, &config.compare_director),
        ),
        character_regression: outcome(
            "character score regression",
            regression::rating_on_character_score(records),
        ),
        discontinuity: outcome(
            "discontinuity",
            discontinuity::estimate(records, config.cutoff, config.discontinuity_bandwidth),
        ),
        factors: outcome(
            "factor regression",
            regression::rating_on_factors(records, config.complement_outside_director),
        ),
    }
}

fn outcome<T>(name: &str, result: Result<T, ModelError>) -> ModelOutcome<T> {
    match result {
        Ok(fit) => ModelOutcome::Fitted(fit),
        Err(e) => {
            warn!("Skipping {}: {}", name, e);
            ModelOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Record with `score` presence flags set, for model tests.
#[cfg(test)]
pub(crate) fn test_record(
    index: u32,
    rating: Option<f64>,
    score: u32,
    credit: Option<&str>,
) -> EpisodeRecord {
    use crate::config::DEFAULT_CUTOFF;
    use crate::models::CharacterPresence;
    use crate::tabulate::{credit_mentions, departed_from_source, normalize_director};

    let presence: CharacterPresence = (0..score.max(5))
        .map(|i| (format!("c{}", i), i < score))
        .collect();

    EpisodeRecord {
        season: (index - 1) / 10 + 1,
        episode_in_season: (index - 1) % 10 + 1,
        global_index: index,
        title: format!("Episode {}", index),
        synopsis: String::new(),
        keywords: Some(Vec::new()),
        rating,
        air_date: None,
        director_credit_text: credit.map(str::to_string),
        link: format!("https://example.com/title/tt{}/", index),
        director: credit.and_then(normalize_director),
        presence,
        character_score: score,
        departed_from_source: departed_from_source(index, DEFAULT_CUTOFF),
        outside_director: credit.map(|c| !credit_mentions(c, "David Benioff")),
    }
}
