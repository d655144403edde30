//! Term-by-document matrices over keywords and synopses.
//!
//! Terms are kept in alphabetical order so every derived table is independent
//! of the order the documents arrive in.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::EpisodeRecord;

/// Common English stop words removed from both matrices.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "as", "is", "was", "are", "were", "been", "be", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can", "this",
    "that", "these", "those", "it", "its", "they", "them", "their", "we", "our", "you", "your",
    "he", "she", "him", "her", "his", "hers", "himself", "herself", "themselves", "i", "me", "my",
    "all", "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "nor",
    "not", "only", "own", "same", "so", "than", "too", "very", "just", "also", "now", "here",
    "there", "when", "where", "why", "how", "what", "which", "who", "whom", "whose", "about",
    "after", "before", "between", "into", "through", "during", "above", "below", "up", "down",
    "out", "off", "over", "under", "again", "further", "then", "once", "while", "if", "because",
    "until", "against", "any", "s", "t",
];

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex"));

/// Stop word set: the built-in list plus configured extras, compared lowercase.
#[derive(Debug, Clone)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn with_extra(extra: &[String]) -> Self {
        let words = STOP_WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.iter().map(|w| w.to_lowercase()))
            .collect();
        Self { words }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(&term.to_lowercase())
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::with_extra(&[])
    }
}

/// A term with its total count across all documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: u32,
}

/// A term with its summed TF-IDF weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

/// Counts of each term (rows) in each document (columns).
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatrix {
    terms: Vec<String>,
    counts: Vec<Vec<u32>>,
    documents: usize,
}

impl TermMatrix {
    /// Build from tokenized documents.
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut rows: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for (doc, tokens) in documents.iter().enumerate() {
            for token in tokens {
                rows.entry(token.as_str())
                    .or_insert_with(|| vec![0; documents.len()])[doc] += 1;
            }
        }

        let (terms, counts) = rows
            .into_iter()
            .map(|(term, counts)| (term.to_string(), counts))
            .unzip();

        Self {
            terms,
            counts,
            documents: documents.len(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn count(&self, term: &str, document: usize) -> Option<u32> {
        let row = self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()?;
        self.counts[row].get(document).copied()
    }

    /// Number of documents containing each term.
    pub fn document_frequency(&self, term: &str) -> Option<usize> {
        let row = self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()?;
        Some(self.counts[row].iter().filter(|&&c| c > 0).count())
    }

    /// The `n` most frequent terms, ties broken alphabetically.
    pub fn top_terms(&self, n: usize) -> Vec<TermCount> {
        let mut totals: Vec<TermCount> = self
            .terms
            .iter()
            .zip(&self.counts)
            .map(|(term, counts)| TermCount {
                term: term.clone(),
                count: counts.iter().sum(),
            })
            .collect();

        totals.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        totals.truncate(n);
        totals
    }

    /// Keep only terms whose document frequency exceeds `N * (1 - sparsity)`.
    pub fn remove_sparse_terms(&self, sparsity: f64) -> Self {
        let threshold = self.documents as f64 * (1.0 - sparsity);
        let (terms, counts) = self
            .terms
            .iter()
            .zip(&self.counts)
            .filter(|(_, counts)| counts.iter().filter(|&&c| c > 0).count() as f64 > threshold)
            .map(|(term, counts)| (term.clone(), counts.clone()))
            .unzip();

        Self {
            terms,
            counts,
            documents: self.documents,
        }
    }

    /// TF-IDF weights: term count over document length, times `log2(N / df)`.
    ///
    /// Document length is the column sum of this matrix, so weights after
    /// pruning are relative to the surviving terms. Empty documents weigh zero.
    pub fn tfidf(&self) -> TfIdfMatrix {
        let lengths: Vec<u32> = (0..self.documents)
            .map(|doc| self.counts.iter().map(|row| row[doc]).sum())
            .collect();

        let weights = self
            .counts
            .iter()
            .map(|row| {
                let df = row.iter().filter(|&&c| c > 0).count();
                let idf = if df == 0 {
                    0.0
                } else {
                    (self.documents as f64 / df as f64).log2()
                };
                row.iter()
                    .zip(&lengths)
                    .map(|(&count, &len)| {
                        if len == 0 {
                            0.0
                        } else {
                            count as f64 / len as f64 * idf
                        }
                    })
                    .collect()
            })
            .collect();

        TfIdfMatrix {
            terms: self.terms.clone(),
            weights,
        }
    }
}

/// TF-IDF weights with the same layout as `TermMatrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct TfIdfMatrix {
    terms: Vec<String>,
    weights: Vec<Vec<f64>>,
}

impl TfIdfMatrix {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn weight(&self, term: &str, document: usize) -> Option<f64> {
        let row = self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()?;
        self.weights[row].get(document).copied()
    }

    /// Terms ranked by summed weight, ties broken alphabetically.
    pub fn top_terms(&self, n: usize) -> Vec<TermWeight> {
        let mut totals: Vec<TermWeight> = self
            .terms
            .iter()
            .zip(&self.weights)
            .map(|(term, row)| TermWeight {
                term: term.clone(),
                weight: row.iter().sum(),
            })
            .collect();

        totals.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.term.cmp(&b.term))
        });
        totals.truncate(n);
        totals
    }
}

/// Keyword matrix: one document per episode, keywords used as-is.
///
/// Episodes whose keyword page was missing contribute an empty document.
pub fn keyword_matrix(records: &[EpisodeRecord], stopwords: &Stopwords) -> TermMatrix {
    let documents: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            r.keyword_slice()
                .iter()
                .filter(|k| !k.trim().is_empty() && !stopwords.contains(k))
                .cloned()
                .collect()
        })
        .collect();
    TermMatrix::from_documents(&documents)
}

/// Synopsis matrix: lowercased, punctuation stripped, stop words removed.
pub fn synopsis_matrix(records: &[EpisodeRecord], stopwords: &Stopwords) -> TermMatrix {
    let documents: Vec<Vec<String>> = records
        .iter()
        .map(|r| tokenize(&r.synopsis, stopwords))
        .collect();
    TermMatrix::from_documents(&documents)
}

/// Split free text into lowercase terms.
pub fn tokenize(text: &str, stopwords: &Stopwords) -> Vec<String> {
    let lowered = text.to_lowercase();
    PUNCTUATION
        .replace_all(&lowered, "")
        .split_whitespace()
        .filter(|term| !stopwords.contains(term) && !term.chars().all(|c| c.is_numeric()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|d| d.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn tokenizer_strips_punctuation_and_stopwords() {
        let terms = tokenize("Jon's army marches to the Wall, 300 strong!", &Stopwords::default());
        assert_eq!(terms, vec!["jons", "army", "marches", "wall", "strong"]);
    }

    #[test]
    fn extra_stopwords_are_case_insensitive() {
        let stopwords = Stopwords::with_extra(&["Westeros".to_string()]);
        assert!(stopwords.contains("westeros"));
        assert!(stopwords.contains("The"));
        assert!(!stopwords.contains("dragon"));
    }

    #[test]
    fn top_terms_sort_by_count_then_term() {
        let matrix = TermMatrix::from_documents(&docs(&[
            &["wolf", "dragon", "wolf"],
            &["dragon", "crow"],
            &["crow", "wolf"],
        ]));

        let top = matrix.top_terms(3);
        assert_eq!(top[0], TermCount { term: "wolf".into(), count: 3 });
        assert_eq!(top[1], TermCount { term: "crow".into(), count: 2 });
        assert_eq!(top[2], TermCount { term: "dragon".into(), count: 2 });
    }

    #[test]
    fn top_terms_ignore_document_order() {
        let forward = docs(&[&["a1", "b2"], &["b2", "c3"], &["c3", "a1", "d4"]]);
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(
            TermMatrix::from_documents(&forward).top_terms(10),
            TermMatrix::from_documents(&reversed).top_terms(10)
        );
    }

    #[test]
    fn sparse_terms_are_removed() {
        let matrix = TermMatrix::from_documents(&docs(&[
            &["king", "rare"],
            &["king"],
            &["king", "queen"],
            &["queen"],
        ]));

        // Keep terms in more than 4 * (1 - 0.6) = 1.6 documents
        let pruned = matrix.remove_sparse_terms(0.6);
        assert_eq!(pruned.terms(), &["king".to_string(), "queen".to_string()]);
        assert_eq!(pruned.documents(), 4);
        assert_eq!(pruned.document_frequency("king"), Some(3));
    }

    #[test]
    fn tfidf_normalizes_by_document_length() {
        let matrix = TermMatrix::from_documents(&docs(&[
            &["king", "king", "queen", "rare"],
            &["king"],
        ]));
        let tfidf = matrix.tfidf();

        // Present everywhere: idf = log2(2/2) = 0
        assert_eq!(tfidf.weight("king", 0), Some(0.0));
        // tf = 1/4, idf = log2(2/1) = 1
        assert!((tfidf.weight("queen", 0).unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(tfidf.weight("queen", 1), Some(0.0));
    }

    #[test]
    fn empty_documents_weigh_zero() {
        let matrix = TermMatrix::from_documents(&docs(&[&["king"], &[]]));
        let tfidf = matrix.tfidf();
        assert_eq!(tfidf.weight("king", 1), Some(0.0));
        assert_eq!(matrix.count("king", 1), Some(0));
    }
}
