//! Collected analysis results and their terminal rendering.

use console::style;
use serde::Serialize;

use super::discontinuity::Discontinuity;
use super::group::{DirectorMean, GroupComparison};
use super::regression::{MultipleRegression, SimpleRegression};
use super::term_frequency::{TermCount, TermWeight};

/// A fitted model, or the reason it could not be fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome<T> {
    Fitted(T),
    Failed { error: String },
}

impl<T> ModelOutcome<T> {
    pub fn fitted(&self) -> Option<&T> {
        match self {
            ModelOutcome::Fitted(fit) => Some(fit),
            ModelOutcome::Failed { .. } => None,
        }
    }
}

/// Term frequency results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSummary {
    /// Distinct keyword terms after stop word removal.
    pub keyword_terms: usize,
    pub synopsis_terms: usize,
    /// Synopsis terms surviving sparse-term pruning.
    pub synopsis_terms_kept: usize,
    pub top_keywords: Vec<TermCount>,
    pub top_synopsis_terms: Vec<TermCount>,
    pub top_tfidf_terms: Vec<TermWeight>,
}

/// Everything the analyzer produces for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub episodes: usize,
    pub rated: usize,
    pub terms: TermSummary,
    pub director_means: Vec<DirectorMean>,
    pub director_comparison: ModelOutcome<GroupComparison>,
    pub character_regression: ModelOutcome<SimpleRegression>,
    pub discontinuity: ModelOutcome<Discontinuity>,
    pub factors: ModelOutcome<MultipleRegression>,
}

impl AnalysisReport {
    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!(
            "\n{} {} episodes, {} rated",
            style("Episode table:").bold(),
            self.episodes,
            self.rated
        );

        println!("\n{}", style("Top keywords").cyan());
        print_counts(&self.terms.top_keywords);

        println!("\n{}", style("Top synopsis terms").cyan());
        print_counts(&self.terms.top_synopsis_terms);
        println!(
            "  {} {} of {} synopsis terms kept after sparse pruning",
            style("→").dim(),
            self.terms.synopsis_terms_kept,
            self.terms.synopsis_terms
        );
        for term in self.terms.top_tfidf_terms.iter().take(5) {
            println!("  {:<24} tf-idf {:.4}", term.term, term.weight);
        }

        println!("\n{}", style("Mean rating by director").cyan());
        for row in &self.director_means {
            println!(
                "  {:<28} {:>5.2}  ({} episodes)",
                row.director, row.mean_rating, row.episodes
            );
        }

        println!("\n{}", style("Director comparison (Welch t-test)").cyan());
        print_outcome(&self.director_comparison, |c| {
            println!("  {}", c.predicate);
            println!(
                "  mean {:.3} (n={}) vs {:.3} (n={})",
                c.mean_matching, c.n_matching, c.mean_other, c.n_other
            );
            println!("  t = {:.3}, df = {:.2}, {}", c.t, c.df, p_label(c.p_value));
        });

        println!("\n{}", style("Rating ~ character score").cyan());
        print_outcome(&self.character_regression, |r| {
            println!(
                "  coef {:.4} (se {:.4}), t = {:.3}, {}",
                r.coefficient,
                r.std_error,
                r.t_value,
                p_label(r.p_value)
            );
            println!("  R² = {:.3}, n = {}", r.r_squared, r.n);
        });

        println!("\n{}", style("Discontinuity at cutoff").cyan());
        print_outcome(&self.discontinuity, |d| {
            println!(
                "  cutoff {} (bandwidth {:.1}, {} left / {} right)",
                d.cutoff, d.bandwidth, d.n_left, d.n_right
            );
            println!(
                "  jump {:.4} (HC1 se {:.4}), z = {:.3}, {}",
                d.estimate,
                d.std_error,
                d.z,
                p_label(d.p_value)
            );
        });

        println!("\n{}", style("Rating ~ factors").cyan());
        print_outcome(&self.factors, |m| {
            println!(
                "  {:<22} {:>9} {:>9} {:>8} {:>9} {:>8}",
                "", "coef", "se", "t", "p", "beta"
            );
            for c in &m.coefficients {
                println!(
                    "  {:<22} {:>9.4} {:>9.4} {:>8.3} {:>9.4} {:>8.3}",
                    c.name, c.estimate, c.std_error, c.t_value, c.p_value, c.standardized
                );
            }
            println!(
                "  R² = {:.3}, adjusted R² = {:.3}, n = {}",
                m.r_squared, m.adj_r_squared, m.n
            );
            println!("  importance: {}", m.importance.join(" > "));
        });
    }
}

fn print_counts(counts: &[TermCount]) {
    if counts.is_empty() {
        println!("  {}", style("(none)").dim());
    }
    for term in counts {
        println!("  {:<24} {:>5}", term.term, term.count);
    }
}

fn print_outcome<T>(outcome: &ModelOutcome<T>, render: impl FnOnce(&T)) {
    match outcome {
        ModelOutcome::Fitted(fit) => render(fit),
        ModelOutcome::Failed { error } => {
            println!("  {} {}", style("✗ not fitted:").red(), error)
        }
    }
}

fn p_label(p: f64) -> String {
    let text = format!("p = {:.4}", p);
    if p < 0.05 {
        style(text).green().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serializes_with_status_tag() {
        let outcome: ModelOutcome<SimpleRegression> = ModelOutcome::Failed {
            error: "design matrix is singular".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "design matrix is singular");
        assert!(outcome.fitted().is_none());
    }

    #[test]
    fn fitted_outcome_inlines_the_model() {
        let outcome = ModelOutcome::Fitted(SimpleRegression {
            predictor: "character_score".to_string(),
            intercept: 1.0,
            coefficient: 0.5,
            std_error: 0.1,
            t_value: 5.0,
            p_value: 0.01,
            r_squared: 0.9,
            n: 10,
        });
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["status"], "fitted");
        assert_eq!(json["predictor"], "character_score");
        assert_eq!(json["n"], 10);
    }
}
