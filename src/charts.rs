//! SVG charts of the table and the analysis report.

use std::path::{Path, PathBuf};

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::analysis::term_frequency::TermCount;
use crate::analysis::AnalysisReport;
use crate::models::EpisodeRecord;

const SIZE: (u32, u32) = (1024, 640);
const RATING_RANGE: std::ops::Range<f64> = 0.0..10.0;

/// Chart file names, in render order.
pub const CHART_FILES: &[&str] = &[
    "top_keywords.svg",
    "top_synopsis_terms.svg",
    "director_ratings.svg",
    "rating_by_episode.svg",
    "discontinuity.svg",
];

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Drawing failed: {0}")]
    Drawing(String),
}

impl From<DrawingAreaErrorKind<std::io::Error>> for ChartError {
    fn from(e: DrawingAreaErrorKind<std::io::Error>) -> Self {
        ChartError::Drawing(e.to_string())
    }
}

/// Render every chart into `dir`, returning the written paths.
pub fn render_all(
    dir: &Path,
    records: &[EpisodeRecord],
    report: &AnalysisReport,
) -> Result<Vec<PathBuf>, ChartError> {
    std::fs::create_dir_all(dir)?;
    let paths: Vec<PathBuf> = CHART_FILES.iter().map(|name| dir.join(name)).collect();

    bar_chart(
        &paths[0],
        "Top keywords",
        "Count",
        &counts_as_bars(&report.terms.top_keywords),
    )?;
    bar_chart(
        &paths[1],
        "Top synopsis terms",
        "Count",
        &counts_as_bars(&report.terms.top_synopsis_terms),
    )?;
    let director_bars: Vec<(String, f64)> = report
        .director_means
        .iter()
        .map(|d| (d.director.clone(), d.mean_rating))
        .collect();
    bar_chart(&paths[2], "Mean rating by director", "Rating", &director_bars)?;
    rating_line_chart(&paths[3], records)?;
    discontinuity_chart(&paths[4], records, report)?;

    info!("Wrote {} charts to {}", paths.len(), dir.display());
    Ok(paths)
}

fn counts_as_bars(counts: &[TermCount]) -> Vec<(String, f64)> {
    counts
        .iter()
        .map(|c| (c.term.clone(), c.count as f64))
        .collect()
}

/// Vertical bars, one per label, in the given order.
pub fn bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    bars: &[(String, f64)],
) -> Result<(), ChartError> {
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = bars.len().max(1) as i32;
    let top = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0) * 1.1;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(0..n, 0f64..top)?;

    let label = |x: &i32| {
        bars.get(*x as usize)
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&label)
        .x_label_style(("sans-serif", 13).into_font().transform(FontTransform::Rotate90))
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let i = i as i32;
        Rectangle::new([(i, 0.0), (i + 1, *value)], BLUE.mix(0.7).filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Rating against episode index, rated episodes only.
pub fn rating_line_chart(path: &Path, records: &[EpisodeRecord]) -> Result<(), ChartError> {
    let points = rated_points(records);
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Rating by episode", ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(index_range(records), RATING_RANGE)?;
    chart
        .configure_mesh()
        .x_desc("Episode")
        .y_desc("Rating")
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Ratings with the two local fits either side of the cutoff.
pub fn discontinuity_chart(
    path: &Path,
    records: &[EpisodeRecord],
    report: &AnalysisReport,
) -> Result<(), ChartError> {
    let points = rated_points(records);
    let range = index_range(records);
    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Rating discontinuity at cutoff", ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(range.clone(), RATING_RANGE)?;
    chart
        .configure_mesh()
        .x_desc("Episode")
        .y_desc("Rating")
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLACK.mix(0.6).filled())),
    )?;

    if let Some(fit) = report.discontinuity.fitted() {
        let t = fit.threshold;
        let left_start = (t - fit.bandwidth).max(range.start);
        let right_end = (t + fit.bandwidth).min(range.end);

        chart.draw_series(LineSeries::new(
            [left_start, t].map(|x| (x, fit.left.at(x - t))),
            RED.stroke_width(2),
        ))?;
        chart.draw_series(LineSeries::new(
            [t, right_end].map(|x| (x, fit.right.at(x - t))),
            RED.stroke_width(2),
        ))?;
        chart.draw_series(LineSeries::new(
            [(t, RATING_RANGE.start), (t, RATING_RANGE.end)],
            &BLACK.mix(0.4),
        ))?;
    }

    root.present()?;
    Ok(())
}

fn rated_points(records: &[EpisodeRecord]) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| r.rating.map(|rating| (r.global_index as f64, rating)))
        .collect()
}

fn index_range(records: &[EpisodeRecord]) -> std::ops::Range<f64> {
    let last = records.iter().map(|r| r.global_index).max().unwrap_or(1);
    0.0..(last as f64 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, test_record};
    use crate::config::AnalysisConfig;

    #[test]
    fn renders_every_chart_as_svg() {
        let records: Vec<EpisodeRecord> = (1..=50)
            .map(|i| {
                let credit = if i % 5 == 0 { "Neil Marshall" } else { "Alan Taylor" };
                let mut r = test_record(i, Some(8.0 + (i % 4) as f64 * 0.2), i % 3, Some(credit));
                r.keywords = Some(vec!["dragon".to_string(), "wolf".to_string()]);
                r.synopsis = "Jon rides north".to_string();
                r
            })
            .collect();
        let report = analyze(&records, &AnalysisConfig::default());
        let dir = tempfile::tempdir().unwrap();

        let paths = render_all(dir.path(), &records, &report).unwrap();
        assert_eq!(paths.len(), CHART_FILES.len());
        for path in paths {
            let svg = std::fs::read_to_string(&path).unwrap();
            assert!(svg.contains("<svg"), "{} is not SVG", path.display());
        }
    }

    #[test]
    fn empty_table_still_renders() {
        let report = analyze(&[], &AnalysisConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let paths = render_all(dir.path(), &[], &report).unwrap();
        assert!(paths.iter().all(|p| p.exists()));
    }
}
