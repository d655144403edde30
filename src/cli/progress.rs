//! Terminal progress for the scrape pipeline.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{MissingPage, ScrapeProgress};

/// One bar per season, replaced as each season starts.
pub struct ScrapeProgressBar {
    bar: Option<ProgressBar>,
    style: ProgressStyle,
}

impl ScrapeProgressBar {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");

        Self {
            bar: None,
            style,
        }
    }
}

impl Default for ScrapeProgressBar {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeProgress for ScrapeProgressBar {
    fn season_started(&mut self, season: u32, episodes: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let bar = ProgressBar::new(episodes as u64);
        bar.set_style(self.style.clone());
        bar.set_message(format!("Season {}", season));
        self.bar = Some(bar);
    }

    fn episode_done(&mut self, global_index: u32, title: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("#{} {}", global_index, title));
            bar.inc(1);
        }
    }

    fn page_skipped(&mut self, missing: &MissingPage) {
        let line = format!(
            "{} skipped season {} {} page: {}",
            style("!").yellow(),
            missing.season,
            missing.page,
            missing.error
        );
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{}", line),
        }
    }

    fn finished(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
