//! End-to-end scrape tests
//!
//! Replays saved pages through the full fetch → parse → tabulate pipeline
//! with an in-memory page source, then persists and reloads the table.

use episcope::analysis::{analyze, ModelOutcome};
use episcope::config::{Config, FailurePolicy};
use episcope::models::PageKind;
use episcope::pipeline::{scrape, MissingPage, PipelineError, ScrapeProgress, Stage};
use episcope::scrapers::StaticPages;
use episcope::storage::{load_table, save_table};
use episcope::tabulate::Tabulator;

const LISTING_URL: &str = "https://www.imdb.com/title/tt0944947/episodes?season=1";
const SEASON_3_URL: &str = "https://www.imdb.com/title/tt0944947/episodes?season=3";
const SEASON_1: &str = include_str!("fixtures/season_1.html");
const KEYWORDS_EP1: &str = include_str!("fixtures/keywords_ep1.html");
const CREDITS_EP1: &str = include_str!("fixtures/credits_ep1.html");

fn keywords_page(words: &[&str]) -> String {
    let cells: String = words
        .iter()
        .map(|w| format!(r#"<td><div class="sodatext"><a href="/k">{}</a></div></td>"#, w))
        .collect();
    format!("<html><body><table><tr>{}</tr></table></body></html>", cells)
}

fn credits_page(director: &str) -> String {
    format!(
        r#"<html><body><h4 id="director">Directed by</h4>
<table><tr><td class="name"><a href="/name/nm1/">
 {}
</a></td></tr></table></body></html>"#,
        director
    )
}

struct ListingEntry<'a> {
    episode: u32,
    title_id: &'a str,
    title: &'a str,
    air_date: &'a str,
    rating: &'a str,
    synopsis: &'a str,
}

fn listing_page(entries: &[ListingEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|e| {
            format!(
                r#"<div class="list_item">
  <div class="info" itemprop="episodes">
    <meta itemprop="episodeNumber" content="{}"/>
    <div class="airdate">
          {}
    </div>
    <strong><a href="/title/{}/?ref_=ttep" itemprop="name">{}</a></strong>
    <span class="ipl-rating-star__rating">{}</span>
    <div class="item_description" itemprop="description">{}</div>
  </div>
</div>"#,
                e.episode, e.air_date, e.title_id, e.title, e.rating, e.synopsis
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="list detail eplist">{}</div></body></html>"#,
        items
    )
}

/// Every page of season 1, except the credits page of episode 3.
fn season_one_pages() -> StaticPages {
    StaticPages::new()
        .with_page(LISTING_URL, SEASON_1)
        .with_page("https://www.imdb.com/title/tt1480055/keywords", KEYWORDS_EP1)
        .with_page("https://www.imdb.com/title/tt1480055/fullcredits", CREDITS_EP1)
        .with_page(
            "https://www.imdb.com/title/tt1668746/keywords",
            keywords_page(&["bran stark", "the wall", "direwolf"]),
        )
        .with_page(
            "https://www.imdb.com/title/tt1668746/fullcredits",
            credits_page("Tim Van Patten"),
        )
        .with_page(
            "https://www.imdb.com/title/tt1829962/keywords",
            keywords_page(&["night's watch"]),
        )
}

fn one_season_config() -> Config {
    let mut config = Config::with_defaults();
    config.source.seasons = 1;
    config
}

#[derive(Default)]
struct Recorder {
    seasons: Vec<(u32, usize)>,
    episodes: Vec<u32>,
    skipped: Vec<MissingPage>,
    finished: bool,
}

impl ScrapeProgress for Recorder {
    fn season_started(&mut self, season: u32, episodes: usize) {
        self.seasons.push((season, episodes));
    }

    fn episode_done(&mut self, global_index: u32, _title: &str) {
        self.episodes.push(global_index);
    }

    fn page_skipped(&mut self, missing: &MissingPage) {
        self.skipped.push(missing.clone());
    }

    fn finished(&mut self) {
        self.finished = true;
    }
}

#[tokio::test]
async fn fail_fast_stops_at_first_missing_page() {
    let err = scrape(
        &season_one_pages(),
        &one_season_config(),
        FailurePolicy::FailFast,
        &mut (),
    )
    .await
    .unwrap_err();

    assert_eq!(err.stage(), Stage::Fetch);
    assert!(matches!(
        err,
        PipelineError::Fetch {
            season: 1,
            global_index: Some(3),
            page: PageKind::Credits,
            ..
        }
    ));
    assert!(err.to_string().contains("episode #3"));
}

#[tokio::test]
async fn skip_and_continue_builds_the_table() {
    let mut progress = Recorder::default();
    let outcome = scrape(
        &season_one_pages(),
        &one_season_config(),
        FailurePolicy::SkipAndContinue,
        &mut progress,
    )
    .await
    .unwrap();

    let records = &outcome.records;
    assert_eq!(records.len(), 3);
    let indices: Vec<u32> = records.iter().map(|r| r.global_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);

    let first = &records[0];
    assert_eq!(first.title, "Winter Is Coming");
    assert_eq!(first.rating, Some(8.9));
    assert_eq!(
        first.air_date,
        chrono::NaiveDate::from_ymd_opt(2011, 4, 17)
    );
    assert_eq!(first.link, "https://www.imdb.com/title/tt1480055/");
    assert_eq!(
        first.keywords.as_deref(),
        Some(
            &[
                "direwolf".to_string(),
                "incest".to_string(),
                "the wall".to_string(),
                "direwolf pup".to_string()
            ][..]
        )
    );
    assert_eq!(first.director.as_deref(), Some("Tim Van Patten"));
    assert_eq!(first.outside_director, Some(true));
    assert_eq!(first.presence.get("daenerys"), Some(true));

    // Episode 3: malformed date and rating, missing credits page
    let third = &records[2];
    assert_eq!(third.title, "Lord Snow");
    assert_eq!(third.episode_in_season, 3);
    assert_eq!(third.air_date, None);
    assert_eq!(third.rating, None);
    assert!(!third.synopsis.is_empty());
    assert_eq!(third.director_credit_text, None);
    assert_eq!(third.outside_director, None);
    assert_eq!(third.keywords.as_deref().map(<[String]>::len), Some(1));

    assert_eq!(
        outcome.missing,
        vec![MissingPage {
            season: 1,
            global_index: Some(3),
            page: PageKind::Credits,
            error: outcome.missing[0].error.clone(),
        }]
    );
    assert_eq!(progress.seasons, vec![(1, 3)]);
    assert_eq!(progress.episodes, vec![1, 2, 3]);
    assert_eq!(progress.skipped.len(), 1);
    assert!(progress.finished);
}

#[tokio::test]
async fn presence_reproduces_substring_false_positives() {
    let outcome = scrape(
        &season_one_pages(),
        &one_season_config(),
        FailurePolicy::SkipAndContinue,
        &mut (),
    )
    .await
    .unwrap();

    // "Samwise-like" contains "Sam"
    let third = &outcome.records[2];
    assert_eq!(third.presence.get("sam"), Some(true));
    assert_eq!(third.presence.get("jon"), Some(true));
    assert_eq!(third.presence.get("arya"), Some(true));

    for record in &outcome.records {
        assert_eq!(record.character_score, record.presence.count_present());
    }
    assert_eq!(outcome.records[1].character_score, 3);
}

#[tokio::test]
async fn departed_flag_follows_configured_cutoff() {
    let mut config = one_season_config();
    config.analysis.cutoff = 1;

    let outcome = scrape(
        &season_one_pages(),
        &config,
        FailurePolicy::SkipAndContinue,
        &mut (),
    )
    .await
    .unwrap();

    let flags: Vec<bool> = outcome
        .records
        .iter()
        .map(|r| r.departed_from_source)
        .collect();
    assert_eq!(flags, vec![false, true, true]);
}

#[tokio::test]
async fn missing_middle_season_keeps_indices_contiguous() {
    let season_three = listing_page(&[
        ListingEntry {
            episode: 1,
            title_id: "tt2069318",
            title: "Valar Dohaeris",
            air_date: "31 Mar. 2013",
            rating: "8.5",
            synopsis: "Jon is brought before Mance Rayder.",
        },
        ListingEntry {
            episode: 2,
            title_id: "tt2070135",
            title: "Dark Wings, Dark Words",
            air_date: "7 Apr. 2013",
            rating: "8.4",
            synopsis: "Sansa says too much.",
        },
        ListingEntry {
            episode: 3,
            title_id: "tt2074658",
            title: "Walk of Punishment",
            air_date: "14 Apr. 2013",
            rating: "8.7",
            synopsis: "Tyrion shoulders new responsibilities.",
        },
    ]);
    let pages = season_one_pages().with_page(SEASON_3_URL, season_three);
    let mut config = one_season_config();
    config.source.seasons = 3;

    let outcome = scrape(&pages, &config, FailurePolicy::SkipAndContinue, &mut ())
        .await
        .unwrap();

    let positions: Vec<(u32, u32)> = outcome
        .records
        .iter()
        .map(|r| (r.season, r.global_index))
        .collect();
    assert_eq!(
        positions,
        vec![(1, 1), (1, 2), (1, 3), (3, 4), (3, 5), (3, 6)]
    );
    assert_eq!(outcome.records[3].episode_in_season, 1);
    assert!(outcome
        .missing
        .iter()
        .any(|m| m.season == 2 && m.page == PageKind::Listing));
    assert!(!outcome
        .missing
        .iter()
        .any(|m| m.season == 3 && m.page == PageKind::Listing));
}

#[tokio::test]
async fn malformed_air_date_leaves_other_fields_intact() {
    let listing = listing_page(&[ListingEntry {
        episode: 1,
        title_id: "tt1480055",
        title: "Winter Is Coming",
        air_date: "not-a-date",
        rating: "8.1",
        synopsis: "Daenerys is wed to Khal Drogo.",
    }]);
    let pages = StaticPages::new()
        .with_page(LISTING_URL, listing)
        .with_page("https://www.imdb.com/title/tt1480055/keywords", KEYWORDS_EP1)
        .with_page("https://www.imdb.com/title/tt1480055/fullcredits", CREDITS_EP1);

    let outcome = scrape(
        &pages,
        &one_season_config(),
        FailurePolicy::FailFast,
        &mut (),
    )
    .await
    .unwrap();

    assert!(outcome.missing.is_empty());
    let record = &outcome.records[0];
    assert_eq!(record.air_date, None);
    assert_eq!(record.rating, Some(8.1));
    assert_eq!(record.title, "Winter Is Coming");
    assert_eq!(record.episode_in_season, 1);
    assert_eq!(record.link, "https://www.imdb.com/title/tt1480055/");
    assert_eq!(record.synopsis, "Daenerys is wed to Khal Drogo.");
    assert_eq!(record.keywords.as_deref().map(<[String]>::len), Some(4));
    assert!(record.director_credit_text.is_some());
    assert_eq!(record.director.as_deref(), Some("Tim Van Patten"));
    assert_eq!(record.presence.get("daenerys"), Some(true));
}

#[tokio::test]
async fn scraped_table_survives_csv_and_feeds_analysis() {
    let outcome = scrape(
        &season_one_pages(),
        &one_season_config(),
        FailurePolicy::SkipAndContinue,
        &mut (),
    )
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("episodes.csv");
    save_table(&path, &outcome.records).unwrap();
    let loaded = load_table(&path).unwrap();
    assert_eq!(loaded, outcome.records);

    // Two rated episodes are too few for the models, which must fail softly
    let report = analyze(&loaded, &Config::with_defaults().analysis);
    assert_eq!(report.episodes, 3);
    assert_eq!(report.rated, 2);
    assert!(report
        .terms
        .top_keywords
        .iter()
        .any(|t| t.term == "direwolf" && t.count == 2));
    assert!(matches!(
        report.character_regression,
        ModelOutcome::Failed { .. }
    ));
}

#[tokio::test]
async fn loaded_table_follows_the_active_config() {
    let outcome = scrape(
        &season_one_pages(),
        &one_season_config(),
        FailurePolicy::SkipAndContinue,
        &mut (),
    )
    .await
    .unwrap();
    assert!(outcome.records.iter().all(|r| !r.departed_from_source));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("episodes.csv");
    save_table(&path, &outcome.records).unwrap();

    let mut config = one_season_config();
    config.analysis.cutoff = 1;
    config.analysis.showrunner = "Tim Van Patten".to_string();
    let mut loaded = load_table(&path).unwrap();
    Tabulator::from_config(&config).rederive(&mut loaded);

    let flags: Vec<bool> = loaded.iter().map(|r| r.departed_from_source).collect();
    assert_eq!(flags, vec![false, true, true]);
    assert_eq!(loaded[0].outside_director, Some(false));
    assert_eq!(loaded[2].outside_director, None);
    assert_eq!(loaded[0].title, outcome.records[0].title);
    assert_eq!(loaded[0].rating, outcome.records[0].rating);
}
