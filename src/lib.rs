//! episcope - episode metadata scraper and rating analysis.
//!
//! Scrapes season listings, keyword pages and credits pages for one series,
//! assembles a flat episode table, and runs term-frequency and statistical
//! analyses of what correlates with audience rating.

pub mod analysis;
pub mod charts;
pub mod cli;
pub mod config;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod scrapers;
pub mod storage;
pub mod tabulate;
