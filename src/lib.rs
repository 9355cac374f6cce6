//! sheetdash library
//!
//! Loads daily business metrics from a published spreadsheet, keeps the last
//! good snapshot behind a TTL cache, and renders it as a terminal dashboard.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod export;
pub mod filter;
pub mod logging;
pub mod ui;

#[cfg(test)]
mod test_support;
