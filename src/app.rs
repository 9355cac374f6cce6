//! Application state management for sheetdash
//!
//! This module contains the dashboard state, handling keyboard input, filter
//! selections, and syncing with the refresh controller on every render.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent};

use crate::cache::{CacheState, Clock, RefreshController, SystemClock};
use crate::data::{DataLoader, LoadError, Record, Snapshot};
use crate::export;
use crate::filter::{self, Metric, RecordFilter};

/// Seconds to wait after a failed automatic refresh before trying again
const RETRY_COOLDOWN_SECS: i64 = 30;

/// Market that dominates the totals and can be hidden with `u`
pub const HOME_MARKET: &str = "US";

/// Application state enum representing the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Before the first refresh attempt has finished
    Loading,
    /// Summary figures and data table
    Dashboard,
}

/// Date range shown on the dashboard, anchored on the latest day with data
///
/// The sheet is filled in a day behind, so the latest day is normally
/// yesterday and month/year to date end there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    LatestDay,
    MonthToDate,
    Week,
    Month,
    Quarter,
    YearToDate,
    All,
}

impl DateWindow {
    pub fn label(&self) -> &'static str {
        match self {
            DateWindow::LatestDay => "Latest day",
            DateWindow::MonthToDate => "Month to date",
            DateWindow::Week => "Last 7 days",
            DateWindow::Month => "Last 30 days",
            DateWindow::Quarter => "Last 90 days",
            DateWindow::YearToDate => "Year to date",
            DateWindow::All => "All dates",
        }
    }

    pub fn next(&self) -> DateWindow {
        match self {
            DateWindow::LatestDay => DateWindow::MonthToDate,
            DateWindow::MonthToDate => DateWindow::Week,
            DateWindow::Week => DateWindow::Month,
            DateWindow::Month => DateWindow::Quarter,
            DateWindow::Quarter => DateWindow::YearToDate,
            DateWindow::YearToDate => DateWindow::All,
            DateWindow::All => DateWindow::LatestDay,
        }
    }

    /// Inclusive range ending on `last`, or `None` for all dates
    pub fn range(&self, last: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = match self {
            DateWindow::LatestDay => last,
            DateWindow::MonthToDate => last.with_day(1)?,
            DateWindow::Week => last - Duration::days(6),
            DateWindow::Month => last - Duration::days(29),
            DateWindow::Quarter => last - Duration::days(89),
            DateWindow::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1)?,
            DateWindow::All => return None,
        };
        Some((start, last))
    }
}

/// Error shown above the dashboard after a failed refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Which kind of failure occurred
    pub title: &'static str,
    /// Error detail
    pub message: String,
    /// When the failure happened
    pub at: DateTime<Local>,
}

impl Banner {
    fn from_error(err: &LoadError) -> Self {
        let message = match err {
            LoadError::SourceUnavailable(detail) => detail.clone(),
            LoadError::ParseError { row, reason } => format!("row {}: {}", row, reason),
        };
        Self {
            title: err.kind(),
            message,
            at: Local::now(),
        }
    }
}

/// Main application struct managing state and data
pub struct App<L, C = SystemClock> {
    /// Current application state/view
    pub state: AppState,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating a forced refresh has been requested
    pub refresh_requested: bool,
    /// Error from the most recent failed refresh
    pub banner: Option<Banner>,
    /// Selected date window
    pub window: DateWindow,
    /// Highlighted summary metric
    pub metric: Metric,
    /// First visible row of the data table
    pub scroll_offset: usize,
    /// Hides the home market from the table, cards and country cycle
    pub hide_home_market: bool,
    /// Case-insensitive text the table rows must contain
    pub search: String,
    /// Keys are being typed into the search box
    pub search_active: bool,
    /// One-line status message, cleared by the next key
    pub notice: Option<String>,
    /// Directory CSV exports are written to
    pub export_dir: PathBuf,
    /// Last snapshot successfully received from the controller
    snapshot: Option<Arc<Snapshot>>,
    /// Countries present in the snapshot, sorted
    countries: Vec<String>,
    /// Index into `countries`; `None` shows every country
    country_index: Option<usize>,
    /// Automatic refreshes are skipped until this time after a failure
    retry_after: Option<DateTime<Utc>>,
    controller: RefreshController<L, C>,
}

impl<L: DataLoader, C: Clock> App<L, C> {
    /// Creates a new App around a refresh controller
    pub fn new(controller: RefreshController<L, C>) -> Self {
        Self {
            state: AppState::Loading,
            should_quit: false,
            show_help: false,
            refresh_requested: false,
            banner: None,
            window: DateWindow::Month,
            metric: Metric::Revenue,
            scroll_offset: 0,
            hide_home_market: false,
            search: String::new(),
            search_active: false,
            notice: None,
            export_dir: PathBuf::from("."),
            snapshot: None,
            countries: Vec::new(),
            country_index: None,
            retry_after: None,
            controller,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_deref()
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// The selected country, or `None` when all are shown
    pub fn selected_country(&self) -> Option<&str> {
        self.country_index
            .and_then(|index| self.countries.get(index))
            .map(String::as_str)
    }

    pub fn cache_state(&self) -> CacheState {
        self.controller.state()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.controller
            .last_refreshed()
            .map(|at| at.with_timezone(&Local))
    }

    /// Latest date in the current snapshot
    pub fn data_through(&self) -> Option<NaiveDate> {
        self.snapshot().and_then(filter::last_updated)
    }

    /// Dates covered by the selected window
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.data_through().and_then(|last| self.window.range(last))
    }

    /// Filter built from the current country and window selections
    pub fn filter(&self) -> RecordFilter {
        let mut filter = RecordFilter::default();
        if let Some(country) = self.selected_country() {
            filter.countries.insert(country.to_string());
        }
        if self.hide_home_market {
            filter.excluded.insert(HOME_MARKET.to_string());
        }
        if let Some((start, end)) = self.date_range() {
            filter.start = Some(start);
            filter.end = Some(end);
        }
        filter
    }

    /// Records matching the current filters, in snapshot order
    pub fn visible_records(&self) -> Vec<&Record> {
        match self.snapshot() {
            Some(snapshot) => self.filter().apply(snapshot),
            None => Vec::new(),
        }
    }

    /// Visible records that also match the search text
    pub fn table_records(&self) -> Vec<&Record> {
        let needle = self.search.trim().to_lowercase();
        let mut records = self.visible_records();
        if !needle.is_empty() {
            records.retain(|record| matches_search(record, &needle));
        }
        records
    }

    /// Share of revenue earned outside the home market in the selected window
    ///
    /// Covers every country regardless of the country selection.
    pub fn international_share(&self) -> Option<f64> {
        let snapshot = self.snapshot()?;
        let (start, end) = match self.date_range() {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };
        let window = RecordFilter {
            start,
            end,
            ..Default::default()
        };
        filter::international_share(&window.apply(snapshot), HOME_MARKET)
    }

    /// Writes the table rows to a CSV file in `export_dir`
    pub fn export_csv(&mut self) {
        let records = self.table_records();
        let message = match export::write_to_dir(&self.export_dir, self.date_range(), &records) {
            Ok(path) => {
                tracing::info!(rows = records.len(), path = %path.display(), "exported rows");
                format!("Exported {} rows to {}", records.len(), path.display())
            }
            Err(err) => {
                tracing::warn!(error = %err, "export failed");
                format!("Export failed: {}", err)
            }
        };
        self.notice = Some(message);
    }

    /// Brings the displayed snapshot up to date
    ///
    /// Called on every render. A pending refresh request forces a fetch;
    /// otherwise the controller decides whether its cache is still fresh.
    /// After a failed refresh, automatic attempts pause for a cooldown while
    /// the last good snapshot stays on screen.
    pub async fn sync(&mut self) {
        let force = std::mem::take(&mut self.refresh_requested);
        if !force {
            if let Some(retry_after) = self.retry_after {
                if self.controller.clock().now() < retry_after {
                    return;
                }
            }
        }

        match self.controller.get(force).await {
            Ok(snapshot) => {
                let is_new = self
                    .snapshot
                    .as_ref()
                    .map_or(true, |current| !Arc::ptr_eq(current, &snapshot));
                if is_new {
                    self.adopt(snapshot);
                    self.banner = None;
                }
                self.retry_after = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, force, "refresh failed");
                self.banner = Some(Banner::from_error(&err));
                self.retry_after =
                    Some(self.controller.clock().now() + Duration::seconds(RETRY_COOLDOWN_SECS));
            }
        }

        self.state = AppState::Dashboard;
    }

    /// Switches to a new snapshot, keeping the selected country if it still exists
    fn adopt(&mut self, snapshot: Arc<Snapshot>) {
        let selected = self.selected_country().map(str::to_string);
        self.countries = filter::countries(&snapshot);
        self.country_index =
            selected.and_then(|country| self.countries.iter().position(|c| *c == country));
        self.snapshot = Some(snapshot);
        self.clamp_scroll();
    }

    /// Handles keyboard input and updates state accordingly
    ///
    /// # Arguments
    /// * `key_event` - The keyboard event to handle
    ///
    /// # Key Bindings
    /// - `q` or `Esc`: Quit the application
    /// - `r`: Force a refresh from the sheet
    /// - `c`: Cycle the country filter
    /// - `w`: Cycle the date window
    /// - `m`: Cycle the highlighted metric
    /// - `u`: Hide or show the home market
    /// - `/`: Search the table (Enter keeps, Esc clears)
    /// - `e`: Export the table rows to CSV
    /// - `Up`/`k`, `Down`/`j`: Scroll the table
    /// - `g`/`G`: Jump to the top/bottom of the table
    /// - `?`: Toggle help
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        self.notice = None;

        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        // Search box - typed keys go into the search text
        if self.search_active {
            match key_event.code {
                KeyCode::Enter => {
                    self.search_active = false;
                }
                KeyCode::Esc => {
                    self.search.clear();
                    self.search_active = false;
                }
                KeyCode::Backspace => {
                    self.search.pop();
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                }
                _ => {}
            }
            self.clamp_scroll();
            return;
        }

        match self.state {
            AppState::Loading => {
                // Only quit is allowed during loading
                if key_event.code == KeyCode::Char('q') {
                    self.should_quit = true;
                }
            }
            AppState::Dashboard => match key_event.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                }
                KeyCode::Char('r') => {
                    self.refresh_requested = true;
                }
                KeyCode::Char('c') => {
                    self.cycle_country();
                }
                KeyCode::Char('w') => {
                    self.window = self.window.next();
                    self.scroll_offset = 0;
                }
                KeyCode::Char('m') => {
                    self.metric = self.metric.next();
                }
                KeyCode::Char('u') => {
                    self.toggle_home_market();
                }
                KeyCode::Char('/') => {
                    self.search_active = true;
                }
                KeyCode::Char('e') => {
                    self.export_csv();
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.scroll_down();
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.scroll_up();
                }
                KeyCode::Char('g') => {
                    self.scroll_offset = 0;
                }
                KeyCode::Char('G') => {
                    self.scroll_offset = self.max_scroll();
                }
                KeyCode::Char('?') => {
                    self.show_help = true;
                }
                _ => {}
            },
        }
    }

    fn is_hidden(&self, country: &str) -> bool {
        self.hide_home_market && country == HOME_MARKET
    }

    /// Moves the country filter to the next shown country, then back to all
    fn cycle_country(&mut self) {
        let from = self.country_index.map_or(0, |index| index + 1);
        self.country_index = (from..self.countries.len()).find(|&i| !self.is_hidden(&self.countries[i]));
        self.scroll_offset = 0;
    }

    fn toggle_home_market(&mut self) {
        self.hide_home_market = !self.hide_home_market;
        if self.selected_country().is_some_and(|country| self.is_hidden(country)) {
            self.country_index = None;
        }
        self.scroll_offset = 0;
    }

    fn max_scroll(&self) -> usize {
        self.table_records().len().saturating_sub(1)
    }

    fn scroll_down(&mut self) {
        if self.scroll_offset < self.max_scroll() {
            self.scroll_offset += 1;
        }
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }
}

/// Whether the country or ISO date of a record contains `needle` (lowercase)
fn matches_search(record: &Record, needle: &str) -> bool {
    record.country.to_lowercase().contains(needle)
        || record.date.format("%Y-%m-%d").to_string().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, DEFAULT_TTL};
    use crate::test_support::{day, market_snapshot, snapshot, unavailable, ScriptedLoader};
    use crossterm::event::KeyModifiers;

    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(responses: Vec<Result<Snapshot, LoadError>>) -> (App<ScriptedLoader, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let controller =
            RefreshController::with_clock(ScriptedLoader::new(responses), clock.clone(), DEFAULT_TTL);
        (App::new(controller), clock)
    }

    fn calls(app: &App<ScriptedLoader, ManualClock>) -> usize {
        app.controller.loader().calls()
    }

    #[test]
    fn test_new_app_starts_loading() {
        let (app, _clock) = app(vec![]);
        assert_eq!(app.state, AppState::Loading);
        assert!(app.snapshot().is_none());
        assert!(app.visible_records().is_empty());
        assert_eq!(app.cache_state(), CacheState::Empty);
    }

    #[tokio::test]
    async fn test_sync_loads_snapshot() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);

        app.sync().await;

        assert_eq!(app.state, AppState::Dashboard);
        assert!(app.banner.is_none());
        assert_eq!(app.countries(), ["AU", "UK", "US"]);
        assert_eq!(app.data_through(), Some(day(20)));
        assert!(app.last_refreshed().is_some());
    }

    #[tokio::test]
    async fn test_repeated_sync_uses_cache() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot()), Ok(snapshot(1.0))]);

        app.sync().await;
        app.sync().await;
        app.sync().await;

        assert_eq!(calls(&app), 1);
    }

    #[tokio::test]
    async fn test_sync_after_ttl_refetches() {
        let (mut app, clock) = app(vec![Ok(market_snapshot()), Ok(snapshot(1.0))]);

        app.sync().await;
        clock.advance(Duration::hours(1));
        app.sync().await;

        assert_eq!(calls(&app), 2);
        assert_eq!(app.countries(), ["US"]);
    }

    #[tokio::test]
    async fn test_r_key_forces_refresh() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot()), Ok(snapshot(7.0))]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('r')));
        assert!(app.refresh_requested);
        app.sync().await;

        assert!(!app.refresh_requested);
        assert_eq!(calls(&app), 2);
        assert_eq!(app.visible_records()[0].revenue, 7.0);
    }

    #[tokio::test]
    async fn test_failed_first_load_shows_banner_without_data() {
        let (mut app, _clock) = app(vec![Err(unavailable())]);

        app.sync().await;

        assert_eq!(app.state, AppState::Dashboard);
        assert!(app.snapshot().is_none());
        let banner = app.banner.as_ref().expect("banner should be set");
        assert_eq!(banner.title, "Source unavailable");
        assert!(banner.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (mut app, _clock) = app(vec![
            Ok(market_snapshot()),
            Err(LoadError::ParseError {
                row: 3,
                reason: "non-numeric revenue 'abc'".to_string(),
            }),
        ]);
        app.sync().await;

        app.refresh_requested = true;
        app.sync().await;

        assert_eq!(app.visible_records().len(), 4);
        let banner = app.banner.as_ref().expect("banner should be set");
        assert_eq!(banner.title, "Parse error");
        assert!(banner.message.contains("row 3"));

        // Automatic refresh is paused after a failure, so the banner stays
        app.sync().await;
        assert!(app.banner.is_some());
        assert_eq!(calls(&app), 2);
    }

    #[tokio::test]
    async fn test_failure_cooldown_pauses_automatic_refresh() {
        let (mut app, clock) = app(vec![Err(unavailable()), Ok(market_snapshot())]);

        app.sync().await;
        app.sync().await;
        assert_eq!(calls(&app), 1);

        clock.advance(Duration::seconds(RETRY_COOLDOWN_SECS));
        app.sync().await;

        assert_eq!(calls(&app), 2);
        assert!(app.banner.is_none());
        assert!(app.snapshot().is_some());
    }

    #[tokio::test]
    async fn test_forced_refresh_ignores_cooldown() {
        let (mut app, _clock) = app(vec![Err(unavailable()), Ok(market_snapshot())]);

        app.sync().await;
        app.refresh_requested = true;
        app.sync().await;

        assert_eq!(calls(&app), 2);
        assert!(app.banner.is_none());
    }

    #[tokio::test]
    async fn test_country_cycle() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;
        app.window = DateWindow::All;

        assert_eq!(app.selected_country(), None);
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), Some("AU"));
        app.handle_key(key_event(KeyCode::Char('c')));
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), Some("US"));
        assert_eq!(app.visible_records().len(), 2);
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), None);
    }

    #[tokio::test]
    async fn test_selected_country_survives_refresh() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot()), Ok(snapshot(5.0))]);
        app.sync().await;
        app.handle_key(key_event(KeyCode::Char('c')));
        app.handle_key(key_event(KeyCode::Char('c')));
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), Some("US"));

        app.refresh_requested = true;
        app.sync().await;

        assert_eq!(app.selected_country(), Some("US"));
    }

    #[tokio::test]
    async fn test_country_cycle_without_data_stays_all() {
        let (mut app, _clock) = app(vec![Err(unavailable())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('c')));

        assert_eq!(app.selected_country(), None);
    }

    #[tokio::test]
    async fn test_date_window_counts_back_from_latest_data() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        assert_eq!(app.window, DateWindow::Month);
        assert_eq!(app.visible_records().len(), 4);

        app.window = DateWindow::Week;
        let visible = app.visible_records();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].country, "AU");
    }

    #[test]
    fn test_date_window_range() {
        assert_eq!(DateWindow::Week.range(day(20)), Some((day(14), day(20))));
        assert_eq!(DateWindow::All.range(day(20)), None);
        assert_eq!(DateWindow::All.next(), DateWindow::LatestDay);
    }

    #[test]
    fn test_date_window_to_date_ranges() {
        let last = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let jan_first = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        assert_eq!(DateWindow::LatestDay.range(last), Some((last, last)));
        assert_eq!(DateWindow::MonthToDate.range(last), Some((day(1), last)));
        assert_eq!(DateWindow::YearToDate.range(last), Some((jan_first, last)));
        assert_eq!(DateWindow::Month.range(last), Some((day(20) - Duration::days(29), last)));
    }

    #[tokio::test]
    async fn test_latest_day_and_month_to_date_windows() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.window = DateWindow::LatestDay;
        assert_eq!(app.visible_records().len(), 1);

        app.window = DateWindow::MonthToDate;
        assert_eq!(app.visible_records().len(), 4);
    }

    #[tokio::test]
    async fn test_hide_home_market() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('u')));

        assert!(app.hide_home_market);
        let visible = app.visible_records();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|record| record.country != HOME_MARKET));

        // The hidden market is skipped while cycling countries
        app.handle_key(key_event(KeyCode::Char('c')));
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), Some("UK"));
        app.handle_key(key_event(KeyCode::Char('c')));
        assert_eq!(app.selected_country(), None);
    }

    #[tokio::test]
    async fn test_hiding_home_market_clears_its_selection() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;
        for _ in 0..3 {
            app.handle_key(key_event(KeyCode::Char('c')));
        }
        assert_eq!(app.selected_country(), Some("US"));

        app.handle_key(key_event(KeyCode::Char('u')));

        assert_eq!(app.selected_country(), None);
        assert_eq!(app.visible_records().len(), 2);
    }

    #[tokio::test]
    async fn test_international_share_ignores_country_selection() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;
        let share = app.international_share().unwrap();

        app.handle_key(key_event(KeyCode::Char('c')));
        app.handle_key(key_event(KeyCode::Char('u')));

        assert!((share - 700.0 / 2900.0 * 100.0).abs() < 1e-9);
        assert_eq!(app.international_share(), Some(share));
    }

    #[tokio::test]
    async fn test_search_filters_table_only() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('/')));
        assert!(app.search_active);
        for c in "uk".chars() {
            app.handle_key(key_event(KeyCode::Char(c)));
        }
        app.handle_key(key_event(KeyCode::Enter));

        assert!(!app.search_active);
        assert_eq!(app.search, "uk");
        assert_eq!(app.table_records().len(), 1);
        assert_eq!(app.visible_records().len(), 4);
    }

    #[tokio::test]
    async fn test_search_matches_dates_and_swallows_keys() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('/')));
        for c in "03-0q".chars() {
            app.handle_key(key_event(KeyCode::Char(c)));
        }
        assert!(!app.should_quit);
        app.handle_key(key_event(KeyCode::Backspace));

        assert_eq!(app.search, "03-0");
        assert_eq!(app.table_records().len(), 3);

        app.handle_key(key_event(KeyCode::Esc));
        assert!(app.search.is_empty());
        assert!(!app.search_active);
        assert!(!app.should_quit);
        assert_eq!(app.table_records().len(), 4);
    }

    #[tokio::test]
    async fn test_export_writes_table_rows() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        app.export_dir = dir.path().to_path_buf();
        app.search = "us".to_string();

        app.handle_key(key_event(KeyCode::Char('e')));

        let path = dir.path().join("sheetdash_2026-02-19_2026-03-20.csv");
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(app.notice.as_deref().unwrap().contains("Exported 2 rows"));

        app.handle_key(key_event(KeyCode::Char('k')));
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_export_failure_sets_notice() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;
        app.export_dir = PathBuf::from("/nonexistent/sheetdash/exports");

        app.export_csv();

        assert!(app.notice.as_deref().unwrap().starts_with("Export failed"));
    }

    #[tokio::test]
    async fn test_w_and_m_keys_cycle_selections() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('w')));
        assert_eq!(app.window, DateWindow::Quarter);

        app.handle_key(key_event(KeyCode::Char('m')));
        assert_eq!(app.metric, Metric::NewCustomers);
    }

    #[tokio::test]
    async fn test_scroll_is_bounded() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('k')));
        assert_eq!(app.scroll_offset, 0);

        for _ in 0..10 {
            app.handle_key(key_event(KeyCode::Char('j')));
        }
        assert_eq!(app.scroll_offset, 3);

        app.handle_key(key_event(KeyCode::Char('g')));
        assert_eq!(app.scroll_offset, 0);
        app.handle_key(key_event(KeyCode::Char('G')));
        assert_eq!(app.scroll_offset, 3);
    }

    #[test]
    fn test_quit_during_loading() {
        let (mut app, _clock) = app(vec![]);

        app.handle_key(key_event(KeyCode::Char('r')));
        assert!(!app.refresh_requested);

        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_help_overlay_intercepts_keys() {
        let (mut app, _clock) = app(vec![Ok(market_snapshot())]);
        app.sync().await;

        app.handle_key(key_event(KeyCode::Char('?')));
        assert!(app.show_help);

        app.handle_key(key_event(KeyCode::Char('r')));
        assert!(!app.refresh_requested);
        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(!app.should_quit);
        assert!(!app.show_help);

        app.handle_key(key_event(KeyCode::Esc));
        assert!(app.should_quit);
    }
}
