//! Dashboard screen rendering
//!
//! Renders the header with refresh status and active filters, the error
//! banner after a failed refresh, summary cards for each metric, and the
//! table of filtered records.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use super::format::{
    format_cac, format_count, format_currency, format_delta, format_money, format_percent,
};
use crate::app::{App, Banner, HOME_MARKET};
use crate::cache::{CacheState, Clock};
use crate::data::{DataLoader, Record};
use crate::filter::{date_bounds, summarize, year_over_year, Aggregation, Metric};

/// Color for the cache freshness indicator
fn cache_state_color(state: CacheState) -> Color {
    match state {
        CacheState::Fresh => Color::Green,
        CacheState::Stale => Color::Yellow,
        CacheState::Empty => Color::Gray,
    }
}

/// Formats a metric value the way its card shows it
fn format_metric(metric: Metric, value: Option<f64>) -> String {
    match metric {
        Metric::Revenue | Metric::AdSpend => format_currency(value),
        Metric::NewCustomers => format_count(value),
        Metric::Cac => format_cac(value),
    }
}

/// Renders the full dashboard
pub fn render<L: DataLoader, C: Clock>(frame: &mut Frame, app: &App<L, C>) {
    let area = frame.area();

    let mut constraints = vec![Constraint::Length(4)];
    if app.banner.is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(4));
    constraints.push(Constraint::Min(3));
    constraints.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut index = 0;
    render_header(frame, app, chunks[index]);
    index += 1;

    if let Some(banner) = &app.banner {
        render_banner(frame, app, banner, chunks[index]);
        index += 1;
    }

    render_summary(frame, app, &app.visible_records(), chunks[index]);
    render_table(frame, app, &app.table_records(), chunks[index + 1]);
    render_footer(frame, app, chunks[index + 2]);
}

fn render_header<L: DataLoader, C: Clock>(frame: &mut Frame, app: &App<L, C>, area: Rect) {
    let state = app.cache_state();
    let refreshed = match app.last_refreshed() {
        Some(at) => format!("Refreshed {}", at.format("%H:%M:%S")),
        None => "Not refreshed yet".to_string(),
    };
    let rows = app.snapshot().map_or(0, |snapshot| snapshot.len());

    let status = Line::from(vec![
        Span::raw(refreshed),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", state.label()),
            Style::default().fg(cache_state_color(state)),
        ),
        Span::styled(format!("  {} rows", rows), Style::default().fg(Color::DarkGray)),
    ]);

    let span = match app.snapshot().and_then(date_bounds) {
        Some((first, last)) => format!(
            "Data {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        None => "No data".to_string(),
    };
    let mut filters = vec![
        Span::styled("Country: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.selected_country().unwrap_or("All").to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if app.hide_home_market {
        filters.push(Span::styled(
            format!(" ({} hidden)", HOME_MARKET),
            Style::default().fg(Color::Yellow),
        ));
    }
    filters.extend([
        Span::styled("  Window: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.window.label(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", span), Style::default().fg(Color::DarkGray)),
    ]);
    let filters = Line::from(filters);

    let block = Block::default()
        .title(" sheetdash ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(vec![status, filters]).block(block), area);
}

fn render_banner<L: DataLoader, C: Clock>(
    frame: &mut Frame,
    app: &App<L, C>,
    banner: &Banner,
    area: Rect,
) {
    let mut text = format!("{} (at {})", banner.message, banner.at.format("%H:%M:%S"));
    if let Some(at) = app.last_refreshed() {
        text.push_str(&format!(". Showing data from {}", at.format("%H:%M:%S")));
    }

    let block = Block::default()
        .title(format!(" {} ", banner.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .block(block);

    frame.render_widget(paragraph, area);
}

fn render_summary<L: DataLoader, C: Clock>(
    frame: &mut Frame,
    app: &App<L, C>,
    records: &[&Record],
    area: Rect,
) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let filter = app.filter();
    for (metric, card) in Metric::ALL.iter().zip(cards.iter()) {
        let value = summarize(records, *metric, Aggregation::Sum);
        let delta = app
            .snapshot()
            .and_then(|snapshot| year_over_year(snapshot, &filter, *metric));

        let highlighted = *metric == app.metric;
        let border = if highlighted { Color::Yellow } else { Color::DarkGray };

        let mut lines = vec![Line::from(Span::styled(
            format_metric(*metric, value),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if let Some(delta) = delta {
            let color = if delta >= 0.0 { Color::Green } else { Color::Red };
            lines.push(Line::from(Span::styled(
                format_delta(delta),
                Style::default().fg(color),
            )));
        }

        let block = Block::default()
            .title(format!(" {} ", metric.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));

        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center).block(block),
            *card,
        );
    }

    let share = Paragraph::new(Line::from(Span::styled(
        format_percent(app.international_share()),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title(" Intl Share ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(share, cards[4]);
}

fn render_table<L: DataLoader, C: Clock>(
    frame: &mut Frame,
    app: &App<L, C>,
    records: &[&Record],
    area: Rect,
) {
    let mut title = format!(" Rows ({}) ", records.len());
    if app.search_active {
        title.push_str(&format!(" /{}_ ", app.search));
    } else if !app.search.is_empty() {
        title.push_str(&format!(" /{} ", app.search));
    }
    let block = Block::default().title(title).borders(Borders::ALL);

    if records.is_empty() {
        let message = if app.snapshot().is_some() {
            "No rows match the current filters"
        } else {
            "No data loaded yet. Press r to retry"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let highlight = Style::default().fg(Color::Yellow);
    let metric_style = |metric: Metric| {
        if metric == app.metric {
            highlight
        } else {
            Style::default()
        }
    };

    let header = Row::new(vec![
        Cell::from("Date"),
        Cell::from("Country"),
        Cell::from("Revenue").style(metric_style(Metric::Revenue)),
        Cell::from("New Cust.").style(metric_style(Metric::NewCustomers)),
        Cell::from("Ad Spend").style(metric_style(Metric::AdSpend)),
        Cell::from("CAC").style(metric_style(Metric::Cac)),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = records.iter().skip(app.scroll_offset).map(|record| {
        Row::new(vec![
            Cell::from(record.date.format("%Y-%m-%d").to_string()),
            Cell::from(record.country.clone()),
            Cell::from(format_money(record.revenue)).style(metric_style(Metric::Revenue)),
            Cell::from(format_count(Some(f64::from(record.new_customers))))
                .style(metric_style(Metric::NewCustomers)),
            Cell::from(format_money(record.ad_spend)).style(metric_style(Metric::AdSpend)),
            Cell::from(format_cac(record.cac)).style(metric_style(Metric::Cac)),
        ])
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_footer<L: DataLoader, C: Clock>(frame: &mut Frame, app: &App<L, C>, area: Rect) {
    if let Some(notice) = &app.notice {
        let paragraph = Paragraph::new(notice.as_str()).style(Style::default().fg(Color::Cyan));
        frame.render_widget(paragraph, area);
        return;
    }

    let hint = |key: &'static str, label: &'static str| {
        vec![
            Span::styled(key, Style::default().fg(Color::Yellow)),
            Span::styled(format!(" {}  ", label), Style::default().fg(Color::DarkGray)),
        ]
    };

    let spans: Vec<Span> = [
        ("r", "refresh"),
        ("c", "country"),
        ("w", "window"),
        ("m", "metric"),
        ("u", "hide US"),
        ("/", "search"),
        ("e", "export"),
        ("j/k", "scroll"),
        ("?", "help"),
        ("q", "quit"),
    ]
    .into_iter()
    .flat_map(|(key, label)| hint(key, label))
    .collect();

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, RefreshController, DEFAULT_TTL};
    use crate::data::{LoadError, Snapshot};
    use crate::test_support::{market_snapshot, unavailable, ScriptedLoader};
    use chrono::Utc;
    use ratatui::{backend::TestBackend, Terminal};

    async fn synced_app(responses: Vec<Result<Snapshot, LoadError>>) -> App<ScriptedLoader, ManualClock> {
        let controller = RefreshController::with_clock(
            ScriptedLoader::new(responses),
            ManualClock::new(Utc::now()),
            DEFAULT_TTL,
        );
        let mut app = App::new(controller);
        app.sync().await;
        app
    }

    fn rendered<L: DataLoader, C: Clock>(app: &App<L, C>) -> String {
        let backend = TestBackend::new(110, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_dashboard_renders_rows_and_cards() {
        let app = synced_app(vec![Ok(market_snapshot())]).await;
        let content = rendered(&app);

        assert!(content.contains("sheetdash"), "Should render title");
        assert!(content.contains("[fresh]"), "Should show cache state");
        assert!(content.contains("Data 2026-03-01 to 2026-03-20"), "Should show date span");
        assert!(content.contains("Revenue"), "Should show revenue card");
        assert!(content.contains("$2.9K"), "Should show summed revenue");
        assert!(content.contains("2026-03-20"), "Should show record dates");
        assert!(content.contains("$1,000"), "Should show table amounts");
        assert!(content.contains("Rows (4)"), "Should count visible rows");
        assert!(content.contains("Intl Share"), "Should show the share card");
        assert!(content.contains("24.1%"), "Should show revenue earned outside the US");
    }

    #[tokio::test]
    async fn test_dashboard_search_and_hidden_market() {
        let mut app = synced_app(vec![Ok(market_snapshot())]).await;
        app.hide_home_market = true;
        app.search = "uk".to_string();

        let content = rendered(&app);

        assert!(content.contains("(US hidden)"));
        assert!(content.contains("Rows (1)"));
        assert!(content.contains("/uk"));
        assert!(!content.contains("$1,000"), "US rows should be hidden");
    }

    #[tokio::test]
    async fn test_dashboard_footer_shows_notice() {
        let mut app = synced_app(vec![Ok(market_snapshot())]).await;
        app.notice = Some("Exported 4 rows to ./sheetdash_all.csv".to_string());

        let content = rendered(&app);

        assert!(content.contains("Exported 4 rows"));
        assert!(!content.contains("quit"), "Notice replaces the key hints");
    }

    #[tokio::test]
    async fn test_dashboard_renders_banner_without_data() {
        let app = synced_app(vec![Err(unavailable())]).await;
        let content = rendered(&app);

        assert!(content.contains("Source unavailable"), "Should show banner title");
        assert!(content.contains("connection refused"), "Should show error detail");
        assert!(content.contains("No data loaded yet"), "Should explain empty table");
    }

    #[tokio::test]
    async fn test_dashboard_keeps_rows_under_banner() {
        let mut app = synced_app(vec![
            Ok(market_snapshot()),
            Err(LoadError::ParseError {
                row: 2,
                reason: "non-numeric revenue 'x'".to_string(),
            }),
        ])
        .await;
        app.refresh_requested = true;
        app.sync().await;

        let content = rendered(&app);

        assert!(content.contains("Parse error"));
        assert!(content.contains("Showing data from"));
        assert!(content.contains("Rows (4)"));
    }

    #[test]
    fn test_format_metric_by_kind() {
        assert_eq!(format_metric(Metric::Revenue, Some(2_900.0)), "$2.9K");
        assert_eq!(format_metric(Metric::NewCustomers, Some(55.0)), "55");
        assert_eq!(format_metric(Metric::Cac, None), "n/a");
    }
}
