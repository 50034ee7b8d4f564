//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a list on the left, the selected record's details on the
//!   right, and a one-line status bar at the bottom.  While searching, a
//!   one-line search box sits above the status bar.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::source::{DisplayableRecord, MediaPayload};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let search_height = if app.search.is_some() { 1 } else { 0 };
    let [main_area, search_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(search_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
            .areas(main_area);

    draw_record_list(app, frame, list_area);
    draw_detail(app, frame, detail_area);
    if app.search.is_some() {
        draw_search_box(app, frame, search_area);
    }
    draw_status_bar(app, frame, status_area);
}

fn draw_record_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .visible()
        .into_iter()
        .map(|record| {
            let date_str = record
                .updated()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "no date".into());

            let mut spans = vec![
                Span::styled(format!("{date_str:<10}"), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(record.title.clone(), Style::default().fg(Color::White)),
            ];
            if let Some(badge) = &record.badge {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("[{badge}]"),
                    Style::default().fg(Color::Cyan),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(format!(" {} ", app.title))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn detail_lines(record: &DisplayableRecord) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        record.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    if let Some(description) = &record.description {
        lines.push(Line::raw(""));
        lines.push(Line::raw(description.clone()));
    }
    if let Some(url) = &record.action_url {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            url.clone(),
            Style::default().fg(Color::Blue),
        )));
    }
    if !record.media.is_empty() {
        lines.push(Line::raw(""));
        for media in &record.media {
            let what = match &media.payload {
                MediaPayload::Url(_) => media.resolvable_url(),
                MediaPayload::Inline { mime, .. } => format!("inline {mime}"),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", media.name), Style::default().fg(Color::DarkGray)),
                Span::raw(what),
            ]));
        }
    }
    lines
}

fn draw_detail(app: &App, frame: &mut Frame, area: Rect) {
    let lines = app.selected_record().map(detail_lines).unwrap_or_default();
    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(" Details ").borders(Borders::ALL));
    frame.render_widget(detail, area);
}

fn draw_search_box(app: &App, frame: &mut Frame, area: Rect) {
    let query = app.search.as_deref().unwrap_or_default();
    let cursor = if app.typing { "_" } else { "" };
    let search = Paragraph::new(Line::from(vec![
        Span::styled(" /", Style::default().fg(Color::Magenta)),
        Span::raw(format!("{query}{cursor}")),
    ]));
    frame.render_widget(search, area);
}

/// "Found X matching", "Loaded X of Y" or "X shown".
pub fn count_label(app: &App) -> String {
    if app.search.as_deref().is_some_and(|q| !q.is_empty()) {
        return format!("Found {} matching", app.visible().len());
    }
    match app.cursor.total {
        Some(total) => format!("Loaded {} of {total}", app.total()),
        None => format!("{} shown", app.total()),
    }
}

fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let help = if app.typing {
        "Enter: keep filter  Esc: clear"
    } else if app.state.is_running() {
        "q: quit  j/k: scroll  /: search  Enter: open  r: refresh  c: cancel"
    } else {
        "q: quit  j/k: scroll  /: search  Enter: open  r: refresh"
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(count_label(app), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::raw(help),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ChannelRenderer, RenderMode, Renderer, ViewMsg};
    use crate::scheduler::{BatchCursor, SchedulerState};
    use crate::source::MediaRef;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn record(id: &str, title: &str) -> DisplayableRecord {
        DisplayableRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: Some("by Someone".into()),
            action_url: Some(format!("http://x/{id}")),
            media: vec![
                MediaRef::url("audio", "http://proxy/audio?url=a"),
                MediaRef::inline("banner.png", "image/png", "iVBORw0KGgo="),
            ],
            updated_at: "2025-02-03T04:05:06Z".to_string(),
            badge: Some(format!("#{id}")),
        }
    }

    fn loaded_app() -> App {
        let (mut renderer, rx) = ChannelRenderer::new();
        renderer.render(vec![record("1", "Alpha"), record("2", "Beta")], RenderMode::Append);
        renderer.state_changed(
            &SchedulerState::Done { rendered: 2 },
            &BatchCursor {
                page: 1,
                more: false,
                total: Some(9),
            },
        );
        let mut app = App::new("Ads");
        while let Ok(msg) = rx.try_recv() {
            app.apply(msg);
        }
        app
    }

    fn screen(app: &mut App) -> String {
        let backend = TestBackend::new(120, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();
        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_with_no_records() {
        let mut app = App::new("Songs");
        let text = screen(&mut app);
        assert!(text.contains("0 shown"));
    }

    #[test]
    fn list_shows_date_title_and_badge() {
        let mut app = loaded_app();
        let text = screen(&mut app);
        assert!(text.contains("2025-02-03"));
        assert!(text.contains("Alpha"));
        assert!(text.contains("[#1]"));
    }

    #[test]
    fn detail_pane_shows_selected_record() {
        let mut app = loaded_app();
        let text = screen(&mut app);
        assert!(text.contains("by Someone"));
        assert!(text.contains("http://x/1"));
        assert!(text.contains("inline image/png"));
    }

    #[test]
    fn status_bar_shows_progress_against_total() {
        let mut app = loaded_app();
        let text = screen(&mut app);
        assert!(text.contains("Done: 2 shown"));
        assert!(text.contains("Loaded 2 of 9"));
    }

    #[test]
    fn status_bar_counts_matches_while_searching() {
        let mut app = loaded_app();
        app.begin_search();
        app.push_search_char('b');
        assert_eq!(count_label(&app), "Found 1 matching");
        let text = screen(&mut app);
        assert!(text.contains("/b_"));
    }

    #[test]
    fn error_state_offers_retry() {
        let mut app = App::new("Songs");
        app.apply(ViewMsg::State {
            state: SchedulerState::Error(crate::error::ViewError::FirstPage(
                crate::error::SourceError::Status {
                    page: 1,
                    status: 500,
                },
            )),
            cursor: BatchCursor::default(),
        });
        let text = screen(&mut app);
        assert!(text.contains("r to retry"));
    }
}
