use ratatui::widgets::ListState;
use tracing::info;

use crate::render::{EventCallback, RenderEvent, RenderHandle, RenderMode, ViewMsg};
use crate::scheduler::{BatchCursor, SchedulerState};
use crate::source::DisplayableRecord;

/// Something the user asked the scheduler to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Cancel,
}

pub struct App {
    /// List heading, usually the source name.
    pub title: String,
    /// Rendered records, in the order they were rendered.
    records: Vec<(RenderHandle, DisplayableRecord)>,
    /// Selection within the *visible* (filtered) records.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last scheduler state, or the last thing the user did.
    pub status: String,
    pub state: SchedulerState,
    pub cursor: BatchCursor,
    /// Active title filter.  `None` when not searching.
    pub search: Option<String>,
    /// Keystrokes currently go to the search box.
    pub typing: bool,
    subscribers: Vec<EventCallback>,
    pending: Option<Action>,
}

impl App {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            records: Vec::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            state: SchedulerState::Idle,
            cursor: BatchCursor::default(),
            search: None,
            typing: false,
            subscribers: Vec::new(),
            pending: None,
        }
    }

    /// Register a callback for [`RenderEvent`]s.
    pub fn subscribe(&mut self, callback: EventCallback) {
        self.subscribers.push(callback);
    }

    /// Apply one message from the scheduler.
    pub fn apply(&mut self, msg: ViewMsg) {
        match msg {
            ViewMsg::Records { records, mode } => {
                if mode == RenderMode::Replace {
                    self.records.clear();
                    self.list_state.select(None);
                }
                self.records.extend(records);
                if self.list_state.selected().is_none() {
                    self.select_first();
                }
            }
            ViewMsg::State { state, cursor } => {
                self.status = state.to_string();
                self.state = state;
                self.cursor = cursor;
            }
        }
    }

    /// Every rendered record, ignoring the search filter.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Records that pass the search filter, in render order.
    pub fn visible(&self) -> Vec<&DisplayableRecord> {
        self.visible_indices()
            .into_iter()
            .map(|i| &self.records[i].1)
            .collect()
    }

    fn visible_indices(&self) -> Vec<usize> {
        let needle = match &self.search {
            Some(query) if !query.is_empty() => query.to_lowercase(),
            _ => return (0..self.records.len()).collect(),
        };
        self.records
            .iter()
            .enumerate()
            .filter(|(_, (_, record))| record.title.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }

    fn selected_index(&self) -> Option<usize> {
        let row = self.list_state.selected()?;
        self.visible_indices().get(row).copied()
    }

    pub fn selected_record(&self) -> Option<&DisplayableRecord> {
        self.selected_index().map(|i| &self.records[i].1)
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.visible_indices().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.visible_indices().is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.visible_indices().is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.visible_indices().len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }

    // -- search --------------------------------------------------------------

    pub fn begin_search(&mut self) {
        self.search.get_or_insert_with(String::new);
        self.typing = true;
    }

    pub fn push_search_char(&mut self, c: char) {
        self.search.get_or_insert_with(String::new).push(c);
        self.select_first();
    }

    pub fn pop_search_char(&mut self) {
        if let Some(query) = &mut self.search {
            query.pop();
        }
        self.select_first();
    }

    /// Stop typing but keep the filter applied.
    pub fn finish_search(&mut self) {
        self.typing = false;
        if self.search.as_deref() == Some("") {
            self.search = None;
        }
    }

    pub fn clear_search(&mut self) {
        self.search = None;
        self.typing = false;
        self.select_first();
    }

    // -- actions -------------------------------------------------------------

    /// Fire [`RenderEvent::Activated`] for the selected record.
    ///
    /// Returns the record's action URL, if it has one.
    pub fn activate_selected(&mut self) -> Option<String> {
        let index = self.selected_index()?;
        let (handle, record) = &self.records[index];
        let event = RenderEvent::Activated(*handle);
        for callback in self.subscribers.iter_mut() {
            callback(&event, record);
        }

        match &record.action_url {
            Some(url) => {
                info!(id = %record.id, %url, "record activated");
                self.status = format!("Opened {url}");
                Some(url.clone())
            }
            None => {
                self.status = format!("{} has no link", record.title);
                None
            }
        }
    }

    pub fn request(&mut self, action: Action) {
        self.pending = Some(action);
    }

    /// The last requested action, if the main loop has not handled it yet.
    pub fn take_action(&mut self) -> Option<Action> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ChannelRenderer, Renderer};
    use std::sync::{Arc, Mutex};

    fn record(id: &str, title: &str, url: Option<&str>) -> DisplayableRecord {
        DisplayableRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            action_url: url.map(str::to_string),
            media: Vec::new(),
            updated_at: String::new(),
            badge: None,
        }
    }

    /// Push records through a real [`ChannelRenderer`] so handles are genuine.
    fn app_with(records: Vec<DisplayableRecord>) -> App {
        let (mut renderer, rx) = ChannelRenderer::new();
        renderer.render(records, RenderMode::Append);
        let mut app = App::new("Test");
        while let Ok(msg) = rx.try_recv() {
            app.apply(msg);
        }
        app
    }

    fn sample() -> App {
        app_with(vec![
            record("1", "Midnight Rain", Some("http://a/1")),
            record("2", "Blue Skies", None),
            record("3", "Rainy Day", Some("http://a/3")),
        ])
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_empty() {
        let app = App::new("Songs");
        assert_eq!(app.total(), 0);
        assert!(!app.quit);
        assert!(app.list_state.selected().is_none());
        assert_eq!(app.state, SchedulerState::Idle);
    }

    // -- apply ---------------------------------------------------------------

    #[test]
    fn appended_records_keep_render_order() {
        let app = sample();
        let ids: Vec<_> = app.visible().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(app.list_state.selected(), Some(0), "first render selects the top row");
    }

    #[test]
    fn replace_clears_the_list() {
        let mut app = sample();
        app.select_last();
        app.apply(ViewMsg::Records {
            records: Vec::new(),
            mode: RenderMode::Replace,
        });
        assert_eq!(app.total(), 0);
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn state_messages_update_status() {
        let mut app = App::new("Ads");
        app.apply(ViewMsg::State {
            state: SchedulerState::Fetching(3),
            cursor: BatchCursor {
                page: 3,
                more: true,
                total: Some(40),
            },
        });
        assert_eq!(app.status, "Loading page 3…");
        assert_eq!(app.cursor.total, Some(40));
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn navigation_on_empty_is_noop() {
        let mut app = App::new("Songs");
        app.select_next();
        app.select_previous();
        app.select_last();
        assert!(app.list_state.selected().is_none());
    }

    #[test]
    fn select_next_clamps_at_last_item() {
        let mut app = sample();
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.list_state.selected(), Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = sample();
        app.select_previous();
        assert_eq!(app.list_state.selected(), Some(0));
    }

    // -- search --------------------------------------------------------------

    #[test]
    fn search_filters_titles_case_insensitively() {
        let mut app = sample();
        app.begin_search();
        for c in "RAIN".chars() {
            app.push_search_char(c);
        }
        let titles: Vec<_> = app.visible().iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Midnight Rain", "Rainy Day"]);
        assert_eq!(app.total(), 3);
    }

    #[test]
    fn selection_indexes_the_filtered_view() {
        let mut app = sample();
        app.begin_search();
        app.push_search_char('d');
        app.push_search_char('a');
        app.push_search_char('y');
        assert_eq!(app.selected_record().map(|r| r.id.as_str()), Some("3"));
    }

    #[test]
    fn clearing_search_restores_everything() {
        let mut app = sample();
        app.begin_search();
        app.push_search_char('z');
        assert!(app.visible().is_empty());
        assert!(app.list_state.selected().is_none());

        app.clear_search();
        assert_eq!(app.visible().len(), 3);
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn finishing_an_empty_search_drops_the_filter() {
        let mut app = sample();
        app.begin_search();
        app.finish_search();
        assert!(app.search.is_none());
        assert!(!app.typing);
    }

    // -- activation ----------------------------------------------------------

    #[test]
    fn activation_notifies_subscribers_with_the_record() {
        let mut app = sample();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        app.subscribe(Box::new(move |event: &RenderEvent, record: &DisplayableRecord| {
            sink.lock().unwrap().push((*event, record.id.clone()));
        }));

        app.select_last();
        let url = app.activate_selected();

        assert_eq!(url.as_deref(), Some("http://a/3"));
        assert_eq!(app.status, "Opened http://a/3");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0].0, RenderEvent::Activated(_)));
        assert_eq!(seen[0].1, "3");
    }

    #[test]
    fn activating_a_record_without_link_says_so() {
        let mut app = sample();
        app.select_next();
        assert_eq!(app.activate_selected(), None);
        assert_eq!(app.status, "Blue Skies has no link");
    }

    #[test]
    fn actions_are_taken_once() {
        let mut app = App::new("Songs");
        app.request(Action::Refresh);
        assert_eq!(app.take_action(), Some(Action::Refresh));
        assert_eq!(app.take_action(), None);
    }
}
