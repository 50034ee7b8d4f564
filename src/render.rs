//! The renderer contract and the channel that carries renders to the UI.
//!
//! The scheduler runs as a tokio task; the terminal is drawn on the main
//! thread.  [`ChannelRenderer`] is the bridge: it implements [`Renderer`] by
//! forwarding every call over an [`mpsc`] channel that the main loop drains
//! on every tick.
//!
//! ## For contributors
//!
//! A renderer is a sink.  It is handed records in their final order and
//! must not reorder, filter or fail.  Anything interactive (activating a
//! record) flows back through [`RenderEvent`] subscribers on
//! [`crate::app::App`], keyed by the [`RenderHandle`] each render returned.

use std::sync::mpsc;

use tracing::debug;

use crate::scheduler::{BatchCursor, SchedulerState};
use crate::source::DisplayableRecord;

/// Whether a render adds to or replaces what is already shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Append,
    Replace,
}

/// Opaque reference to one rendered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(u64);

/// Something the user did to a rendered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    Activated(RenderHandle),
}

/// Callback registered with the view for [`RenderEvent`]s.
pub type EventCallback = Box<dyn FnMut(&RenderEvent, &DisplayableRecord) + Send>;

pub trait Renderer: Send {
    /// Show `records` in the given order.  Returns one handle per record.
    fn render(&mut self, records: Vec<DisplayableRecord>, mode: RenderMode) -> Vec<RenderHandle>;

    /// Observe a scheduler transition.  Defaults to ignoring it.
    fn state_changed(&mut self, _state: &SchedulerState, _cursor: &BatchCursor) {}
}

/// Messages sent from the scheduler task to the UI thread.
#[derive(Debug)]
pub enum ViewMsg {
    Records {
        records: Vec<(RenderHandle, DisplayableRecord)>,
        mode: RenderMode,
    },
    State {
        state: SchedulerState,
        cursor: BatchCursor,
    },
}

/// [`Renderer`] that forwards to the UI thread.
pub struct ChannelRenderer {
    tx: mpsc::Sender<ViewMsg>,
    next_handle: u64,
}

impl ChannelRenderer {
    /// Create the renderer and the receiver the main loop should drain.
    pub fn new() -> (Self, mpsc::Receiver<ViewMsg>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx, next_handle: 0 }, rx)
    }

    fn send(&self, msg: ViewMsg) {
        // If the receiver is gone the UI has exited; nothing left to show.
        if self.tx.send(msg).is_err() {
            debug!("view closed, dropping render");
        }
    }
}

impl Renderer for ChannelRenderer {
    fn render(&mut self, records: Vec<DisplayableRecord>, mode: RenderMode) -> Vec<RenderHandle> {
        let tagged: Vec<_> = records
            .into_iter()
            .map(|record| {
                self.next_handle += 1;
                (RenderHandle(self.next_handle), record)
            })
            .collect();
        let handles = tagged.iter().map(|(handle, _)| *handle).collect();

        self.send(ViewMsg::Records {
            records: tagged,
            mode,
        });
        handles
    }

    fn state_changed(&mut self, state: &SchedulerState, cursor: &BatchCursor) {
        self.send(ViewMsg::State {
            state: state.clone(),
            cursor: cursor.clone(),
        });
    }
}
