//! The batch scheduler: fetch → enrich → render, one page at a time.
//!
//! ```text
//!  Idle ─start()─► Fetching(n) ─► Enriching(n) ─► Rendering(n) ─► Waiting(n) ─┐
//!                      │  ▲                            │                      │
//!                      │  └──────────── n + 1 ◄────────┼──────────────────────┘
//!                      │                               ▼
//!                      ├─ nothing received / later page fails ─► Done
//!                      └─ bootstrap / page 1 fails ────► Error
//!
//!  any non-Idle state ─cancel()─► Cancelled ─reset()─► Idle
//! ```
//!
//! A run executes as one tokio task.  Every run is tagged with a generation
//! number; `start`, `cancel` and `reset` bump it, and the task checks its tag
//! each time it touches shared state.  A stale task's results are dropped
//! on the floor.  In-flight requests are never aborted, only ignored.
//!
//! Pages are processed strictly in order.  Within a page, enrichment fans
//! out concurrently and the results are re-joined in the page's
//! newest-first order before rendering.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bootstrap::{Bootstrap, Session};
use crate::dedup::Deduplicator;
use crate::error::ViewError;
use crate::pacing::PacingPolicy;
use crate::render::{RenderMode, Renderer};
use crate::source::RawItemDescriptor;

/// Where the scheduler is in the paginated walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCursor {
    /// 1-based page to fetch next (or being fetched).
    pub page: u32,
    /// Whether the source said more pages exist.
    pub more: bool,
    /// Collection size, if the source reported one.
    pub total: Option<u64>,
}

impl Default for BatchCursor {
    fn default() -> Self {
        Self {
            page: 1,
            more: true,
            total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching(u32),
    Enriching(u32),
    Rendering(u32),
    Waiting(u32),
    Done { rendered: usize },
    Cancelled,
    Error(ViewError),
}

impl SchedulerState {
    /// A run is in progress.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SchedulerState::Fetching(_)
                | SchedulerState::Enriching(_)
                | SchedulerState::Rendering(_)
                | SchedulerState::Waiting(_)
        )
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "Idle"),
            SchedulerState::Fetching(page) => write!(f, "Loading page {page}…"),
            SchedulerState::Enriching(page) => write!(f, "Preparing page {page}…"),
            SchedulerState::Rendering(page) => write!(f, "Showing page {page}…"),
            SchedulerState::Waiting(page) => write!(f, "Page {page} shown, more on the way…"),
            SchedulerState::Done { rendered } => write!(f, "Done: {rendered} shown"),
            SchedulerState::Cancelled => write!(f, "Cancelled"),
            SchedulerState::Error(e) => write!(f, "Error: {e} (r to retry)"),
        }
    }
}

/// Knobs that stay fixed for the scheduler's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub pacing: PacingPolicy,
    /// Stop after this many pages even if the source claims more.
    pub max_pages: Option<u32>,
}

struct Shared {
    generation: u64,
    state: SchedulerState,
    cursor: BatchCursor,
    seen: Deduplicator,
    rendered: usize,
    renderer: Box<dyn Renderer>,
}

impl Shared {
    fn enter(&mut self, state: SchedulerState) {
        debug!(generation = self.generation, from = ?self.state, to = ?state, "transition");
        self.state = state;
        self.renderer.state_changed(&self.state, &self.cursor);
    }
}

/// Marker for "this run has been superseded".
struct Stale;

struct Inner {
    bootstrap: Arc<dyn Bootstrap>,
    options: SchedulerOptions,
    shared: Mutex<Shared>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` on the shared state if `generation` is still current.
    fn with<T>(&self, generation: u64, f: impl FnOnce(&mut Shared) -> T) -> Result<T, Stale> {
        let mut shared = self.lock();
        if shared.generation != generation {
            return Err(Stale);
        }
        Ok(f(&mut shared))
    }

    fn transition(&self, generation: u64, state: SchedulerState) -> Result<(), Stale> {
        self.with(generation, |shared| shared.enter(state))
    }

    fn finish(&self, generation: u64) -> Result<(), Stale> {
        self.with(generation, |shared| {
            let rendered = shared.rendered;
            info!(rendered, pages = shared.cursor.page, "page view complete");
            shared.enter(SchedulerState::Done { rendered });
        })
    }

    fn fail(&self, generation: u64, err: ViewError) -> Result<(), Stale> {
        error!(error = %err, "page view failed");
        self.transition(generation, SchedulerState::Error(err))
    }

    fn page_limit_reached(&self, page: u32) -> bool {
        self.options.max_pages.is_some_and(|max| page >= max)
    }
}

/// Drives one page view.  Cheap to share; all methods take `&self`.
pub struct BatchScheduler {
    inner: Arc<Inner>,
}

impl BatchScheduler {
    pub fn new(
        bootstrap: Arc<dyn Bootstrap>,
        renderer: Box<dyn Renderer>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bootstrap,
                options,
                shared: Mutex::new(Shared {
                    generation: 0,
                    state: SchedulerState::Idle,
                    cursor: BatchCursor::default(),
                    seen: Deduplicator::new(),
                    rendered: 0,
                    renderer,
                }),
            }),
        }
    }

    /// Begin a run from `Idle`.  Must be called within a tokio runtime.
    ///
    /// Returns `None` (and does nothing) from any other state; use
    /// [`refresh`](Self::refresh) to restart.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let generation = {
            let mut shared = self.inner.lock();
            if shared.state != SchedulerState::Idle {
                warn!(state = ?shared.state, "start ignored: scheduler is not idle");
                return None;
            }
            shared.generation += 1;
            let first = shared.cursor.page;
            shared.enter(SchedulerState::Fetching(first));
            shared.generation
        };

        info!(generation, "starting page view");
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            if drive(&inner, generation).await.is_err() {
                debug!(generation, "superseded run discarded");
            }
        }))
    }

    /// Abandon the current run.  Late results from it are discarded.
    pub fn cancel(&self) {
        let mut shared = self.inner.lock();
        if shared.state == SchedulerState::Idle {
            return;
        }
        shared.generation += 1;
        info!(generation = shared.generation, "page view cancelled");
        shared.enter(SchedulerState::Cancelled);
    }

    /// Forget everything shown so far and return to `Idle`.
    pub fn reset(&self) {
        let mut shared = self.inner.lock();
        shared.generation += 1;
        shared.seen.reset();
        shared.cursor = BatchCursor::default();
        shared.rendered = 0;
        shared.renderer.render(Vec::new(), RenderMode::Replace);
        shared.enter(SchedulerState::Idle);
    }

    /// `cancel`, `reset`, then `start`.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        self.cancel();
        self.reset();
        self.start()
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.lock().state.clone()
    }

    pub fn cursor(&self) -> BatchCursor {
        self.inner.lock().cursor.clone()
    }

    /// Records handed to the renderer in the current run.
    pub fn rendered(&self) -> usize {
        self.inner.lock().rendered
    }
}

/// The body of one run.  Returns `Err(Stale)` as soon as it is superseded.
async fn drive(inner: &Inner, generation: u64) -> Result<(), Stale> {
    // `start` already entered Fetching(1); the bootstrap belongs to it.
    let session: Session = match inner.bootstrap.bootstrap().await {
        Ok(session) => session,
        Err(e) => return inner.fail(generation, e.into()),
    };
    info!(source = session.source.name(), "session ready");

    loop {
        let page = inner.with(generation, |shared| shared.cursor.page)?;

        let fetched = match session.source.fetch_page(page).await {
            Ok(fetched) => fetched,
            Err(e) if page == 1 => return inner.fail(generation, e.into()),
            Err(e) => {
                warn!(
                    page = e.page(),
                    status = ?e.status(),
                    error = %e,
                    "page fetch failed, keeping what is already shown"
                );
                return inner.finish(generation);
            }
        };

        if fetched.received == 0 {
            debug!(page, "empty page, no more data");
            return inner.finish(generation);
        }

        let more = fetched.has_more && !inner.page_limit_reached(page);
        inner.with(generation, |shared| {
            shared.cursor.more = more;
            if fetched.total.is_some() {
                shared.cursor.total = fetched.total;
            }
            shared.enter(SchedulerState::Enriching(page));
        })?;

        let mut items = fetched.items;
        items.sort_by(RawItemDescriptor::cmp_newest_first);
        let enriched = join_all(items.iter().map(|d| session.enricher.enrich(d))).await;
        let dropped = enriched.iter().filter(|r| r.is_none()).count();

        inner.with(generation, |shared| {
            shared.enter(SchedulerState::Rendering(page));
            let admitted: Vec<_> = enriched
                .into_iter()
                .flatten()
                .filter(|record| shared.seen.admit(&record.id))
                .collect();
            info!(
                page,
                fetched = items.len(),
                dropped,
                admitted = admitted.len(),
                seen = shared.seen.len(),
                "batch ready"
            );
            shared.rendered += admitted.len();
            if !admitted.is_empty() {
                shared.renderer.render(admitted, RenderMode::Append);
            }
        })?;

        if !more {
            return inner.finish(generation);
        }

        inner.transition(generation, SchedulerState::Waiting(page))?;
        tokio::time::sleep(inner.options.pacing.delay_after(page)).await;
        inner.with(generation, |shared| {
            shared.cursor.page += 1;
            let next = shared.cursor.page;
            shared.enter(SchedulerState::Fetching(next));
        })?;
    }
}
