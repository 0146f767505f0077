//! Search session controller
//!
//! `SearchSession` is the single owner of the query, the result set and the
//! navigation cursor. It drives the locator and the highlighter against a
//! `DocumentHost` and reconciles its state when the host's document is
//! replaced.
//!
//! Nothing here blocks or spawns. Debounced settles, post-load reconciles
//! and scroll retries are queued on a `Scheduler` and run from `tick`, so
//! `close()` or a newer query can always cancel work that has not run yet.
//!
//! Paint and clear only run inside methods taking `&mut self` together with
//! `&mut` access to the host, so at most one of them touches the document
//! at a time.

use super::assist::{AssistResult, SearchAssist};
use super::highlight::{self, ScrollOutcome};
use super::locator::{self, SearchQuery, SearchResultSet};
use super::navigation::{Direction, NavigationState};
use super::scheduler::{Scheduler, TaskHandle};
use crate::preview::DocumentHost;
use log::{debug, info};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Debounce applied to query edits unless configured otherwise.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Lifecycle state of a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Closed,
    /// Open with no query typed
    OpenEmpty,
    /// A query edit is waiting out the debounce
    OpenSearching,
    /// Results are computed for the current query
    OpenSettled,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }
}

/// Work deferred to a later `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTask {
    /// Debounce expired
    Settle,
    /// Re-run the search against a freshly loaded document
    Reconcile { generation: u64 },
    /// Scroll the current marker into view
    Scroll { attempt: u8 },
}

/// Snapshot for the search bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatus {
    pub state: SessionState,
    pub query: String,
    pub case_sensitive: bool,
    pub total: usize,
    pub current: Option<usize>,
    pub label: String,
}

/// The stateful owner of an in-document search.
pub struct SearchSession {
    state: SessionState,
    query: SearchQuery,
    results: SearchResultSet,
    navigation: NavigationState,
    debounce: Duration,
    scheduler: Scheduler<SessionTask>,
    settle_task: Option<TaskHandle>,
    reconcile_task: Option<TaskHandle>,
    scroll_task: Option<TaskHandle>,
    /// The last scan found the document unreachable
    awaiting_load: bool,
    assist: Option<Box<dyn SearchAssist>>,
    assist_result: Option<AssistResult>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("state", &self.state)
            .field("query", &self.query)
            .field("navigation", &self.navigation)
            .field("pending_tasks", &self.scheduler.len())
            .field("has_assist", &self.assist.is_some())
            .finish()
    }
}

impl SearchSession {
    /// Create a closed session with the given debounce.
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SessionState::Closed,
            query: SearchQuery::default(),
            results: SearchResultSet::default(),
            navigation: NavigationState::empty(),
            debounce,
            scheduler: Scheduler::new(),
            settle_task: None,
            reconcile_task: None,
            scroll_task: None,
            awaiting_load: false,
            assist: None,
            assist_result: None,
        }
    }

    /// Attach a backend search assist.
    pub fn with_assist(mut self, assist: Box<dyn SearchAssist>) -> Self {
        self.assist = Some(assist);
        self
    }

    /// The attached backend assist, if any.
    pub fn assist_mut(&mut self) -> Option<&mut (dyn SearchAssist + 'static)> {
        self.assist.as_deref_mut()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn query(&self) -> &str {
        &self.query.text
    }

    pub fn case_sensitive(&self) -> bool {
        self.query.case_sensitive
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// The result set of the last settle.
    pub fn results(&self) -> &SearchResultSet {
        &self.results
    }

    pub fn navigation(&self) -> NavigationState {
        self.navigation
    }

    /// Context snippets from the backend assist for the last settle.
    pub fn assist_result(&self) -> Option<&AssistResult> {
        self.assist_result.as_ref()
    }

    /// When the next deferred task comes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    /// Snapshot for the search bar.
    pub fn status(&self) -> SearchStatus {
        let has_query = matches!(self.state, SessionState::OpenSettled);
        SearchStatus {
            state: self.state,
            query: self.query.text.clone(),
            case_sensitive: self.query.case_sensitive,
            total: self.navigation.total,
            current: self.navigation.current,
            label: self.navigation.counter_label(has_query),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the search bar. Any markers left in the document are removed.
    pub fn open<H: DocumentHost + ?Sized>(&mut self, host: &mut H) {
        if self.is_open() {
            return;
        }
        highlight::clear(host);
        self.state = SessionState::OpenEmpty;
        info!("Search opened");
    }

    /// Close the search bar, cancelling all pending work.
    ///
    /// Query text, results and navigation are discarded. The case
    /// sensitivity flag is a preference and survives.
    pub fn close<H: DocumentHost + ?Sized>(&mut self, host: &mut H) {
        self.scheduler.cancel_all();
        self.settle_task = None;
        self.reconcile_task = None;
        self.scroll_task = None;
        self.awaiting_load = false;

        highlight::clear(host);
        self.query.text.clear();
        self.results = SearchResultSet::default();
        self.navigation = NavigationState::empty();
        self.assist_result = None;
        if let Some(assist) = self.assist.as_mut() {
            assist.clear();
        }

        if self.is_open() {
            info!("Search closed");
        }
        self.state = SessionState::Closed;
    }

    /// Record a query edit and restart the debounce.
    pub fn set_query(&mut self, text: &str, now: Instant) {
        if !self.is_open() {
            debug!("Ignoring query edit while search is closed");
            return;
        }
        self.query.text = text.to_string();
        self.cancel_settle();
        self.settle_task = Some(self.scheduler.schedule(now + self.debounce, SessionTask::Settle));
        self.state = SessionState::OpenSearching;
        debug!("Query set to {:?}, settling in {:?}", text, self.debounce);
    }

    /// Change case sensitivity, re-matching immediately if a query is active.
    pub fn set_case_sensitive<H: DocumentHost + ?Sized>(
        &mut self,
        case_sensitive: bool,
        now: Instant,
        host: &mut H,
    ) {
        if self.query.case_sensitive == case_sensitive {
            return;
        }
        self.query.case_sensitive = case_sensitive;
        debug!("Case sensitivity set to {}", case_sensitive);

        if !self.is_open() || self.query.text.is_empty() {
            return;
        }
        self.cancel_settle();
        self.state = SessionState::OpenSearching;
        self.settle(now, host);
    }

    /// Step to the next or previous match.
    ///
    /// Only acts on settled results; returns whether the cursor moved.
    pub fn navigate<H: DocumentHost + ?Sized>(
        &mut self,
        direction: Direction,
        now: Instant,
        host: &mut H,
    ) -> bool {
        if self.state != SessionState::OpenSettled {
            debug!("Ignoring navigate({}) in state {:?}", direction, self.state);
            return false;
        }
        if self.navigation.total == 0 {
            return false;
        }
        self.navigation.advance(direction);
        let flagged = highlight::set_current(host, self.navigation.current);
        if flagged.is_none() {
            debug!("No marker for match {:?}, document unreachable", self.navigation.current);
        }

        if let Some(assist) = self.assist.as_mut() {
            if let Err(e) = assist.navigate(direction) {
                debug!("Search assist navigate failed: {}", e);
            }
        }

        self.request_scroll(now);
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Render Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// The host's document was replaced wholesale.
    ///
    /// Results stay as they were until the new document signals load; no
    /// scan runs against a document that is not loaded yet.
    pub fn on_document_replaced<H: DocumentHost + ?Sized>(&mut self, now: Instant, host: &H) {
        if !self.is_open() {
            return;
        }
        if let Some(handle) = self.scroll_task.take() {
            self.scheduler.cancel(handle);
        }
        if let Some(handle) = self.reconcile_task.take() {
            self.scheduler.cancel(handle);
        }
        self.awaiting_load = true;
        debug!("Document replaced (generation {})", host.generation());

        if host.is_loaded() {
            self.on_document_loaded(now, host);
        }
    }

    /// The host signalled that its current document finished loading.
    pub fn on_document_loaded<H: DocumentHost + ?Sized>(&mut self, now: Instant, host: &H) {
        if !self.is_open() || !self.awaiting_load {
            return;
        }
        if let Some(handle) = self.reconcile_task.take() {
            self.scheduler.cancel(handle);
        }
        let generation = host.generation();
        self.reconcile_task = Some(
            self.scheduler
                .schedule(now, SessionTask::Reconcile { generation }),
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deferred Work
    // ─────────────────────────────────────────────────────────────────────────

    /// Run every task due at `now`. Returns whether any task ran.
    pub fn tick<H: DocumentHost + ?Sized>(&mut self, now: Instant, host: &mut H) -> bool {
        let due = self.scheduler.take_due(now);
        let ran = !due.is_empty();
        for (handle, task) in due {
            match task {
                SessionTask::Settle => {
                    if self.settle_task == Some(handle) {
                        self.settle_task = None;
                        self.settle(now, host);
                    }
                }
                SessionTask::Reconcile { generation } => {
                    if self.reconcile_task == Some(handle) {
                        self.reconcile_task = None;
                        self.reconcile(generation, now, host);
                    }
                }
                SessionTask::Scroll { attempt } => {
                    if self.scroll_task == Some(handle) {
                        self.scroll_task = None;
                        self.scroll(attempt, now, host);
                    }
                }
            }
        }
        ran
    }

    fn cancel_settle(&mut self) {
        if let Some(handle) = self.settle_task.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn settle<H: DocumentHost + ?Sized>(&mut self, now: Instant, host: &mut H) {
        if self.state != SessionState::OpenSearching {
            return;
        }

        if self.query.text.is_empty() {
            highlight::clear(host);
            self.results = SearchResultSet::empty(self.query.clone());
            self.navigation = NavigationState::empty();
            self.assist_result = None;
            if let Some(assist) = self.assist.as_mut() {
                assist.clear();
            }
            self.state = SessionState::OpenEmpty;
            debug!("Empty query settled");
            return;
        }

        self.run_search(None, now, host);
        self.state = SessionState::OpenSettled;
    }

    fn reconcile<H: DocumentHost + ?Sized>(&mut self, generation: u64, now: Instant, host: &mut H) {
        if generation != host.generation() || !host.is_loaded() {
            debug!("Skipping reconcile for stale generation {}", generation);
            return;
        }
        match self.state {
            SessionState::OpenSettled => {
                let previous = self.navigation.current;
                self.run_search(previous, now, host);
            }
            // A pending settle scans the new document when it fires
            SessionState::OpenSearching => {}
            SessionState::OpenEmpty => {
                self.awaiting_load = false;
            }
            SessionState::Closed => {}
        }
    }

    /// Clear, locate and paint against the current document.
    fn run_search<H: DocumentHost + ?Sized>(
        &mut self,
        previous: Option<usize>,
        now: Instant,
        host: &mut H,
    ) {
        highlight::clear(host);
        self.results = locator::locate(host, &self.query);
        self.navigation = match previous {
            Some(_) => NavigationState::preserve(previous, self.results.len()),
            None => NavigationState::new(self.results.len()),
        };
        let report = highlight::paint(host, &self.results, self.navigation.current);

        if self.results.is_available() {
            self.awaiting_load = false;
            debug!(
                "Found {} matches for {:?} ({} painted, {} skipped)",
                self.results.len(),
                self.query.text,
                report.painted,
                report.skipped
            );
        } else {
            self.awaiting_load = true;
            debug!("Document unreachable, search will retry on next load");
        }

        self.assist_result = match self.assist.as_mut() {
            Some(assist) => match assist.search(&self.query.text, self.query.case_sensitive) {
                Ok(result) => Some(result),
                Err(e) => {
                    debug!("Search assist unavailable, using local results: {}", e);
                    None
                }
            },
            None => None,
        };

        if self.navigation.current.is_some() {
            self.request_scroll(now);
        }
    }

    fn request_scroll(&mut self, now: Instant) {
        if let Some(handle) = self.scroll_task.take() {
            self.scheduler.cancel(handle);
        }
        self.scroll_task = Some(self.scheduler.schedule(now, SessionTask::Scroll { attempt: 0 }));
    }

    fn scroll<H: DocumentHost + ?Sized>(&mut self, attempt: u8, now: Instant, host: &mut H) {
        match highlight::scroll_to_current(host) {
            ScrollOutcome::Scrolled => {}
            outcome if attempt == 0 => {
                debug!("Current marker not scrollable ({:?}), retrying", outcome);
                self.scroll_task = Some(self.scheduler.schedule(now, SessionTask::Scroll { attempt: 1 }));
            }
            outcome => debug!("Giving up on scroll: {:?}", outcome),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DocumentTree, Element};
    use crate::error::{Error, Result};
    use crate::preview::PreviewFrame;
    use crate::search::assist::SourceSearchAssist;
    use crate::search::highlight::{current_marker, markers};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn doc(paragraphs: &[&str]) -> DocumentTree {
        let mut tree = DocumentTree::new();
        for text in paragraphs {
            let p = tree.append_element(tree.root(), Element::new("p"));
            tree.append_text(p, text);
        }
        tree
    }

    fn loaded(paragraphs: &[&str]) -> PreviewFrame {
        let mut frame = PreviewFrame::new();
        frame.load(doc(paragraphs));
        frame
    }

    fn marker_total(frame: &PreviewFrame) -> usize {
        frame.document().map(|tree| markers(tree).len()).unwrap_or(0)
    }

    fn current_text(frame: &PreviewFrame) -> Option<String> {
        let tree = frame.document()?;
        current_marker(tree).map(|m| tree.text_content(m))
    }

    /// Open a session and settle `query` against `frame`.
    fn settled(frame: &mut PreviewFrame, query: &str, start: Instant) -> SearchSession {
        let mut session = SearchSession::default();
        session.open(frame);
        session.set_query(query, start);
        session.tick(start + DEFAULT_DEBOUNCE, frame);
        session
    }

    struct FailingAssist;

    impl SearchAssist for FailingAssist {
        fn document_changed(&mut self, _source: &str) {}

        fn search(&mut self, _query: &str, _case_sensitive: bool) -> Result<AssistResult> {
            Err(Error::Application("bridge down".to_string()))
        }

        fn navigate(&mut self, _direction: Direction) -> Result<usize> {
            Err(Error::Application("bridge down".to_string()))
        }

        fn clear(&mut self) {}
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_open_and_close_states() {
        let mut frame = loaded(&["x"]);
        let mut session = SearchSession::default();
        assert_eq!(session.state(), SessionState::Closed);

        session.open(&mut frame);
        assert_eq!(session.state(), SessionState::OpenEmpty);
        assert_eq!(session.status().label, "");

        session.close(&mut frame);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_open_clears_residual_markers() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat."]);
        let abandoned = settled(&mut frame, "cat", start);
        assert_eq!(marker_total(&frame), 1);
        drop(abandoned);

        let mut second = SearchSession::default();
        second.open(&mut frame);
        assert_eq!(marker_total(&frame), 0);
    }

    #[test]
    fn test_query_ignored_while_closed() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = SearchSession::default();
        session.set_query("cat", start);
        assert_eq!(session.next_deadline(), None);
        assert!(!session.tick(start + ms(1000), &mut frame));
        assert_eq!(marker_total(&frame), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Debounce tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_settles_after_debounce() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The ", "CAT ran."]);
        let mut session = SearchSession::default();
        session.open(&mut frame);
        session.set_query("cat", start);

        assert_eq!(session.state(), SessionState::OpenSearching);
        assert_eq!(session.next_deadline(), Some(start + DEFAULT_DEBOUNCE));
        session.tick(start + ms(299), &mut frame);
        assert_eq!(marker_total(&frame), 0);

        session.tick(start + ms(300), &mut frame);
        assert_eq!(session.state(), SessionState::OpenSettled);
        assert_eq!(session.status().label, "1 of 2");
        assert_eq!(marker_total(&frame), 2);
        assert_eq!(current_text(&frame).as_deref(), Some("cat"));
    }

    #[test]
    fn test_settle_paints_once_without_requeue() {
        let start = Instant::now();
        let mut frame = loaded(&["cat cat cat"]);
        let mut session = settled(&mut frame, "cat", start);
        assert_eq!(session.state(), SessionState::OpenSettled);
        assert_eq!(marker_total(&frame), 3);

        // Only the scroll for the first match is left; no settle was re-queued
        let now = start + DEFAULT_DEBOUNCE;
        assert_eq!(session.next_deadline(), Some(now));
        assert!(session.tick(now, &mut frame));
        assert_eq!(session.next_deadline(), None);

        assert!(session.navigate(Direction::Next, now, &mut frame));
        assert_eq!(session.status().label, "2 of 3");
        assert_eq!(marker_total(&frame), 3);
    }

    #[test]
    fn test_newer_query_supersedes_pending_settle() {
        let start = Instant::now();
        let mut frame = loaded(&["cat catalog dog"]);
        let mut session = SearchSession::default();
        session.open(&mut frame);

        session.set_query("ca", start);
        session.set_query("dog", start + ms(200));
        session.tick(start + ms(300), &mut frame);
        assert_eq!(session.state(), SessionState::OpenSearching);
        assert_eq!(marker_total(&frame), 0);

        session.tick(start + ms(500), &mut frame);
        assert_eq!(session.results().len(), 1);
        assert_eq!(session.results().query().text, "dog");
    }

    #[test]
    fn test_empty_query_settles_to_open_empty() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat."]);
        let mut session = settled(&mut frame, "cat", start);

        session.set_query("", start + ms(1000));
        session.tick(start + ms(1300), &mut frame);

        assert_eq!(session.state(), SessionState::OpenEmpty);
        assert_eq!(marker_total(&frame), 0);
        assert_eq!(session.status().label, "");
    }

    #[test]
    fn test_no_matches_label() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat."]);
        let session = settled(&mut frame, "dog", start);
        assert_eq!(session.state(), SessionState::OpenSettled);
        assert_eq!(session.status().label, "No matches");
        assert_eq!(session.status().current, None);
    }

    #[test]
    fn test_case_sensitivity_rematches_immediately() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The CAT ran."]);
        let mut session = settled(&mut frame, "cat", start);
        assert_eq!(session.results().len(), 2);

        session.set_case_sensitive(true, start + ms(400), &mut frame);
        assert_eq!(session.state(), SessionState::OpenSettled);
        assert_eq!(session.results().len(), 1);
        assert_eq!(marker_total(&frame), 1);
        assert!(session.status().case_sensitive);
    }

    #[test]
    fn test_case_sensitivity_cancels_pending_debounce() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The CAT ran."]);
        let mut session = SearchSession::default();
        session.open(&mut frame);
        session.set_query("cat", start);

        session.set_case_sensitive(true, start + ms(10), &mut frame);
        assert_eq!(session.state(), SessionState::OpenSettled);
        assert_eq!(session.next_deadline(), Some(start + ms(10)));
        session.tick(start + ms(10), &mut frame);
        session.tick(start + ms(400), &mut frame);
        assert_eq!(session.results().len(), 1);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_navigate_moves_current_marker_only() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The CAT ran."]);
        let mut session = settled(&mut frame, "cat", start);

        assert!(session.navigate(Direction::Next, start + ms(500), &mut frame));
        assert_eq!(session.status().label, "2 of 2");
        assert_eq!(current_text(&frame).as_deref(), Some("CAT"));
        assert_eq!(marker_total(&frame), 2);

        assert!(session.navigate(Direction::Next, start + ms(600), &mut frame));
        assert_eq!(session.status().current, Some(0));

        assert!(session.navigate(Direction::Prev, start + ms(700), &mut frame));
        assert_eq!(session.status().current, Some(1));
    }

    #[test]
    fn test_navigate_during_searching_is_ignored() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The CAT ran."]);
        let mut session = settled(&mut frame, "cat", start);

        session.set_query("sat", start + ms(1000));
        assert!(!session.navigate(Direction::Next, start + ms(1010), &mut frame));
        assert_eq!(session.navigation(), NavigationState::new(2));
        assert_eq!(session.results().query().text, "cat");

        session.tick(start + ms(1300), &mut frame);
        assert_eq!(session.results().query().text, "sat");
        assert_eq!(session.status().label, "1 of 1");
    }

    #[test]
    fn test_navigate_without_matches() {
        let start = Instant::now();
        let mut frame = loaded(&["nothing here"]);
        let mut session = settled(&mut frame, "cat", start);
        assert!(!session.navigate(Direction::Next, start + ms(400), &mut frame));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scroll tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_scroll_follows_settle_and_navigation() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat. The CAT ran."]);
        let mut session = settled(&mut frame, "cat", start);
        assert_eq!(frame.scroll_target(), None);

        session.tick(start + ms(300), &mut frame);
        let first = frame.document().and_then(current_marker);
        assert!(first.is_some());
        assert_eq!(frame.scroll_target(), first);

        session.navigate(Direction::Next, start + ms(400), &mut frame);
        session.tick(start + ms(400), &mut frame);
        assert_eq!(frame.scroll_target(), frame.document().and_then(current_marker));
        assert_ne!(frame.scroll_target(), first);
    }

    #[test]
    fn test_scroll_retries_once() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = settled(&mut frame, "cat", start);

        frame.mount(doc(&["cat"]));
        session.tick(start + ms(300), &mut frame);
        assert!(session.next_deadline().is_some());

        session.tick(start + ms(301), &mut frame);
        assert_eq!(session.next_deadline(), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_replaced_while_closed_does_nothing() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = SearchSession::default();

        frame.load(doc(&["cat cat"]));
        session.on_document_replaced(start, &frame);
        session.on_document_loaded(start, &frame);
        assert!(!session.tick(start + ms(1000), &mut frame));
        assert_eq!(marker_total(&frame), 0);
        assert_eq!(session.results().len(), 0);
    }

    #[test]
    fn test_reconcile_waits_for_load_signal() {
        let start = Instant::now();
        let mut frame = loaded(&["one cat"]);
        let mut session = settled(&mut frame, "cat", start);

        frame.mount(doc(&["cat and cat and cat"]));
        session.on_document_replaced(start + ms(500), &frame);
        session.tick(start + ms(600), &mut frame);
        assert_eq!(session.results().len(), 1);

        frame.finish_load();
        session.on_document_loaded(start + ms(700), &frame);
        session.tick(start + ms(700), &mut frame);
        assert_eq!(session.results().len(), 3);
        assert_eq!(marker_total(&frame), 3);
        assert_eq!(session.state(), SessionState::OpenSettled);
    }

    #[test]
    fn test_reconcile_preserves_index() {
        let start = Instant::now();
        let mut frame = loaded(&["cat cat cat"]);
        let mut session = settled(&mut frame, "cat", start);
        session.navigate(Direction::Next, start + ms(400), &mut frame);
        session.navigate(Direction::Next, start + ms(400), &mut frame);
        assert_eq!(session.status().current, Some(2));

        frame.load(doc(&["cat cat cat cat"]));
        session.on_document_replaced(start + ms(500), &frame);
        session.tick(start + ms(500), &mut frame);
        assert_eq!(session.status().label, "3 of 4");
        assert_eq!(marker_total(&frame), 4);
    }

    #[test]
    fn test_reconcile_clamps_index() {
        let start = Instant::now();
        let mut frame = loaded(&["cat cat cat"]);
        let mut session = settled(&mut frame, "cat", start);
        session.navigate(Direction::Prev, start + ms(400), &mut frame);
        assert_eq!(session.status().current, Some(2));

        frame.load(doc(&["cat"]));
        session.on_document_replaced(start + ms(500), &frame);
        session.tick(start + ms(500), &mut frame);
        assert_eq!(session.status().label, "1 of 1");

        frame.load(doc(&["no felines"]));
        session.on_document_replaced(start + ms(600), &frame);
        session.tick(start + ms(600), &mut frame);
        assert_eq!(session.status().label, "No matches");
        assert_eq!(session.status().current, None);
    }

    #[test]
    fn test_stale_generation_is_skipped() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = settled(&mut frame, "cat", start);

        frame.load(doc(&["cat cat"]));
        session.on_document_replaced(start + ms(500), &frame);
        frame.mount(doc(&["cat cat cat"]));
        session.on_document_replaced(start + ms(501), &frame);
        session.tick(start + ms(501), &mut frame);
        assert_eq!(session.results().len(), 1);

        frame.finish_load();
        session.on_document_loaded(start + ms(502), &frame);
        session.tick(start + ms(502), &mut frame);
        assert_eq!(session.results().len(), 3);
    }

    #[test]
    fn test_unreachable_document_retries_on_load() {
        let start = Instant::now();
        let mut frame = PreviewFrame::new();
        let mut session = SearchSession::default();
        session.open(&mut frame);
        session.set_query("cat", start);
        session.tick(start + ms(300), &mut frame);

        assert_eq!(session.state(), SessionState::OpenSettled);
        assert!(!session.results().is_available());
        assert_eq!(session.status().label, "No matches");

        frame.load(doc(&["cat"]));
        session.on_document_loaded(start + ms(400), &frame);
        session.tick(start + ms(400), &mut frame);
        assert!(session.results().is_available());
        assert_eq!(session.status().label, "1 of 1");
    }

    #[test]
    fn test_close_cancels_pending_work() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = SearchSession::default();
        session.open(&mut frame);
        session.set_query("cat", start);
        session.close(&mut frame);

        assert_eq!(session.next_deadline(), None);
        assert!(!session.tick(start + ms(1000), &mut frame));
        assert_eq!(marker_total(&frame), 0);
        assert_eq!(session.query(), "");
    }

    #[test]
    fn test_close_cancels_pending_reconcile() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = settled(&mut frame, "cat", start);

        frame.mount(doc(&["cat cat"]));
        session.on_document_replaced(start + ms(400), &frame);
        frame.finish_load();
        session.on_document_loaded(start + ms(400), &frame);
        session.close(&mut frame);

        assert!(!session.tick(start + ms(500), &mut frame));
        assert_eq!(marker_total(&frame), 0);
    }

    #[test]
    fn test_close_keeps_case_preference() {
        let start = Instant::now();
        let mut frame = loaded(&["cat"]);
        let mut session = SearchSession::default();
        session.set_case_sensitive(true, start, &mut frame);
        session.open(&mut frame);
        session.close(&mut frame);
        assert!(session.case_sensitive());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backend assist tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_assist_failure_falls_back_to_local() {
        let start = Instant::now();
        let mut frame = loaded(&["The cat sat."]);
        let mut session = SearchSession::default().with_assist(Box::new(FailingAssist));
        session.open(&mut frame);
        session.set_query("cat", start);
        session.tick(start + ms(300), &mut frame);

        assert_eq!(session.status().label, "1 of 1");
        assert!(session.assist_result().is_none());
        assert!(session.navigate(Direction::Next, start + ms(400), &mut frame));
    }

    #[test]
    fn test_assist_results_are_advisory() {
        let start = Instant::now();
        let source = "The cat sat.\n\n```\ncat file\n```\n";
        let mut assist = SourceSearchAssist::new();
        assist.document_changed(source);

        let mut frame = loaded(&["The cat sat."]);
        let mut session = SearchSession::default().with_assist(Box::new(assist));
        session.open(&mut frame);
        session.set_query("cat", start);
        session.tick(start + ms(300), &mut frame);

        let assisted = session.assist_result().map(|r| r.total);
        assert_eq!(assisted, Some(2));
        assert_eq!(session.status().total, 1);
    }
}
