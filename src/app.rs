//! Application state (the view-model).
//!
//! [`App`] owns everything the UI shows.  User actions mutate it and queue
//! [`Request`]s; [`App::take_requests`] hands those to the worker and
//! [`App::apply`] folds the resulting [`Outcome`]s back in.  Nothing in here
//! performs I/O, so every behaviour is testable without a server.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;

use crate::api::{Article, CollectRunResult, Health, Source, SourceCollectResult, Tag};
use crate::filters::{DateBound, DatePrompt, FilterCriteria};
use crate::form::{SourceForm, SourceSubmission};
use crate::probe::ProbeReport;
use crate::worker::{Outcome, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Articles,
    Sources,
}

/// A server-owned collection plus its loading and error state.
#[derive(Debug)]
pub struct Remote<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

impl<T> Remote<T> {
    fn begin(&mut self) {
        self.loading = true;
    }

    /// Replace the items on success; on failure keep them and record the
    /// error.  Returns whether new items arrived.
    fn settle<E: std::fmt::Display>(&mut self, result: Result<Vec<T>, E>) -> bool {
        self.loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.error = None;
                true
            }
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }
}

/// Async action state for one row (e.g. one source).
#[derive(Debug, Clone, PartialEq)]
pub struct RowState<T> {
    pub in_flight: bool,
    pub last: Option<Result<T, String>>,
}

impl<T> Default for RowState<T> {
    fn default() -> Self {
        Self {
            in_flight: false,
            last: None,
        }
    }
}

/// State of the "collect everything" action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectState {
    pub running: bool,
    pub result: Option<CollectRunResult>,
    pub error: Option<String>,
    /// `result` came from the server's record of an earlier run rather than
    /// from a run started here.
    pub from_history: bool,
}

pub struct App {
    pub tab: Tab,
    pub filters: FilterCriteria,

    pub articles: Remote<Article>,
    pub sources: Remote<Source>,
    pub tags: Remote<Tag>,
    pub health: Option<Result<Health, String>>,

    /// Selection state for scrolling.
    pub article_list: ListState,
    pub source_list: ListState,

    pub form: Option<SourceForm>,
    /// Source awaiting delete confirmation.
    pub pending_delete: Option<i64>,
    pub date_prompt: Option<DatePrompt>,
    pub show_detail: bool,

    pub collect: CollectState,
    pub source_runs: HashMap<i64, RowState<SourceCollectResult>>,
    pub probes: HashMap<i64, RowState<ProbeReport>>,

    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,

    article_seq: u64,
    /// Bumped each time a source form opens; saves carry it back.
    form_seq: u64,
    refetch_at: Option<Instant>,
    debounce: Duration,
    outbox: Vec<Request>,
}

impl App {
    pub fn new(page_size: u32, debounce: Duration) -> Self {
        Self {
            tab: Tab::Articles,
            filters: FilterCriteria::new(page_size),
            articles: Remote::default(),
            sources: Remote::default(),
            tags: Remote::default(),
            health: None,
            article_list: ListState::default(),
            source_list: ListState::default(),
            form: None,
            pending_delete: None,
            date_prompt: None,
            show_detail: false,
            collect: CollectState::default(),
            source_runs: HashMap::new(),
            probes: HashMap::new(),
            quit: false,
            status: "Connecting…".into(),
            article_seq: 0,
            form_seq: 0,
            refetch_at: None,
            debounce,
            outbox: Vec::new(),
        }
    }

    /// Queue the initial loads.
    pub fn start(&mut self) {
        self.request(Request::Health);
        self.load_sources();
        self.load_tags();
        self.request(Request::CollectStatus);
        self.fetch_articles();
    }

    pub fn refresh_all(&mut self) {
        self.request(Request::Health);
        self.load_sources();
        self.load_tags();
        self.fetch_articles();
        self.status = "Refreshing…".into();
    }

    /// Drain the requests queued since the last call.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    fn request(&mut self, request: Request) {
        self.outbox.push(request);
    }

    // -- reads ---------------------------------------------------------------

    /// Issue an article read for the current filters right away.
    pub fn fetch_articles(&mut self) {
        self.refetch_at = None;
        self.article_seq += 1;
        self.articles.begin();
        self.request(Request::Articles {
            seq: self.article_seq,
            query: self.filters.to_query(),
        });
    }

    pub fn load_sources(&mut self) {
        self.sources.begin();
        self.request(Request::Sources);
    }

    pub fn load_tags(&mut self) {
        self.tags.begin();
        self.request(Request::Tags);
    }

    /// Debounced article read: pushes the deadline out on every call.
    fn schedule_articles(&mut self, now: Instant) {
        self.refetch_at = Some(now + self.debounce);
    }

    pub fn refetch_pending(&self) -> bool {
        self.refetch_at.is_some()
    }

    /// Fire the debounced article read once its deadline has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.refetch_at.is_some_and(|due| now >= due) {
            self.fetch_articles();
        }
    }

    // -- filters -------------------------------------------------------------

    /// Step the source filter through "all" and every loaded source.
    pub fn cycle_source_filter(&mut self, now: Instant) {
        let ids: Vec<i64> = self.sources.items.iter().map(|s| s.id).collect();
        let next = next_in_cycle(&ids, self.filters.source_id());
        self.filters.set_source(next);
        self.schedule_articles(now);
    }

    /// Step the tag filter through "all" and every loaded tag.
    pub fn cycle_tag_filter(&mut self, now: Instant) {
        let ids: Vec<i64> = self.tags.items.iter().map(|t| t.id).collect();
        let next = next_in_cycle(&ids, self.filters.tag_id());
        self.filters.set_tag(next);
        self.schedule_articles(now);
    }

    pub fn clear_filters(&mut self, now: Instant) {
        self.filters.clear();
        self.schedule_articles(now);
    }

    pub fn grow_page(&mut self, now: Instant) {
        self.filters.grow_page();
        self.schedule_articles(now);
    }

    pub fn shrink_page(&mut self, now: Instant) {
        self.filters.shrink_page();
        self.schedule_articles(now);
    }

    /// Advance a page, unless the current page came back short.
    pub fn next_page(&mut self, now: Instant) {
        if (self.articles.items.len() as u32) < self.filters.limit() {
            self.status = "Already on the last page".into();
            return;
        }
        self.filters.next_page();
        self.schedule_articles(now);
    }

    pub fn previous_page(&mut self, now: Instant) {
        if self.filters.previous_page() {
            self.schedule_articles(now);
        }
    }

    pub fn open_date_prompt(&mut self, bound: DateBound) {
        let current = match bound {
            DateBound::From => self.filters.date_from(),
            DateBound::To => self.filters.date_to(),
        };
        self.date_prompt = Some(DatePrompt::new(bound, current));
    }

    pub fn submit_date_prompt(&mut self, now: Instant) {
        let Some(prompt) = self.date_prompt.as_mut() else {
            return;
        };
        match prompt.parse() {
            Ok(date) => {
                match prompt.bound {
                    DateBound::From => self.filters.set_date_from(date),
                    DateBound::To => self.filters.set_date_to(date),
                }
                self.date_prompt = None;
                self.schedule_articles(now);
            }
            Err(msg) => prompt.error = Some(msg),
        }
    }

    pub fn source_label(&self, id: i64) -> String {
        self.sources
            .items
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    pub fn tag_label(&self, id: i64) -> String {
        self.tags
            .items
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("#{id}"))
    }

    /// Display name of an article's source, resolved through the source
    /// list when the article does not carry one.
    pub fn article_source_name<'a>(&'a self, article: &'a Article) -> Option<&'a str> {
        article.source_name.as_deref().or_else(|| {
            let id = article.source_id?;
            self.sources
                .items
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.name.as_str())
        })
    }

    // -- navigation ----------------------------------------------------------

    pub fn switch_tab(&mut self) {
        self.tab = match self.tab {
            Tab::Articles => Tab::Sources,
            Tab::Sources => Tab::Articles,
        };
    }

    fn current_list(&mut self) -> (&mut ListState, usize) {
        match self.tab {
            Tab::Articles => (&mut self.article_list, self.articles.items.len()),
            Tab::Sources => (&mut self.source_list, self.sources.items.len()),
        }
    }

    pub fn select_next(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        let (state, len) = self.current_list();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        let (state, len) = self.current_list();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let (state, len) = self.current_list();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }

    pub fn selected_article(&self) -> Option<&Article> {
        self.article_list
            .selected()
            .and_then(|i| self.articles.items.get(i))
    }

    pub fn selected_source(&self) -> Option<&Source> {
        self.source_list
            .selected()
            .and_then(|i| self.sources.items.get(i))
    }

    pub fn open_detail(&mut self) {
        self.show_detail = self.selected_article().is_some();
    }

    // -- source mutations ----------------------------------------------------

    pub fn open_create_form(&mut self) {
        self.form_seq += 1;
        self.form = Some(SourceForm::create());
    }

    pub fn open_edit_form(&mut self) {
        if let Some(source) = self.selected_source() {
            let form = SourceForm::edit(source);
            self.form_seq += 1;
            self.form = Some(form);
        }
    }

    pub fn close_form(&mut self) {
        self.form = None;
    }

    /// Validate the form and queue a create or update.  Validation failures
    /// stay local: the message lands on the form and nothing is sent.
    pub fn submit_form(&mut self) {
        let form_id = self.form_seq;
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        let request = match form.submission() {
            Err(e) => {
                form.error = Some(e.to_string());
                return;
            }
            Ok(SourceSubmission::Create(draft)) => Request::CreateSource {
                form: form_id,
                draft,
            },
            Ok(SourceSubmission::Update { patch, .. }) if patch.is_empty() => {
                self.form = None;
                self.status = "No changes to save".into();
                return;
            }
            Ok(SourceSubmission::Update { id, patch }) => Request::UpdateSource {
                form: form_id,
                id,
                patch,
            },
        };
        form.error = None;
        form.submitting = true;
        self.request(request);
    }

    /// Ask for confirmation before deleting the selected source.
    pub fn request_delete(&mut self) {
        self.pending_delete = self.selected_source().map(|s| s.id);
    }

    pub fn confirm_delete(&mut self) {
        if let Some(id) = self.pending_delete.take() {
            self.status = format!("Deleting {}…", self.source_label(id));
            self.request(Request::DeleteSource(id));
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    // -- collection ----------------------------------------------------------

    pub fn collect_all(&mut self) {
        if self.collect.running {
            return;
        }
        self.collect.running = true;
        self.collect.error = None;
        self.status = "Collecting from all sources…".into();
        self.request(Request::CollectAll);
    }

    /// Trigger a collection for one source.  Ignored for sources that cannot
    /// be collected and for sources already being collected.
    pub fn collect_source(&mut self, id: i64) {
        let Some(source) = self.sources.items.iter().find(|s| s.id == id) else {
            return;
        };
        if !source.is_collectable() {
            self.status = format!("{} has no rss/api URL to collect", source.name);
            return;
        }
        let row = self.source_runs.entry(id).or_default();
        if row.in_flight {
            return;
        }
        row.in_flight = true;
        self.request(Request::CollectSource(id));
    }

    pub fn collect_selected_source(&mut self) {
        if let Some(id) = self.selected_source().map(|s| s.id) {
            self.collect_source(id);
        }
    }

    /// Test-fetch the selected source's feed locally.
    pub fn probe_selected_source(&mut self) {
        let Some(source) = self.selected_source() else {
            return;
        };
        let (Some(kind), Some(url)) = (source.feed_kind(), source.feed_url()) else {
            self.status = format!("{} has no rss/api URL to test", source.name);
            return;
        };
        let (source_id, url) = (source.id, url.to_string());

        let row = self.probes.entry(source_id).or_default();
        if row.in_flight {
            return;
        }
        row.in_flight = true;
        self.request(Request::Probe {
            source_id,
            kind,
            url,
        });
    }

    // -- outcomes ------------------------------------------------------------

    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Health(result) => {
                self.health = Some(result.map_err(|e| e.to_string()));
            }
            Outcome::Articles { seq, result } => {
                if seq != self.article_seq {
                    tracing::debug!(seq, latest = self.article_seq, "dropping stale article response");
                    return;
                }
                if self.articles.settle(result) {
                    let first = (!self.articles.items.is_empty()).then_some(0);
                    self.article_list.select(first);
                    self.status = format!("Loaded {} articles", self.articles.items.len());
                }
            }
            Outcome::Sources(result) => {
                if self.sources.settle(result) {
                    let len = self.sources.items.len();
                    let selected = match self.source_list.selected() {
                        _ if len == 0 => None,
                        Some(i) => Some(i.min(len - 1)),
                        None => Some(0),
                    };
                    self.source_list.select(selected);
                }
            }
            Outcome::Tags(result) => {
                self.tags.settle(result);
            }
            Outcome::CollectStatus(result) => {
                // A run started here takes precedence over the server's record.
                if let Ok(Some(last)) = result {
                    if !self.collect.running && self.collect.result.is_none() {
                        self.collect.result = Some(last);
                        self.collect.from_history = true;
                    }
                }
            }
            Outcome::SourceSaved {
                form,
                created,
                result,
            } => {
                // Only the form that sent the save may be closed or annotated.
                let owns_form = form == self.form_seq
                    && self.form.as_ref().is_some_and(|f| f.submitting);
                match result {
                    Ok(source) => {
                        if owns_form {
                            self.form = None;
                        }
                        let verb = if created { "Created" } else { "Updated" };
                        self.status = format!("{verb} source {}", source.name);
                        self.load_sources();
                    }
                    Err(e) => match self.form.as_mut() {
                        Some(open) if owns_form => {
                            open.submitting = false;
                            open.error = Some(e.to_string());
                        }
                        _ => self.status = format!("Saving source failed: {e}"),
                    },
                }
            }
            Outcome::SourceDeleted { id, result } => match result {
                Ok(()) => {
                    self.status = format!("Deleted source #{id}");
                    self.source_runs.remove(&id);
                    self.probes.remove(&id);
                    self.load_sources();
                    if self.filters.source_id() == Some(id) {
                        self.filters.set_source(None);
                        self.fetch_articles();
                    }
                }
                Err(e) => {
                    self.sources.error = Some(format!("Delete failed: {e}"));
                    self.status = format!("Could not delete source #{id}");
                }
            },
            Outcome::CollectFinished(result) => {
                self.collect.running = false;
                self.collect.from_history = false;
                match result {
                    Ok(run) => {
                        self.status = format!("Collection added {} articles", run.articles_added);
                        self.collect.result = Some(run);
                        self.collect.error = None;
                    }
                    Err(e) => {
                        self.collect.result = None;
                        self.collect.error = Some(e.to_string());
                        self.status = "Collection failed".into();
                    }
                }
                // Partial progress is possible even when the run failed.
                self.fetch_articles();
            }
            Outcome::SourceCollectFinished { id, result } => {
                let row = self.source_runs.entry(id).or_default();
                row.in_flight = false;
                row.last = Some(result.map_err(|e| e.to_string()));
                self.fetch_articles();
            }
            Outcome::Probed { source_id, result } => {
                let row = self.probes.entry(source_id).or_default();
                row.in_flight = false;
                row.last = Some(result.map_err(|e| e.to_string()));
            }
        }
    }
}

/// `None` → first id → … → last id → `None`.  An unknown current value
/// restarts at `None`.
fn next_in_cycle(ids: &[i64], current: Option<i64>) -> Option<i64> {
    match current {
        None => ids.first().copied(),
        Some(id) => ids
            .iter()
            .position(|&x| x == id)
            .and_then(|i| ids.get(i + 1).copied()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
