use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::io::store::TrackerStore;
use crate::model::config::QueryConfig;
use crate::model::event::StoreEvent;
use crate::model::filter::{Filter, FilterType};
use crate::model::tracker::TrackerId;
use crate::ops::notifier::{ChangeNotifier, Notification, diff_sections};
use crate::ops::predicate;
use crate::ops::query::{self, IndexPath, QueryPlan, Section, TrackerView};
use crate::ops::schedule_match::is_active;
use crate::util::clock::Clock;

/// A live, sectioned view of the store for one filter.
///
/// The engine keeps the last executed section list. Store events are picked
/// up by [`process_changes`](Self::process_changes), which re-executes the
/// query and records a row-level diff; changing the filter, search or pinned
/// scope re-executes and notifies a full reload. Notifications reach
/// subscribers on [`flush`](Self::flush), so several changes processed
/// between flushes arrive as one coalesced diff.
pub struct QueryEngine {
    config: QueryConfig,
    clock: Box<dyn Clock>,
    filter: Filter,
    search: Option<String>,
    pinned_only: Option<bool>,
    plan: QueryPlan,
    sections: Vec<Section>,
    events: Receiver<StoreEvent>,
    notifier: ChangeNotifier,
}

impl QueryEngine {
    pub fn new(
        store: &mut TrackerStore,
        filter: Filter,
        config: QueryConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        let events = store.subscribe();
        let today = clock.today();
        let filter = Filter::new(filter.date, filter.kind, today);
        let plan = build_plan(&config, &filter, None, None);
        let sections = query::execute(store.dataset(), &plan, filter.date, today);
        QueryEngine {
            config,
            clock,
            filter,
            search: None,
            pinned_only: None,
            plan,
            sections,
            events,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn pinned_only(&self) -> Option<bool> {
        self.pinned_only
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // -----------------------------------------------------------------------
    // Scope changes (each one is a reload)
    // -----------------------------------------------------------------------

    pub fn set_filter(&mut self, store: &TrackerStore, filter: Filter) {
        self.filter = Filter::new(filter.date, filter.kind, self.clock.today());
        self.reload(store);
    }

    pub fn set_date(&mut self, store: &TrackerStore, date: NaiveDate) {
        self.filter.set_date(date, self.clock.today());
        self.reload(store);
    }

    pub fn set_filter_type(&mut self, store: &TrackerStore, kind: FilterType) {
        self.filter.set_kind(kind, self.clock.today());
        self.reload(store);
    }

    /// Set or clear the title search. Blank text clears it.
    pub fn set_search(&mut self, store: &TrackerStore, text: Option<&str>) {
        self.search = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        self.reload(store);
    }

    /// Restrict the category sections by pin state. `Some(true)` lists only
    /// pinned trackers and drops the separate pinned section.
    pub fn set_pinned_only(&mut self, store: &TrackerStore, pinned: Option<bool>) {
        self.pinned_only = pinned;
        self.reload(store);
    }

    fn reload(&mut self, store: &TrackerStore) {
        self.rebuild(store);
        self.notifier.request_reload();
        self.notifier.flush();
    }

    fn rebuild(&mut self, store: &TrackerStore) {
        // Queued store events are covered by the fresh execution
        let dropped = self.events.try_iter().count();
        self.plan = build_plan(
            &self.config,
            &self.filter,
            self.search.as_deref(),
            self.pinned_only,
        );
        self.sections = self.execute(store);
        debug!(
            date = %self.filter.date,
            kind = self.filter.kind.key(),
            search = self.search.as_deref().unwrap_or(""),
            sections = self.sections.len(),
            dropped,
            "query reloaded"
        );
    }

    // -----------------------------------------------------------------------
    // Reading the result
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self) -> Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn query_sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Rows in a section; zero for an out-of-range index
    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, |s| s.items.len())
    }

    pub fn find_item(&self, path: IndexPath) -> Option<&TrackerView> {
        self.sections.get(path.section)?.items.get(path.row)
    }

    /// A tracker evaluated for the current filter date, whether or not it
    /// is visible under the filter
    pub fn find_by_id(&self, store: &TrackerStore, id: TrackerId) -> Option<TrackerView> {
        store
            .find(id)
            .map(|t| TrackerView::new(t, self.filter.date, self.clock.today()))
    }

    /// Whether any tracker is scheduled on the filter date. Used to decide
    /// whether offering filter choices makes sense at all.
    pub fn has_trackers_on_date(&self, store: &TrackerStore) -> bool {
        store
            .dataset()
            .trackers
            .iter()
            .any(|t| is_active(&t.schedule, self.filter.date))
    }

    // -----------------------------------------------------------------------
    // Change tracking
    // -----------------------------------------------------------------------

    /// Consume queued store events, re-execute, and record the diff.
    /// Returns whether events were consumed or the day moved.
    ///
    /// A `Today` filter that no longer matches the clock moves to the new
    /// day; that is a scope change, so a reload is recorded instead.
    pub fn process_changes(&mut self, store: &TrackerStore) -> bool {
        let current = Filter::new(self.filter.date, self.filter.kind, self.clock.today());
        if current != self.filter {
            debug!(from = %self.filter.date, to = %current.date, "day changed");
            self.filter = current;
            self.rebuild(store);
            self.notifier.request_reload();
            return true;
        }

        let events: Vec<StoreEvent> = self.events.try_iter().collect();
        if events.is_empty() {
            return false;
        }

        let mut affected: HashSet<TrackerId> = HashSet::new();
        for event in &events {
            trace!(?event, "store event");
            match event {
                StoreEvent::CategoryRenamed { to, .. } => {
                    affected.extend(store.dataset().trackers_in(to).map(|t| t.id));
                }
                other => affected.extend(other.tracker_id()),
            }
        }

        let sections = self.execute(store);
        let diff = diff_sections(&self.sections, &sections, &affected);
        debug!(
            events = events.len(),
            inserted = diff.inserted.len(),
            deleted = diff.deleted.len(),
            updated = diff.updated.len(),
            "changes processed"
        );
        self.sections = sections;
        self.notifier.record(diff);
        true
    }

    /// Whether a notification is waiting for the next flush
    pub fn has_pending(&self) -> bool {
        self.notifier.has_pending()
    }

    /// Deliver the pending notification to subscribers
    pub fn flush(&mut self) -> Option<Notification> {
        self.notifier.flush()
    }

    fn execute(&self, store: &TrackerStore) -> Vec<Section> {
        query::execute(
            store.dataset(),
            &self.plan,
            self.filter.date,
            self.clock.today(),
        )
    }
}

/// Conditions for the category sections and the pinned section.
///
/// The category sections take the type condition, the search, and the
/// pinned scope (or `pinned = false` when pinned trackers are configured to
/// show only once). The pinned section takes the type condition and the
/// search only when configured to.
fn build_plan(
    config: &QueryConfig,
    filter: &Filter,
    search: Option<&str>,
    pinned_only: Option<bool>,
) -> QueryPlan {
    let main_pinned = pinned_only.or(config.exclude_pinned_from_categories.then_some(false));
    let main = predicate::build(filter, search, main_pinned);

    let pinned = if pinned_only == Some(true) {
        None
    } else {
        let search = if config.search_pinned { search } else { None };
        Some(predicate::build(filter, search, Some(true)))
    };

    QueryPlan {
        main,
        pinned,
        pinned_title: config.pinned_title.clone(),
    }
}
