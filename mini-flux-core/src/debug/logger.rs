//! Action logging interceptor with per-store state diffs
//!
//! [`LoggerInterceptor`] sits in the dispatcher chain. For every action it
//! records timing, lets the action proceed, then compares each store's
//! snapshot with the one seen before the action. Stores whose state
//! changed are reported with a field-level diff of their [`DebugState`]
//! sections.
//!
//! # Example
//!
//! ```ignore
//! use mini_flux::debug::{LoggerConfig, LoggerInterceptor};
//!
//! // Log everything except Tick*, keep the last 50 entries in memory
//! let config = LoggerConfig::new(None, Some("Tick*")).with_capacity(50);
//! let logger = Arc::new(LoggerInterceptor::new(stores.clone(), config));
//! dispatcher.add_interceptor(logger.clone());
//!
//! for entry in logger.recent(10) {
//!     println!("{} {}", entry.name, entry.summary);
//! }
//! ```
//!
//! [`DebugState`]: super::DebugState

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;

use super::diff::{diff_sections, format_diffs, FieldDiff};
use crate::action::{ActionRef, Silent};
use crate::interceptor::{Chain, Interceptor};
use crate::store::{AnyStore, StoreSnapshot};

/// Target used for every logger record
pub const LOG_TARGET: &str = "mini_flux::logger";

/// Cap for the reported time since the previous action
const MAX_SINCE_LAST: Duration = Duration::from_millis(9999);

/// Configuration for action logging with glob pattern filtering.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// Filtered-out actions still refresh the store snapshots, they are just
/// not reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude: Vec<String>,
    /// Report field diffs; when false the whole new state is printed
    pub diff: bool,
    /// Entries kept in memory, 0 disables the in-memory log
    pub capacity: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            diff: true,
            capacity: 100,
        }
    }
}

impl LoggerConfig {
    /// Create a new config from comma-separated pattern strings
    ///
    /// ```
    /// use mini_flux_core::debug::LoggerConfig;
    ///
    /// let config = LoggerConfig::new(Some("Load*,Delete*"), Some("LoadMore"));
    /// assert!(config.should_log("LoadPersons"));
    /// assert!(config.should_log("DeletePerson"));
    /// assert!(!config.should_log("LoadMore"));
    /// assert!(!config.should_log("UpdateFilter"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include.map(split_patterns).unwrap_or_default(),
            exclude: exclude.map(split_patterns).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Create a config with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include,
            exclude,
            ..Self::default()
        }
    }

    pub fn with_diff(mut self, diff: bool) -> Self {
        self.diff = diff;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Check if an action name should be logged based on include/exclude patterns
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| glob_match(p, action_name)) {
            return false;
        }
        !self.exclude.iter().any(|p| glob_match(p, action_name))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// What a store reported after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Field-level differences
    Diff(Vec<FieldDiff>),
    /// Full rendering of the new state
    Full(String),
}

impl std::fmt::Display for StoreChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreChange::Diff(diffs) => f.write_str(&format_diffs(diffs)),
            StoreChange::Full(text) => f.write_str(text),
        }
    }
}

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    /// Action name (from Action::name())
    pub name: &'static str,
    /// Debug rendering of the action
    pub summary: String,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Time spent in the rest of the chain
    pub process_time: Duration,
    /// Time since the previous action, capped at ~10s
    pub since_last: Duration,
    /// Stores whose state instance changed, with what changed
    pub changes: Vec<(&'static str, StoreChange)>,
    pub timestamp: Instant,
}

impl ActionLogEntry {
    /// Multi-line report as written to the log
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("┌────────────────────────────────────────────\n");
        out.push_str(&format!(
            "├─> {} {}ms [+{}ms][{}] - {}\n",
            self.name,
            self.process_time.as_millis(),
            self.since_last.as_millis(),
            self.sequence % 10,
            self.summary
        ));
        for (store, change) in &self.changes {
            out.push_str(&format!("│   {store}: {change}\n"));
        }
        out.push_str("└────────────────────────────────────────────");
        out
    }

    /// Whether any store changed
    pub fn state_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// In-memory ring buffer for storing recent actions
///
/// Older entries are discarded when capacity is reached.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    capacity: usize,
}

impl ActionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Store an entry, evicting the oldest when full
    pub fn push(&mut self, entry: ActionLogEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

struct LoggerInner {
    /// Snapshot per store, taken lazily on the first action
    states: Option<Vec<StoreSnapshot>>,
    last_action: Option<Instant>,
    counter: u64,
    log: ActionLog,
}

/// Interceptor that logs every action with the state changes it caused
pub struct LoggerInterceptor {
    stores: Vec<Arc<dyn AnyStore>>,
    config: LoggerConfig,
    inner: Mutex<LoggerInner>,
}

impl std::fmt::Debug for LoggerInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerInterceptor")
            .field("stores", &self.stores.len())
            .field("config", &self.config)
            .field("counter", &self.inner.lock().counter)
            .finish()
    }
}

impl LoggerInterceptor {
    pub fn new(stores: Vec<Arc<dyn AnyStore>>, config: LoggerConfig) -> Self {
        let log = ActionLog::new(config.capacity);
        Self {
            stores,
            config,
            inner: Mutex::new(LoggerInner {
                states: None,
                last_action: None,
                counter: 0,
                log,
            }),
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Actions seen so far, logged or not
    pub fn action_count(&self) -> u64 {
        self.inner.lock().counter
    }

    /// Most recent logged entries, newest first
    pub fn recent(&self, count: usize) -> Vec<ActionLogEntry> {
        self.inner.lock().log.recent(count).cloned().collect()
    }

    /// Copy of the in-memory log
    pub fn log(&self) -> ActionLog {
        self.inner.lock().log.clone()
    }

    fn snapshots(&self) -> Vec<StoreSnapshot> {
        self.stores.iter().map(|store| store.snapshot()).collect()
    }

    fn describe(&self, old: &StoreSnapshot, new: &StoreSnapshot) -> StoreChange {
        if self.config.diff {
            StoreChange::Diff(diff_sections(&old.sections(), &new.sections()))
        } else {
            let text = new.text().replace('\n', " ");
            StoreChange::Full(text)
        }
    }
}

impl Interceptor for LoggerInterceptor {
    fn intercept(&self, action: ActionRef, chain: &dyn Chain) -> ActionRef {
        let (sequence, since_last) = {
            let mut inner = self.inner.lock();
            if inner.states.is_none() {
                inner.states = Some(self.snapshots());
            }
            let now = Instant::now();
            let since_last = inner
                .last_action
                .map(|last| now.duration_since(last).min(MAX_SINCE_LAST))
                .unwrap_or_default();
            inner.last_action = Some(now);
            inner.counter += 1;
            (inner.counter, since_last)
        };

        let start = Instant::now();
        let out = chain.proceed(action.clone());
        let process_time = start.elapsed();

        let current = self.snapshots();
        let previous = self.inner.lock().states.replace(current.clone());

        let reported = !action.has_tag::<Silent>() && self.config.should_log(action.name());
        if !reported {
            return out;
        }

        let changes: Vec<(&'static str, StoreChange)> = self
            .stores
            .iter()
            .zip(previous.unwrap_or_default().iter().zip(current.iter()))
            .filter(|(_, (old, new))| !old.same_as(new))
            .map(|(store, (old, new))| (store.name(), self.describe(old, new)))
            .collect();

        let entry = ActionLogEntry {
            name: action.name(),
            summary: format!("{action:?}"),
            sequence,
            process_time,
            since_last,
            changes,
            timestamp: start,
        };
        tracing::info!(
            target: LOG_TARGET,
            action = entry.name,
            seq = entry.sequence,
            process_ms = entry.process_time.as_millis() as u64,
            changed = entry.changes.len(),
            "\n{}",
            entry.render()
        );
        self.inner.lock().log.push(entry);
        out
    }
}

/// Matches an action name against a pattern where `*` spans any run of
/// characters and `?` stands for exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    matches_from(&pattern, &text)
}

fn matches_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', rest)) => {
            let rest = trim_stars(rest);
            if rest.is_empty() {
                return true;
            }
            (0..=text.len()).any(|skip| matches_from(rest, &text[skip..]))
        }
        Some((&head, rest)) => match text.split_first() {
            Some((&c, tail)) if head == '?' || head == c => matches_from(rest, tail),
            _ => false,
        },
    }
}

fn trim_stars(pattern: &[char]) -> &[char] {
    let start = pattern.iter().position(|&c| c != '*').unwrap_or(pattern.len());
    &pattern[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Tags};
    use crate::debug::{DebugSection, DebugState};
    use crate::dispatcher::Dispatcher;
    use crate::store::{init_stores, Store, StoreState};
    use crate::ui::UiContext;
    use std::any::Any;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("Load*", "LoadPersons"));
        assert!(glob_match("*Person*", "TogglePersonFav"));
        assert!(glob_match("Tick?", "Ticks"));
        assert!(!glob_match("Tick?", "Tick"));
        assert!(!glob_match("Load*", "Unload"));
        assert!(glob_match("Delete", "Delete"));
    }

    #[test]
    fn test_glob_star_runs_and_edges() {
        assert!(glob_match("*", ""));
        assert!(glob_match("**Load**", "LoadPersons"));
        assert!(glob_match("On*Action", "OnLifecycleAction"));
        assert!(glob_match("*Action", "OnActionAction"));
        assert!(!glob_match("On*Action", "OnLifecycleActions"));
        assert!(glob_match("?ay*", "Daylight"));
        assert!(!glob_match("", "Load"));
        assert!(glob_match("Ünï?", "Ünïx"));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = LoggerConfig::new(Some("Persons*"), Some("PersonsFail*"));
        assert!(config.should_log("PersonsLoaded"));
        assert!(!config.should_log("PersonsFailed"));
        assert!(!config.should_log("UpdateFilter"));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = LoggerConfig::from_json(r#"{"exclude": ["OnTrim*"], "diff": false}"#).unwrap();
        assert_eq!(config.exclude, vec!["OnTrim*".to_string()]);
        assert!(config.include.is_empty());
        assert!(!config.diff);
        assert_eq!(config.capacity, 100);
    }

    #[test]
    fn test_action_log_capacity() {
        let mut log = ActionLog::new(2);
        for sequence in 0..3 {
            log.push(ActionLogEntry {
                name: "A",
                summary: String::new(),
                sequence,
                process_time: Duration::ZERO,
                since_last: Duration::ZERO,
                changes: Vec::new(),
                timestamp: Instant::now(),
            });
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().next().unwrap().sequence, 1);
        assert_eq!(log.recent(1).next().unwrap().sequence, 2);

        let mut disabled = ActionLog::new(0);
        disabled.push(log.entries().next().unwrap().clone());
        assert!(disabled.is_empty());
    }

    #[derive(Debug, Default)]
    struct NameState {
        name: String,
        visits: u32,
    }

    impl DebugState for NameState {
        fn debug_sections(&self) -> Vec<DebugSection> {
            vec![DebugSection::new("Name")
                .entry("name", &self.name)
                .entry("visits", self.visits.to_string())]
        }
    }

    #[derive(Debug)]
    struct Rename(&'static str);

    #[derive(Debug)]
    struct Ping;

    #[derive(Debug)]
    struct Touch;

    macro_rules! impl_action {
        ($ty:ty, $name:literal $(, $marker:ty)*) => {
            impl Action for $ty {
                fn name(&self) -> &'static str {
                    $name
                }

                fn tags(&self) -> Tags {
                    Tags::of::<Self>()$(.with::<$marker>())*
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        };
    }

    impl_action!(Rename, "Rename");
    impl_action!(Ping, "Ping", Silent);
    impl_action!(Touch, "Touch");

    struct NameStore {
        state: StoreState<NameState>,
    }

    impl Store for NameStore {
        type State = NameState;

        fn state_holder(&self) -> &StoreState<NameState> {
            &self.state
        }

        fn init(self: &Arc<Self>) {
            self.subscribe(|store: &Self, action: &Rename| {
                store.state.update(|s| NameState {
                    name: action.0.to_string(),
                    visits: s.visits,
                });
            });
            self.subscribe(|store: &Self, _: &Ping| {
                store.state.update(|s| NameState {
                    name: s.name.clone(),
                    visits: s.visits + 1,
                });
            });
        }
    }

    fn setup(config: LoggerConfig) -> (Dispatcher, Arc<LoggerInterceptor>, crate::ui::UiLoop) {
        let (ui, ui_loop) = UiContext::current();
        let dispatcher = Dispatcher::new(ui);
        let store = Arc::new(NameStore {
            state: StoreState::with_default(&dispatcher),
        });
        let stores: Vec<Arc<dyn AnyStore>> = vec![store];
        init_stores(&stores);
        let logger = Arc::new(LoggerInterceptor::new(stores, config));
        dispatcher.add_interceptor(logger.clone());
        (dispatcher, logger, ui_loop)
    }

    #[test]
    fn test_logs_diff_of_changed_store() {
        let (dispatcher, logger, _ui_loop) = setup(LoggerConfig::default());

        dispatcher.dispatch(Rename("ana"));

        let entries = logger.recent(10);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "Rename");
        assert_eq!(entry.sequence, 1);
        assert_eq!(entry.changes.len(), 1);
        assert_eq!(entry.changes[0].0, "NameStore");
        assert_eq!(entry.changes[0].1.to_string(), "Name.name=( ~> ana)");
        assert!(entry.render().contains("├─> Rename"));
    }

    #[test]
    fn test_unchanged_state_reports_no_store() {
        let (dispatcher, logger, _ui_loop) = setup(LoggerConfig::default());

        dispatcher.dispatch(Touch);

        let entries = logger.recent(1);
        assert!(!entries[0].state_changed());
    }

    #[test]
    fn test_silent_actions_only_refresh_snapshots() {
        let (dispatcher, logger, _ui_loop) = setup(LoggerConfig::default());

        dispatcher.dispatch(Ping);
        assert!(logger.log().is_empty());
        assert_eq!(logger.action_count(), 1);

        // The silent change is not reported again on the next action
        dispatcher.dispatch(Rename("bo"));
        let entry = &logger.recent(1)[0];
        assert_eq!(entry.changes[0].1.to_string(), "Name.name=( ~> bo)");
    }

    #[test]
    fn test_filtered_actions_are_counted_not_logged() {
        let (dispatcher, logger, _ui_loop) = setup(LoggerConfig::new(None, Some("Ren*")));

        dispatcher.dispatch(Rename("x"));
        dispatcher.dispatch(Touch);

        assert_eq!(logger.action_count(), 2);
        let names: Vec<_> = logger.log().entries().map(|e| e.name).collect();
        assert_eq!(names, vec!["Touch"]);
    }

    #[test]
    fn test_full_state_without_diff() {
        let (dispatcher, logger, _ui_loop) = setup(LoggerConfig::default().with_diff(false));

        dispatcher.dispatch(Rename("cy"));

        let entry = &logger.recent(1)[0];
        assert_eq!(
            entry.changes[0].1,
            StoreChange::Full("Name { name: cy, visits: 0 }".to_string())
        );
    }
}
