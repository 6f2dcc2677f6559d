//! Debug state introspection trait
//!
//! State types expose their contents as titled sections of key/value
//! entries. The logger interceptor diffs these sections between snapshots.

/// A debug entry (key-value pair)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    pub key: String,
    pub value: String,
}

impl DebugEntry {
    /// Create a new entry
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A debug section with a title and entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSection {
    pub title: String,
    pub entries: Vec<DebugEntry>,
}

impl DebugSection {
    /// Create a new section
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    /// Add an entry to the section
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push(DebugEntry::new(key, value));
        self
    }

    /// Add an entry (mutable)
    pub fn push_entry(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(DebugEntry::new(key, value));
    }

    /// Value of the entry with `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }
}

/// Trait for types that can provide debug state information
///
/// Usually derived with `#[derive(DebugState)]`.
///
/// # Example
///
/// ```
/// use mini_flux_core::debug::{DebugSection, DebugState};
///
/// struct SessionState {
///     user: String,
///     logged_in: bool,
/// }
///
/// impl DebugState for SessionState {
///     fn debug_sections(&self) -> Vec<DebugSection> {
///         vec![DebugSection::new("Session")
///             .entry("user", &self.user)
///             .entry("logged_in", self.logged_in.to_string())]
///     }
/// }
///
/// let state = SessionState { user: "ana".into(), logged_in: true };
/// assert_eq!(state.debug_sections()[0].get("user"), Some("ana"));
/// ```
pub trait DebugState {
    /// Return state as sections with key-value pairs
    fn debug_sections(&self) -> Vec<DebugSection>;

    /// Render every section as `Title { key: value, ... }` lines
    fn debug_text(&self) -> String {
        self.debug_sections()
            .iter()
            .map(|section| {
                let entries: Vec<String> = section
                    .entries
                    .iter()
                    .map(|entry| format!("{}: {}", entry.key, entry.value))
                    .collect();
                format!("{} {{ {} }}", section.title, entries.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fallback rendering through the `Debug` implementation
impl<T: std::fmt::Debug> DebugState for DebugWrapper<'_, T> {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![DebugSection::new("Debug Output").entry("value", format!("{:?}", self.0))]
    }
}

/// Wrapper to use Debug impl as DebugState
///
/// ```
/// use mini_flux_core::debug::{DebugState, DebugWrapper};
///
/// #[derive(Debug)]
/// struct Plain { x: i32 }
///
/// let sections = DebugWrapper(&Plain { x: 42 }).debug_sections();
/// assert!(sections[0].entries[0].value.contains("42"));
/// ```
pub struct DebugWrapper<'a, T>(pub &'a T);

/// Implementation for unit type (no state to show)
impl DebugState for () {
    fn debug_sections(&self) -> Vec<DebugSection> {
        vec![]
    }
}

impl<A: DebugState, B: DebugState> DebugState for (A, B) {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = self.0.debug_sections();
        sections.extend(self.1.debug_sections());
        sections
    }
}

impl<T: DebugState + ?Sized> DebugState for &T {
    fn debug_sections(&self) -> Vec<DebugSection> {
        (**self).debug_sections()
    }
}

impl<T: DebugState + ?Sized> DebugState for std::sync::Arc<T> {
    fn debug_sections(&self) -> Vec<DebugSection> {
        (**self).debug_sections()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct QueueState {
        pending: Vec<u32>,
        paused: bool,
    }

    impl DebugState for QueueState {
        fn debug_sections(&self) -> Vec<DebugSection> {
            vec![DebugSection::new("Queue")
                .entry("pending", self.pending.len().to_string())
                .entry("paused", self.paused.to_string())]
        }
    }

    fn queue() -> QueueState {
        QueueState {
            pending: vec![3, 1],
            paused: false,
        }
    }

    #[test]
    fn test_section_lookup() {
        let sections = queue().debug_sections();
        assert_eq!(sections[0].get("pending"), Some("2"));
        assert_eq!(sections[0].get("paused"), Some("false"));
        assert_eq!(sections[0].get("workers"), None);
    }

    #[test]
    fn test_debug_text_lines() {
        assert_eq!(queue().debug_text(), "Queue { pending: 2, paused: false }");
        assert_eq!(().debug_text(), "");

        let pair = (queue(), DebugWrapper(&7u8));
        assert_eq!(
            pair.debug_text(),
            "Queue { pending: 2, paused: false }\nDebug Output { value: 7 }"
        );
    }

    #[test]
    fn test_shared_state_delegates() {
        let shared = Arc::new(queue());
        assert_eq!(shared.debug_sections(), queue().debug_sections());
        assert_eq!((&shared).debug_text(), shared.debug_text());
    }
}
