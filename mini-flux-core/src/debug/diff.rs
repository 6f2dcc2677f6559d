//! Field-level differences between two debug-state renderings

use std::fmt;

use super::state::DebugSection;

/// One changed field, addressed as `section.key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub path: String,
    /// `None` when the field only exists in the new state
    pub old: Option<String>,
    /// `None` when the field disappeared
    pub new: Option<String>,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}=({} ~> {})",
            self.path,
            self.old.as_deref().unwrap_or("∅"),
            self.new.as_deref().unwrap_or("∅")
        )
    }
}

/// Compare two renderings entry by entry
///
/// Sections match by title and entries by key. The result keeps the order
/// of `new`, followed by entries that only exist in `old`.
pub fn diff_sections(old: &[DebugSection], new: &[DebugSection]) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();

    for section in new {
        let previous = old.iter().find(|s| s.title == section.title);
        for entry in &section.entries {
            let before = previous.and_then(|s| s.get(&entry.key));
            if before != Some(entry.value.as_str()) {
                diffs.push(FieldDiff {
                    path: path(&section.title, &entry.key),
                    old: before.map(str::to_owned),
                    new: Some(entry.value.clone()),
                });
            }
        }
    }

    for section in old {
        let current = new.iter().find(|s| s.title == section.title);
        for entry in &section.entries {
            if current.and_then(|s| s.get(&entry.key)).is_none() {
                diffs.push(FieldDiff {
                    path: path(&section.title, &entry.key),
                    old: Some(entry.value.clone()),
                    new: None,
                });
            }
        }
    }

    diffs
}

/// Join diffs the way the logger prints them
pub fn format_diffs(diffs: &[FieldDiff]) -> String {
    diffs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn path(title: &str, key: &str) -> String {
    if title.is_empty() {
        key.to_string()
    } else {
        format!("{title}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str, entries: &[(&str, &str)]) -> DebugSection {
        entries
            .iter()
            .fold(DebugSection::new(title), |s, (k, v)| s.entry(*k, *v))
    }

    #[test]
    fn test_identical_sections_have_no_diff() {
        let a = vec![section("Persons", &[("count", "2"), ("task", "Idle")])];
        assert!(diff_sections(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_changed_value() {
        let old = vec![section("Persons", &[("count", "2"), ("task", "Idle")])];
        let new = vec![section("Persons", &[("count", "2"), ("task", "Running")])];

        let diffs = diff_sections(&old, &new);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].to_string(), "Persons.task=(Idle ~> Running)");
    }

    #[test]
    fn test_added_and_removed_entries() {
        let old = vec![section("A", &[("gone", "1")])];
        let new = vec![section("A", &[("fresh", "2")])];

        let diffs = diff_sections(&old, &new);
        assert_eq!(
            format_diffs(&diffs),
            "A.fresh=(∅ ~> 2), A.gone=(1 ~> ∅)"
        );
    }

    #[test]
    fn test_untitled_section_path() {
        let old = vec![section("", &[("x", "1")])];
        let new = vec![section("", &[("x", "2")])];
        assert_eq!(diff_sections(&old, &new)[0].path, "x");
    }
}
