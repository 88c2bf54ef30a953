//! Section-by-section comparison of two schemas.
//!
//! Both schemas are flattened into one snapshot per section, keyed by the
//! chain of section names leading to it (`page > body > title`). A snapshot
//! holds the section's own fields, one per line, followed by the text leaves
//! that belong to it directly; nested sections get their own snapshot. The
//! snapshots are then matched by key and changed ones are diffed line by line.

use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::visitor::{walk, walk_section, SchemaVisitor};

/// Fields that hold nested schemas rather than section settings
const NESTED: [&str; 5] = ["content", "label", "placeholder", "message", "errorMessage"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSnapshot {
    pub key: String,
    pub lines: Vec<String>,
}

impl SectionSnapshot {
    fn text(&self) -> String {
        self.lines.iter().map(|line| format!("{line}\n")).collect()
    }
}

/// Builds one [`SectionSnapshot`] per section in compile order
#[derive(Debug, Default)]
struct SnapshotCollector {
    /// (schema path, index into `snapshots`) of the sections being walked
    stack: Vec<(String, usize)>,
    seen: HashMap<String, usize>,
    snapshots: Vec<SectionSnapshot>,
}

impl SchemaVisitor for SnapshotCollector {
    fn visit_section(&mut self, path: &str, name: &str, section: &Map<String, Value>) {
        let base = match self.stack.last() {
            Some((_, parent)) => format!("{} > {name}", self.snapshots[*parent].key),
            None => name.to_string(),
        };
        let count = self.seen.entry(base.clone()).or_default();
        *count += 1;
        let key = if *count == 1 { base } else { format!("{base} #{count}") };

        let lines = section
            .iter()
            .filter(|(field, _)| !NESTED.contains(&field.as_str()))
            .map(|(field, value)| format!("{field}: {value}"))
            .collect();
        self.stack.push((path.to_string(), self.snapshots.len()));
        self.snapshots.push(SectionSnapshot { key, lines });

        walk_section(self, path, name, section);

        self.stack.pop();
    }

    fn visit_text(&mut self, path: &str, value: &Value) {
        let Some((section_path, index)) = self.stack.last() else {
            return;
        };
        let field = path
            .strip_prefix(section_path.as_str())
            .unwrap_or(path)
            .trim_start_matches('/');
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.snapshots[*index].lines.push(format!("{field} = {text}"));
    }
}

/// Every section of `schema`, in compile order
pub fn snapshot_sections(schema: &Value) -> Vec<SectionSnapshot> {
    let mut collector = SnapshotCollector::default();
    walk(&mut collector, schema);
    collector.snapshots
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionChange {
    Added(SectionSnapshot),
    Removed(SectionSnapshot),
    Changed {
        key: String,
        /// Unified hunks of the section's lines
        hunks: String,
        added: usize,
        removed: usize,
    },
}

impl SectionChange {
    pub fn key(&self) -> &str {
        match self {
            SectionChange::Added(s) | SectionChange::Removed(s) => &s.key,
            SectionChange::Changed { key, .. } => key,
        }
    }
}

/// Counts over a [`SchemaDiff`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiffStats {
    pub sections_added: usize,
    pub sections_removed: usize,
    pub sections_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.sections_added + self.sections_removed + self.sections_changed == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} changed sections ({} lines +, {} lines -)",
            self.sections_added, self.sections_removed, self.sections_changed, self.lines_added, self.lines_removed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub changes: Vec<SectionChange>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for change in &self.changes {
            match change {
                SectionChange::Added(s) => {
                    stats.sections_added += 1;
                    stats.lines_added += s.lines.len();
                }
                SectionChange::Removed(s) => {
                    stats.sections_removed += 1;
                    stats.lines_removed += s.lines.len();
                }
                SectionChange::Changed { added, removed, .. } => {
                    stats.sections_changed += 1;
                    stats.lines_added += added;
                    stats.lines_removed += removed;
                }
            }
        }
        stats
    }

    /// Readable report: one block per changed section under `---`/`+++` labels
    pub fn render(&self, old_label: &str, new_label: &str) -> String {
        let mut out = format!("--- {old_label}\n+++ {new_label}\n");
        for change in &self.changes {
            match change {
                SectionChange::Added(s) => {
                    out.push_str(&format!("added section {}\n", s.key));
                    s.lines.iter().for_each(|line| out.push_str(&format!("+{line}\n")));
                }
                SectionChange::Removed(s) => {
                    out.push_str(&format!("removed section {}\n", s.key));
                    s.lines.iter().for_each(|line| out.push_str(&format!("-{line}\n")));
                }
                SectionChange::Changed { key, hunks, .. } => {
                    out.push_str(&format!("changed section {key}\n{hunks}"));
                }
            }
        }
        out
    }
}

fn compare(key: &str, old: &SectionSnapshot, new: &SectionSnapshot, context_lines: usize) -> Option<SectionChange> {
    if old.lines == new.lines {
        return None;
    }
    let (before, after) = (old.text(), new.text());
    let diff = TextDiff::from_lines(&before, &after);
    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    Some(SectionChange::Changed {
        key: key.to_string(),
        hunks: diff.unified_diff().context_radius(context_lines).to_string(),
        added,
        removed,
    })
}

/// Match the sections of two schemas by key. Removed and changed sections
/// come in the old schema's order, added ones after them in the new order.
pub fn diff_schemas(old: &Value, new: &Value, context_lines: usize) -> SchemaDiff {
    let before = snapshot_sections(old);
    let after = snapshot_sections(new);
    let after_by_key: HashMap<&str, &SectionSnapshot> = after.iter().map(|s| (s.key.as_str(), s)).collect();
    let before_keys: HashSet<&str> = before.iter().map(|s| s.key.as_str()).collect();

    let mut changes = Vec::new();
    for old_section in &before {
        match after_by_key.get(old_section.key.as_str()) {
            None => changes.push(SectionChange::Removed(old_section.clone())),
            Some(new_section) => changes.extend(compare(&old_section.key, old_section, new_section, context_lines)),
        }
    }
    changes.extend(
        after
            .iter()
            .filter(|s| !before_keys.contains(s.key.as_str()))
            .cloned()
            .map(SectionChange::Added),
    );
    SchemaDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(title: &str, extra: Option<Value>) -> Value {
        let mut content = vec![
            json!({"name": "title", "tag": "h1", "content": title}),
            json!({"name": "body", "content": [{"name": "lead", "content": "Read this"}]}),
        ];
        content.extend(extra);
        json!({"name": "page", "content": content})
    }

    #[test]
    fn test_snapshots_keep_own_fields_and_text() {
        let sections = snapshot_sections(&page("Hi", None));
        let keys: Vec<&str> = sections.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, ["page", "page > title", "page > body", "page > body > lead"]);
        assert_eq!(sections[1].lines, ["name: \"title\"", "tag: \"h1\"", "content = Hi"]);
        assert_eq!(sections[2].lines, ["name: \"body\""]);
    }

    #[test]
    fn test_changed_text_is_local_to_its_section() {
        let diff = diff_schemas(&page("Hi", None), &page("Hello", None), 3);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].key(), "page > title");
        let report = diff.render("old.json", "new.json");
        assert!(report.starts_with("--- old.json\n+++ new.json\nchanged section page > title\n"));
        assert!(report.contains("-content = Hi\n"));
        assert!(report.contains("+content = Hello\n"));
        assert_eq!(
            diff.stats(),
            DiffStats { sections_changed: 1, lines_added: 1, lines_removed: 1, ..DiffStats::default() }
        );
    }

    #[test]
    fn test_added_and_removed_sections() {
        let footer = json!({"name": "footer", "content": "Bye"});
        let grown = diff_schemas(&page("Hi", None), &page("Hi", Some(footer.clone())), 3);
        assert!(matches!(&grown.changes[..], [SectionChange::Added(s)] if s.key == "page > footer"));
        assert!(grown.render("a", "b").contains("added section page > footer\n+name: \"footer\"\n"));

        let shrunk = diff_schemas(&page("Hi", Some(footer)), &page("Hi", None), 3);
        let stats = shrunk.stats();
        assert_eq!(stats.sections_removed, 1);
        assert_eq!(stats.lines_removed, 2);
    }

    #[test]
    fn test_repeated_names_are_numbered() {
        let schema = json!([{"name": "item", "content": "a"}, {"name": "item", "content": "b"}]);
        let keys: Vec<String> = snapshot_sections(&schema).into_iter().map(|s| s.key).collect();
        assert_eq!(keys, ["item", "item #2"]);
        assert!(diff_schemas(&schema, &schema, 3).is_empty());
        assert!(diff_schemas(&schema, &schema, 3).stats().is_empty());
    }
}
