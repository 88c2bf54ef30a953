use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Observed element size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape iff width >= height
    pub fn from_size(size: Size) -> Self {
        if size.width >= size.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `name -> min width` table.
///
/// Thresholds are expected in ascending order; the table does not sort or
/// validate them. [`BreakpointTable::resolve`] returns the last entry whose
/// threshold does not exceed the width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointTable {
    entries: Vec<(String, u32)>,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::new([
            ("xs", 0),
            ("sm", 576),
            ("md", 768),
            ("lg", 992),
            ("xl", 1200),
            ("xxl", 1400),
        ])
    }
}

impl BreakpointTable {
    pub fn new<S: Into<String>>(entries: impl IntoIterator<Item = (S, u32)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(n, w)| (n.into(), w)).collect(),
        }
    }

    /// Read a table from a JSON object such as `{"xs": 0, "md": 768}`.
    /// Entries with non-numeric thresholds are skipped; returns None for non-objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let entries = map
            .iter()
            .filter_map(|(name, w)| w.as_u64().map(|w| (name.clone(), w.min(u32::MAX as u64) as u32)))
            .collect();
        Some(Self { entries })
    }

    pub fn resolve(&self, width: u32) -> Option<&str> {
        let mut found = None;
        for (name, threshold) in &self.entries {
            if width >= *threshold {
                found = Some(name.as_str());
            }
        }
        found
    }

    /// Like [`resolve`](Self::resolve), falling back to the first entry for
    /// widths below every threshold
    pub fn resolve_or_first(&self, width: u32) -> Option<&str> {
        self.resolve(width)
            .or_else(|| self.entries.first().map(|(n, _)| n.as_str()))
    }

    pub fn threshold(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, w)| *w)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Names up to and including `breakpoint`, in table order
    pub fn up_to<'a>(&'a self, breakpoint: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let end = self
            .entries
            .iter()
            .position(|(n, _)| n == breakpoint)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.entries[..end].iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn small() -> BreakpointTable {
        BreakpointTable::new([("xs", 0), ("sm", 576), ("md", 768)])
    }

    #[test]
    fn test_resolve_picks_last_satisfying() {
        let table = small();
        assert_eq!(table.resolve(800), Some("md"));
        assert_eq!(table.resolve(768), Some("md"));
        assert_eq!(table.resolve(600), Some("sm"));
        assert_eq!(table.resolve(0), Some("xs"));
    }

    #[test]
    fn test_resolve_is_monotonic() {
        let table = BreakpointTable::default();
        let mut last = 0;
        for width in (0..2000).step_by(7) {
            let name = table.resolve(width).unwrap();
            let threshold = table.threshold(name).unwrap();
            assert!(threshold >= last, "threshold went down at width {width}");
            assert!(threshold <= width);
            last = threshold;
        }
    }

    #[test]
    fn test_below_every_threshold() {
        let table = BreakpointTable::new([("sm", 576), ("md", 768)]);
        assert_eq!(table.resolve(100), None);
        assert_eq!(table.resolve_or_first(100), Some("sm"));
    }

    #[test]
    fn test_from_value_preserves_order() {
        let table = BreakpointTable::from_value(&json!({"xs": 0, "tablet": 700, "desk": 1100})).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["xs", "tablet", "desk"]);
        assert_eq!(table.resolve(900), Some("tablet"));
        assert_eq!(table.up_to("tablet").collect::<Vec<_>>(), vec!["xs", "tablet"]);
        assert!(BreakpointTable::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_orientation() {
        assert_eq!(Orientation::from_size(Size::new(800, 600)), Orientation::Landscape);
        assert_eq!(Orientation::from_size(Size::new(500, 500)), Orientation::Landscape);
        assert_eq!(Orientation::from_size(Size::new(400, 900)), Orientation::Portrait);
    }
}
