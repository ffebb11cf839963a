//! RDF patch construction
//!
//! Builds RDF patch documents from plain triple data. A patch is a
//! header block naming the patch id (and the id of the patch it follows),
//! then a transaction that adds each data line:
//!
//! ```text
//! H id <uuid:0190...> .
//! H prev <uuid:0190...> .
//! TX .
//! A <http://example.com/a> <http://example.com/b> "c" .
//! TC .
//! ```

use std::fmt;

use uuid::Uuid;

/// An RDF patch: additions wrapped in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Patch id, written into the `H id` header
    pub id: Uuid,
    /// Id of the preceding patch in the log, when the log is not empty
    pub prev: Option<String>,
    /// Data lines added by the patch
    pub lines: Vec<String>,
}

impl Patch {
    /// Build a patch from raw triple data, one triple per line.
    ///
    /// Blank lines are dropped; they carry nothing and would render as
    /// empty additions.
    pub fn new(data: &str) -> Self {
        let lines = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            id: Uuid::now_v7(),
            prev: None,
            lines,
        }
    }

    /// Chain this patch after an existing patch id.
    pub fn with_prev(mut self, prev: impl Into<String>) -> Self {
        self.prev = Some(prev.into());
        self
    }

    /// Whether the patch adds any data.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "H id <uuid:{}> .", self.id)?;
        if let Some(ref prev) = self.prev {
            writeln!(f, "H prev <uuid:{}> .", prev)?;
        }
        writeln!(f, "TX .")?;
        for line in &self.lines {
            writeln!(f, "A {}", line)?;
        }
        writeln!(f, "TC .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_renders_headers_and_transaction() {
        let patch = Patch::new("<a> <b> <c> .\n<d> <e> <f> .");
        let rendered = patch.to_string();

        assert!(rendered.starts_with(&format!("H id <uuid:{}> .\n", patch.id)));
        assert!(rendered.contains("TX .\n"));
        assert!(rendered.contains("A <a> <b> <c> .\n"));
        assert!(rendered.contains("A <d> <e> <f> .\n"));
        assert!(rendered.ends_with("TC .\n"));
        assert!(!rendered.contains("H prev"));
    }

    #[test]
    fn test_patch_chains_to_previous() {
        let patch = Patch::new("<a> <b> <c> .").with_prev("0190aabb-ccdd-7123-8000-000000000001");
        let rendered = patch.to_string();
        assert!(rendered
            .contains("H prev <uuid:0190aabb-ccdd-7123-8000-000000000001> .\n"));
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let patch = Patch::new("<a> <b> <c> .\n\n   \n<d> <e> <f> .\n");
        assert_eq!(patch.lines.len(), 2);
        assert!(!patch.to_string().contains("A \n"));
    }

    #[test]
    fn test_empty_data_yields_empty_patch() {
        let patch = Patch::new("\n  \n");
        assert!(patch.is_empty());
    }
}
