//! Change sets driving build passes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of file system change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A single changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl Change {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// The input of one build pass.
///
/// An `initial` set triggers a clean rebuild and its `changes` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub initial: bool,
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// A set requesting a full clean build.
    pub fn initial() -> Self {
        Self {
            initial: true,
            changes: Vec::new(),
        }
    }

    /// An incremental set.
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            initial: false,
            changes,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.initial && self.changes.is_empty()
    }

    /// Fold a later set into this one. For a path changed in both sets the
    /// later kind wins.
    pub fn merge(&mut self, other: ChangeSet) {
        self.initial |= other.initial;

        for change in other.changes {
            match self.changes.iter_mut().find(|c| c.path == change.path) {
                Some(existing) => existing.kind = change.kind,
                None => self.changes.push(change),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_keeps_latest_kind_per_path() {
        let mut set = ChangeSet::new(vec![
            Change::new(ChangeKind::Added, "pages/a.html"),
            Change::new(ChangeKind::Modified, "pages/b.html"),
        ]);

        set.merge(ChangeSet::new(vec![
            Change::new(ChangeKind::Removed, "pages/a.html"),
            Change::new(ChangeKind::Added, "pages/c.html"),
        ]));

        assert_eq!(
            set.changes,
            vec![
                Change::new(ChangeKind::Removed, "pages/a.html"),
                Change::new(ChangeKind::Modified, "pages/b.html"),
                Change::new(ChangeKind::Added, "pages/c.html"),
            ]
        );
        assert!(!set.initial);
    }

    #[test]
    fn merging_an_initial_set_makes_the_result_initial() {
        let mut set = ChangeSet::new(vec![Change::new(ChangeKind::Modified, "x")]);

        set.merge(ChangeSet::initial());

        assert!(set.initial);
        assert!(!set.is_empty());
    }

    #[test]
    fn kinds_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Removed).unwrap(),
            "\"removed\""
        );
    }
}
