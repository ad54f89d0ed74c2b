use std::collections::HashSet;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// The event categories a directory watch can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Create,
    Close,
    Delete,
    Move,
}

/// A raw directory-watch event in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub is_dir: bool,
}

impl FsChange {
    pub fn new(path: PathBuf, kind: ChangeKind, is_dir: bool) -> Self {
        Self { path, kind, is_dir }
    }
}

/// The set of enabled event categories, built once from the four
/// configuration flags and immutable for the lifetime of a watch session.
#[derive(Debug, Clone)]
pub struct EventMask {
    enabled: HashSet<ChangeKind>,
}

impl EventMask {
    pub fn from_flags(on_create: bool, on_close: bool, on_delete: bool, on_move: bool) -> Self {
        let mut enabled = HashSet::new();
        if on_create {
            enabled.insert(ChangeKind::Create);
        }
        if on_close {
            enabled.insert(ChangeKind::Close);
        }
        if on_delete {
            enabled.insert(ChangeKind::Delete);
        }
        if on_move {
            enabled.insert(ChangeKind::Move);
        }
        Self { enabled }
    }

    pub fn contains(&self, kind: ChangeKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Whether an event passes the filter. Directory entries never
    /// propagate; only individual file events do.
    pub fn accepts(&self, change: &FsChange) -> bool {
        !change.is_dir && self.contains(change.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: ChangeKind, is_dir: bool) -> FsChange {
        FsChange::new(PathBuf::from("/data/in/a.txt"), kind, is_dir)
    }

    #[test]
    fn test_mask_membership() {
        let mask = EventMask::from_flags(true, false, true, false);

        assert!(mask.contains(ChangeKind::Create));
        assert!(mask.contains(ChangeKind::Delete));
        assert!(!mask.contains(ChangeKind::Close));
        assert!(!mask.contains(ChangeKind::Move));
    }

    #[test]
    fn test_disabled_category_rejected() {
        let mask = EventMask::from_flags(false, true, false, false);

        assert!(mask.accepts(&change(ChangeKind::Close, false)));
        assert!(!mask.accepts(&change(ChangeKind::Create, false)));
        assert!(!mask.accepts(&change(ChangeKind::Delete, false)));
    }

    #[test]
    fn test_directory_entries_rejected() {
        let mask = EventMask::from_flags(true, true, true, true);

        assert!(!mask.accepts(&change(ChangeKind::Create, true)));
        assert!(!mask.accepts(&change(ChangeKind::Delete, true)));
        assert!(mask.accepts(&change(ChangeKind::Create, false)));
    }

    #[test]
    fn test_empty_mask_accepts_nothing() {
        let mask = EventMask::from_flags(false, false, false, false);

        assert!(mask.is_empty());
        assert!(!mask.accepts(&change(ChangeKind::Close, false)));
    }
}
