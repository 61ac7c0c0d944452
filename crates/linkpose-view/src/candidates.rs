//! Pick-list entries for the base and link frame selectors.

use linkpose_core::GeneralId;
use linkpose_frames::CoordinateFrameList;

/// One selectable frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCandidate {
    pub id: GeneralId,
    pub label: String,
}

/// Entries of one frame selector and the selected index.
///
/// The first entry is always the origin (`0`), so the list is never empty
/// once built and the selection falls back to index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameCandidates {
    entries: Vec<FrameCandidate>,
    selected: usize,
}

impl FrameCandidates {
    /// Origin entry labelled `"0: <origin_label>"`, then every findable
    /// frame of `frames` in list order. The entry matching `current`
    /// becomes the selection.
    pub fn build(frames: Option<&CoordinateFrameList>, current: &GeneralId, origin_label: &str) -> Self {
        let mut entries = vec![FrameCandidate {
            id: GeneralId::default_id(),
            label: format!("0: {origin_label}"),
        }];
        let mut selected = 0;

        for frame in frames.map(CoordinateFrameList::findable_frames).unwrap_or_default() {
            let id = frame.id();
            let label = match &id {
                GeneralId::Int(value) => format!("{value}: {}", &*frame.note()),
                GeneralId::Name(_) => id.label(),
            };
            if id == *current {
                selected = entries.len();
            }
            entries.push(FrameCandidate { id, label });
        }

        Self { entries, selected }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.selected = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FrameCandidate] {
        &self.entries
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_id(&self) -> Option<&GeneralId> {
        self.id_at(self.selected)
    }

    pub fn id_at(&self, index: usize) -> Option<&GeneralId> {
        self.entries.get(index).map(|e| &e.id)
    }

    pub fn index_of(&self, id: &GeneralId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == *id)
    }

    /// Returns `false` for an out-of-range index.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.selected = index;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
