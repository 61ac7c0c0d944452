//! Ordered, id-unique collection of coordinate frames.
//!
//! The list holds the only strong references it needs to its frames; each
//! member frame points back at the list's shared core through a `Weak`.
//! Dropping the list therefore detaches every frame that is still
//! retained elsewhere.

use std::rc::{Rc, Weak};
use std::cell::RefCell;

use tracing::debug;

use linkpose_core::GeneralId;

use crate::frame::{CoordinateFrame, CoordinateFramePtr};

/// Shared state a frame's back-reference resolves to.
#[derive(Debug, Default)]
pub(crate) struct FrameListCore {
    frames: RefCell<Vec<CoordinateFramePtr>>,
}

impl FrameListCore {
    pub(crate) fn has_other_frame_with_id(&self, frame: &CoordinateFrame, id: &GeneralId) -> bool {
        self.frames
            .borrow()
            .iter()
            .any(|f| !std::ptr::eq(f.as_ref(), frame) && f.id() == *id)
    }

    pub(crate) fn frames_except(&self, frame: &CoordinateFrame) -> Vec<CoordinateFramePtr> {
        self.frames
            .borrow()
            .iter()
            .filter(|f| !std::ptr::eq(f.as_ref(), frame))
            .cloned()
            .collect()
    }
}

/// Ordered sequence of frames with unique ids.
#[derive(Debug, Default)]
pub struct CoordinateFrameList {
    core: Rc<FrameListCore>,
}

impl CoordinateFrameList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// List whose first element is an identity frame with the default id.
    /// That element is never offered in pick lists.
    #[must_use]
    pub fn with_default_frame() -> Self {
        let list = Self::new();
        list.set_first_element_as_default_frame(true);
        list
    }

    pub(crate) fn downgrade(&self) -> Weak<FrameListCore> {
        Rc::downgrade(&self.core)
    }

    pub(crate) fn is_core(&self, core: &Rc<FrameListCore>) -> bool {
        Rc::ptr_eq(&self.core, core)
    }

    pub fn len(&self) -> usize {
        self.core.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.frames.borrow().is_empty()
    }

    pub fn frame_at(&self, index: usize) -> Option<CoordinateFramePtr> {
        self.core.frames.borrow().get(index).cloned()
    }

    /// Frame with the given id.
    pub fn find(&self, id: &GeneralId) -> Option<CoordinateFramePtr> {
        self.core.frames.borrow().iter().find(|f| f.id() == *id).cloned()
    }

    pub fn contains(&self, id: &GeneralId) -> bool {
        self.find(id).is_some()
    }

    /// Position of the frame with the given id.
    pub fn index_of(&self, id: &GeneralId) -> Option<usize> {
        self.core.frames.borrow().iter().position(|f| f.id() == *id)
    }

    /// All frames in list order.
    pub fn frames(&self) -> Vec<CoordinateFramePtr> {
        self.core.frames.borrow().clone()
    }

    /// Frames offered in pick lists, in list order. Non-findable frames and
    /// frames carrying the default id are left out.
    pub fn findable_frames(&self) -> Vec<CoordinateFramePtr> {
        self.core
            .frames
            .borrow()
            .iter()
            .filter(|f| f.is_findable() && !f.id().is_default())
            .cloned()
            .collect()
    }

    /// Append a frame. Fails when the id is already used, the id is
    /// invalid, or the frame belongs to another live list.
    pub fn append(&self, frame: CoordinateFramePtr) -> bool {
        let index = self.len();
        self.insert(index, frame)
    }

    /// Insert a frame at `index` (clamped to the list length). Same
    /// failure rules as [`append`](Self::append).
    pub fn insert(&self, index: usize, frame: CoordinateFramePtr) -> bool {
        let id = frame.id();
        if !id.is_valid() {
            debug!("frame insertion rejected: invalid id");
            return false;
        }
        if let Some(owner) = frame.owner_core() {
            if !self.is_core(&owner) || self.contains_ptr(&frame) {
                debug!(%id, "frame insertion rejected: frame already belongs to a list");
                return false;
            }
        }
        if self.contains(&id) {
            debug!(%id, "frame insertion rejected: duplicate id");
            return false;
        }
        frame.set_owner(self.downgrade());
        let mut frames = self.core.frames.borrow_mut();
        let index = index.min(frames.len());
        frames.insert(index, frame);
        true
    }

    /// Remove the frame with the given id. The returned frame is detached.
    pub fn remove(&self, id: &GeneralId) -> Option<CoordinateFramePtr> {
        let index = self.index_of(id)?;
        let frame = self.core.frames.borrow_mut().remove(index);
        frame.clear_owner();
        Some(frame)
    }

    /// Remove every frame.
    pub fn clear(&self) {
        let frames = std::mem::take(&mut *self.core.frames.borrow_mut());
        for frame in frames {
            frame.clear_owner();
        }
    }

    /// Smallest positive integer id greater than every integer id in use.
    pub fn next_available_id(&self) -> GeneralId {
        let max = self
            .core
            .frames
            .borrow()
            .iter()
            .filter_map(|f| f.id().as_int())
            .max()
            .unwrap_or(0);
        GeneralId::Int(max.saturating_add(1))
    }

    /// Whether the first element is the implicit default frame.
    pub fn has_first_element_as_default_frame(&self) -> bool {
        self.frame_at(0).is_some_and(|f| f.id().is_default())
    }

    /// Add or remove the implicit identity frame with the default id at
    /// the front of the list.
    pub fn set_first_element_as_default_frame(&self, on: bool) {
        let has = self.has_first_element_as_default_frame();
        if on && !has {
            let frame = CoordinateFrame::identity();
            frame.set_findable(false);
            self.insert(0, frame);
        } else if !on && has {
            self.remove(&GeneralId::default_id());
        }
    }

    fn contains_ptr(&self, frame: &CoordinateFramePtr) -> bool {
        self.core.frames.borrow().iter().any(|f| Rc::ptr_eq(f, frame))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
