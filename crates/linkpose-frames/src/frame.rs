//! A named rigid transform that can belong to a [`CoordinateFrameList`].
//!
//! Frames are shared through [`CoordinateFramePtr`] (`Rc<CoordinateFrame>`)
//! and mutated through `&self` setters. A frame's link to its owning list
//! is a weak back-reference: it never keeps the list alive, and once the
//! list is gone the frame is simply detached.
//!
//! [`CoordinateFrameList`]: crate::list::CoordinateFrameList

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use nalgebra::Isometry3;
use tracing::debug;

use linkpose_core::{GeneralId, Signal, Subscription};

use crate::list::{CoordinateFrameList, FrameListCore};

/// Shared handle to a frame.
pub type CoordinateFramePtr = Rc<CoordinateFrame>;

bitflags! {
    /// Which parts of a frame changed in an update notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UpdateFlags: u8 {
        const ID = 1 << 0;
        const MODE = 1 << 1;
        const NOTE = 1 << 2;
        const POSITION = 1 << 3;
    }
}

// ---------------------------------------------------------------------------
// FrameMode
// ---------------------------------------------------------------------------

/// How a frame's transform is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FrameMode {
    /// Relative to the link the frame is attached to.
    #[default]
    Local,
    /// In the chain's root/world space regardless of nesting.
    Global,
}

impl FrameMode {
    /// Ordinal used by the persistence record.
    pub const fn ordinal(self) -> i64 {
        match self {
            Self::Local => 0,
            Self::Global => 1,
        }
    }

    pub const fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Local),
            1 => Some(Self::Global),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CoordinateFrame
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FrameData {
    id: GeneralId,
    transform: Isometry3<f32>,
    mode: FrameMode,
    note: String,
    findable: bool,
}

/// Identifiable rigid transform with a mode, a note and update
/// notification.
#[derive(Debug)]
pub struct CoordinateFrame {
    data: RefCell<FrameData>,
    owner: RefCell<Weak<FrameListCore>>,
    sig_updated: Signal<UpdateFlags>,
}

impl CoordinateFrame {
    /// Detached identity frame with the default id (`0`).
    #[must_use]
    pub fn identity() -> CoordinateFramePtr {
        Self::new(GeneralId::default_id())
    }

    /// Detached identity frame with the given id.
    #[must_use]
    pub fn new(id: impl Into<GeneralId>) -> CoordinateFramePtr {
        Rc::new(Self::detached(id.into()))
    }

    /// Detached frame with the given id and transform.
    #[must_use]
    pub fn with_transform(id: impl Into<GeneralId>, transform: Isometry3<f32>) -> CoordinateFramePtr {
        let frame = Self::detached(id.into());
        frame.data.borrow_mut().transform = transform;
        Rc::new(frame)
    }

    /// Frame that names `list` as its owner without being a member of it.
    ///
    /// Used for frames that stand in for list content, e.g. a synthesized
    /// default frame. Uniqueness checks still consult the list.
    #[must_use]
    pub fn with_formal_owner(id: impl Into<GeneralId>, list: &CoordinateFrameList) -> CoordinateFramePtr {
        let frame = Self::detached(id.into());
        *frame.owner.borrow_mut() = list.downgrade();
        Rc::new(frame)
    }

    fn detached(id: GeneralId) -> Self {
        Self {
            data: RefCell::new(FrameData {
                id,
                transform: Isometry3::identity(),
                mode: FrameMode::Local,
                note: String::new(),
                findable: true,
            }),
            owner: RefCell::new(Weak::new()),
            sig_updated: Signal::new(),
        }
    }

    /// New detached frame with the same id, transform, mode, note and
    /// findability. Subscriptions are not copied.
    #[must_use]
    pub fn duplicate(&self) -> CoordinateFramePtr {
        Rc::new(Self {
            data: RefCell::new(self.data.borrow().clone()),
            owner: RefCell::new(Weak::new()),
            sig_updated: Signal::new(),
        })
    }

    // -- id -----------------------------------------------------------------

    pub fn id(&self) -> GeneralId {
        self.data.borrow().id.clone()
    }

    /// Change the id.
    ///
    /// Rejected (returns `false`, no mutation, no notification) when another
    /// member of the owning list already uses `id`. Detached frames accept
    /// any id. On success an [`UpdateFlags::ID`] notification is emitted.
    pub fn reset_id(&self, id: impl Into<GeneralId>) -> bool {
        let id = id.into();
        if let Some(owner) = self.owner.borrow().upgrade() {
            if owner.has_other_frame_with_id(self, &id) {
                debug!(%id, "frame id rejected: already used in the owning list");
                return false;
            }
        }
        self.data.borrow_mut().id = id;
        self.notify_update(UpdateFlags::ID);
        true
    }

    // -- mode ---------------------------------------------------------------

    pub fn mode(&self) -> FrameMode {
        self.data.borrow().mode
    }

    pub fn is_local(&self) -> bool {
        self.mode() == FrameMode::Local
    }

    pub fn is_global(&self) -> bool {
        self.mode() == FrameMode::Global
    }

    /// Set the mode and emit [`UpdateFlags::MODE`].
    pub fn set_mode(&self, mode: FrameMode) -> bool {
        self.data.borrow_mut().mode = mode;
        self.notify_update(UpdateFlags::MODE);
        true
    }

    /// Set the mode from its ordinal. Undefined ordinals are rejected
    /// without mutation or notification.
    pub fn set_mode_ordinal(&self, ordinal: i64) -> bool {
        match FrameMode::from_ordinal(ordinal) {
            Some(mode) => self.set_mode(mode),
            None => {
                debug!(ordinal, "frame mode rejected");
                false
            }
        }
    }

    // -- position -----------------------------------------------------------

    pub fn position(&self) -> Isometry3<f32> {
        self.data.borrow().transform
    }

    /// Alias of [`position`](Self::position).
    pub fn transform(&self) -> Isometry3<f32> {
        self.position()
    }

    /// Set the transform and emit [`UpdateFlags::POSITION`].
    pub fn set_position(&self, transform: Isometry3<f32>) {
        self.data.borrow_mut().transform = transform;
        self.notify_update(UpdateFlags::POSITION);
    }

    // -- note ---------------------------------------------------------------

    pub fn note(&self) -> Ref<'_, str> {
        Ref::map(self.data.borrow(), |d| d.note.as_str())
    }

    /// Set the note. Notes are often edited in bulk, so
    /// [`UpdateFlags::NOTE`] is only emitted when `do_notify` is set.
    pub fn set_note(&self, note: impl Into<String>, do_notify: bool) {
        self.data.borrow_mut().note = note.into();
        if do_notify {
            self.notify_update(UpdateFlags::NOTE);
        }
    }

    // -- findability --------------------------------------------------------

    /// Whether the frame is offered in pick lists.
    pub fn is_findable(&self) -> bool {
        self.data.borrow().findable
    }

    pub fn set_findable(&self, on: bool) {
        self.data.borrow_mut().findable = on;
    }

    // -- ownership ----------------------------------------------------------

    /// Whether the owning list is still alive.
    pub fn has_owner(&self) -> bool {
        self.owner.borrow().strong_count() > 0
    }

    /// Whether this frame belongs (or formally belongs) to `list`.
    pub fn is_owned_by(&self, list: &CoordinateFrameList) -> bool {
        self.owner
            .borrow()
            .upgrade()
            .is_some_and(|owner| list.is_core(&owner))
    }

    /// Other members of the owning list, in list order. Empty when
    /// detached.
    pub fn siblings(&self) -> Vec<CoordinateFramePtr> {
        self.owner
            .borrow()
            .upgrade()
            .map(|owner| owner.frames_except(self))
            .unwrap_or_default()
    }

    pub(crate) fn set_owner(&self, owner: Weak<FrameListCore>) {
        *self.owner.borrow_mut() = owner;
    }

    pub(crate) fn clear_owner(&self) {
        *self.owner.borrow_mut() = Weak::new();
    }

    pub(crate) fn owner_core(&self) -> Option<Rc<FrameListCore>> {
        self.owner.borrow().upgrade()
    }

    // -- notification -------------------------------------------------------

    /// Subscribe to update notifications.
    pub fn connect_updated(&self, handler: impl Fn(&UpdateFlags) + 'static) -> Subscription {
        self.sig_updated.connect(handler)
    }

    /// Emit an update with the given flags.
    pub fn notify_update(&self, flags: UpdateFlags) {
        self.sig_updated.emit(&flags);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
