//! A body together with its frame sets and the kits of its links.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use linkpose_core::SolverSettings;
use linkpose_frames::FrameSetSuite;

use crate::body::BodyPtr;
use crate::kit::{LinkKinematicsKit, LinkKinematicsKitPtr};

/// Shared handle to a [`KinematicBody`].
pub type KinematicBodyPtr = Rc<KinematicBody>;

/// Owner of the per-link kits of one body.
///
/// Kits are created on first request and kept, so frame selections and
/// solver state survive retargeting. Every kit shares the body's frame
/// sets.
pub struct KinematicBody {
    body: BodyPtr,
    settings: SolverSettings,
    frames: RefCell<Option<FrameSetSuite>>,
    kits: RefCell<Vec<Option<LinkKinematicsKitPtr>>>,
}

impl KinematicBody {
    pub fn new(body: BodyPtr) -> KinematicBodyPtr {
        Self::with_settings(body, SolverSettings::default())
    }

    pub fn with_settings(body: BodyPtr, settings: SolverSettings) -> KinematicBodyPtr {
        let num_links = body.num_links();
        Rc::new(Self {
            body,
            settings,
            frames: RefCell::new(None),
            kits: RefCell::new(vec![None; num_links]),
        })
    }

    pub fn body(&self) -> &BodyPtr {
        &self.body
    }

    pub fn name(&self) -> &str {
        self.body.name()
    }

    pub fn frame_sets(&self) -> Option<FrameSetSuite> {
        self.frames.borrow().clone()
    }

    /// Attach frame sets to the body and to every kit created so far.
    pub fn set_frame_sets(&self, frames: Option<FrameSetSuite>) {
        for kit in self.kits.borrow().iter().flatten() {
            kit.set_frame_sets(frames.clone());
        }
        *self.frames.borrow_mut() = frames;
    }

    /// Kit for `link`, created on first use. `None` for unknown links or
    /// when no solver can be built for the link.
    pub fn link_kinematics_kit(&self, link: usize) -> Option<LinkKinematicsKitPtr> {
        if let Some(kit) = self.kits.borrow().get(link)?.as_ref() {
            return Some(Rc::clone(kit));
        }
        let kit = match LinkKinematicsKit::with_settings(Rc::clone(&self.body), link, &self.settings) {
            Ok(kit) => kit,
            Err(err) => {
                debug!(body = self.body.name(), link, %err, "no kinematics kit for link");
                return None;
            }
        };
        kit.set_frame_sets(self.frame_sets());
        if let Some(slot) = self.kits.borrow_mut().get_mut(link) {
            *slot = Some(Rc::clone(&kit));
        }
        Some(kit)
    }

    /// Install a prepared kit for its link, replacing any cached one.
    pub fn set_link_kinematics_kit(&self, kit: LinkKinematicsKitPtr) -> bool {
        if !Rc::ptr_eq(kit.body(), &self.body) {
            return false;
        }
        match self.kits.borrow_mut().get_mut(kit.link()) {
            Some(slot) => {
                *slot = Some(kit);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for KinematicBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinematicBody")
            .field("body", &self.body.name())
            .field("has_frame_sets", &self.frames.borrow().is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
