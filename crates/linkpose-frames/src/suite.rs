use std::rc::Rc;

use linkpose_core::{FrameType, GeneralId};

use crate::frame::CoordinateFramePtr;
use crate::list::CoordinateFrameList;

/// The three frame lists a link works with: world, body and link frames.
#[derive(Debug, Clone)]
pub struct FrameSetSuite {
    sets: [Rc<CoordinateFrameList>; 3],
}

impl FrameSetSuite {
    /// Suite of three empty lists, each starting with the default frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: [
                Rc::new(CoordinateFrameList::with_default_frame()),
                Rc::new(CoordinateFrameList::with_default_frame()),
                Rc::new(CoordinateFrameList::with_default_frame()),
            ],
        }
    }

    /// Suite over existing lists.
    #[must_use]
    pub fn from_lists(
        world: Rc<CoordinateFrameList>,
        body: Rc<CoordinateFrameList>,
        link: Rc<CoordinateFrameList>,
    ) -> Self {
        Self {
            sets: [world, body, link],
        }
    }

    pub fn frame_set(&self, frame_type: FrameType) -> &Rc<CoordinateFrameList> {
        &self.sets[frame_type.index()]
    }

    /// Look up a frame by type and id.
    pub fn find(&self, frame_type: FrameType, id: &GeneralId) -> Option<CoordinateFramePtr> {
        self.frame_set(frame_type).find(id)
    }
}

impl Default for FrameSetSuite {
    fn default() -> Self {
        Self::new()
    }
}
