// linkpose-frames: ownable coordinate frames, frame lists and their
// persistence record.

pub mod archive;
pub mod frame;
pub mod list;
pub mod suite;

pub use frame::{CoordinateFrame, CoordinateFramePtr, FrameMode, UpdateFlags};
pub use list::CoordinateFrameList;
pub use suite::FrameSetSuite;
