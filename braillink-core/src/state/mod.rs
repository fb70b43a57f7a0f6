pub mod mode;

pub use mode::{ModeKind, SessionMode, TtySlot};
