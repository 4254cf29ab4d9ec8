//! Motion control: the controller context object, single-axis
//! trapezoidal moves and multi-axis synchronized moves.

mod controller;
mod multi;
mod ramp;

pub use controller::{CompletionAction, MotionController};
