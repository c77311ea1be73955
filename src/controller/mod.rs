// CONTROLLER: Input, orientation, locomotion and timing
pub mod input;
pub mod orientation;
pub mod locomotion;
pub mod clock;

pub use input::{Action, InputEvent, InputState, KeyBindings};
pub use orientation::{CaptureEvent, CaptureListeners, ListenerId, OrientationController, PointerCapture};
pub use locomotion::{LocomotionIntegrator, StepOutcome};
pub use clock::FrameClock;
