//! Robot state machine and audio pipeline coordination
//!
//! Three contexts share the [`RobotRuntime`]: the [`Coordinator`] loop that
//! owns the microphone, the [`SpeechWorker`] that owns voice output, and the
//! HTTP/WebSocket handlers.

mod busy;
mod coordinator;
mod events;
mod runtime;
mod speaker;
mod state;

pub use busy::BusyFlag;
pub use coordinator::{Coordinator, Tick};
pub use events::{EventBus, RobotEvent};
pub use runtime::{RobotRuntime, SpeechJob, SpeechQueue};
pub use speaker::SpeechWorker;
pub use state::{RobotState, RobotStateMachine};
