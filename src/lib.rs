//! Dinner - voice backend for a food delivery robot demo
//!
//! This library provides the core functionality for the robot:
//! - Wake word listening with bilingual (Spanish/English) transcription
//! - Response generation through a remote language model with a fixed persona
//! - Serialized voice output and a browser event gateway
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Browser front end                   │
//! │     POST /procesar   │   /ws events and controls    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Robot runtime                     │
//! │  State lock  │  Busy flag  │  Speech queue (FIFO)   │
//! └──────┬──────────────────────────────────┬───────────┘
//!        │                                  │
//! ┌──────▼──────────────┐         ┌─────────▼───────────┐
//! │  Audio coordinator  │         │   Speech worker     │
//! │  mic → STT → wake   │         │   TTS → speaker     │
//! │  word → responder   │         │                     │
//! └─────────────────────┘         └─────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;
pub mod gesture;
pub mod language;
pub mod llm;
pub mod responder;
pub mod robot;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, Result};
pub use gesture::{Gesture, ResponseEnvelope};
pub use language::Language;
pub use responder::ResponseGenerator;
pub use robot::{RobotEvent, RobotRuntime, RobotState};
