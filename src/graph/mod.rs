//! # Relationship Graph Engine
//!
//! The core of the service: connection lifecycle management, strength
//! scoring, mutual-connection and suggestion computation, and the
//! three-party introduction brokering workflow. Every component takes its
//! store handles explicitly so each is independently testable.

pub mod introductions;
pub mod lifecycle;
pub mod mutual;
pub mod notify;
pub mod strength;

pub use introductions::IntroductionWorkflow;
pub use lifecycle::ConnectionLifecycle;
pub use mutual::MutualGraph;
pub use notify::{ActivityNotifier, LoggingNotifier};
pub use strength::StrengthScorer;
