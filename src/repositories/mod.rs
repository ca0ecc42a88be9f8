//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the graph entities, providing a clean data-access API the
//! engine components build on.

pub mod connection;
pub mod interaction;
pub mod introduction;
pub mod user;

pub use connection::ConnectionRepository;
pub use interaction::InteractionRepository;
pub use introduction::IntroductionRepository;
pub use user::UserRepository;
