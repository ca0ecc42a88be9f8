//! # Data Models
//!
//! This module contains the SeaORM entities and shared domain enums used
//! throughout the Maison Graph service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod connection;
pub mod interaction_event;
pub mod introduction_request;
pub mod user;

pub use connection::Entity as Connection;
pub use interaction_event::Entity as InteractionEvent;
pub use introduction_request::Entity as IntroductionRequest;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "maison-graph".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
