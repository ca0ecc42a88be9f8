//! Database migrations for the Maison Graph service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_03_02_000001_create_users;
mod m2026_03_02_000002_create_connections;
mod m2026_03_02_000003_create_interaction_events;
mod m2026_03_02_000004_create_introduction_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_03_02_000001_create_users::Migration),
            Box::new(m2026_03_02_000002_create_connections::Migration),
            Box::new(m2026_03_02_000003_create_interaction_events::Migration),
            Box::new(m2026_03_02_000004_create_introduction_requests::Migration),
        ]
    }
}
