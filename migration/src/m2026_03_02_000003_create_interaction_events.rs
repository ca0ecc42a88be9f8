//! Migration to create the interaction_events table.
//!
//! Interaction events are the per-edge activity records (messages, profile
//! views, endorsements, ...) that feed strength recalculation.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InteractionEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InteractionEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InteractionEvents::ConnectionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InteractionEvents::ActorId).uuid().not_null())
                    .col(ColumnDef::new(InteractionEvents::Kind).text().not_null())
                    .col(
                        ColumnDef::new(InteractionEvents::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_interaction_events_connection_id")
                            .from(InteractionEvents::Table, InteractionEvents::ConnectionId)
                            .to(Connections::Table, Connections::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Recalculation replays an edge's events within the scoring window.
        manager
            .create_index(
                Index::create()
                    .name("idx_interaction_events_connection_occurred")
                    .table(InteractionEvents::Table)
                    .col(InteractionEvents::ConnectionId)
                    .col(InteractionEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_interaction_events_connection_occurred")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(InteractionEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InteractionEvents {
    Table,
    Id,
    ConnectionId,
    ActorId,
    Kind,
    OccurredAt,
}

#[derive(DeriveIden)]
enum Connections {
    Table,
    Id,
}
