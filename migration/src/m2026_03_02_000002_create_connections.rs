//! Migration to create the connections table.
//!
//! Connections are undirected edges between two profiles, stored with a
//! canonical ordering (user_lo < user_hi) so that the composite unique index
//! enforces at-most-one edge per unordered pair at the store layer,
//! independent of which side initiated the request.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connections::UserLo).uuid().not_null())
                    .col(ColumnDef::new(Connections::UserHi).uuid().not_null())
                    .col(ColumnDef::new(Connections::InitiatorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Connections::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Connections::Message).text().null())
                    .col(
                        ColumnDef::new(Connections::Strength)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Connections::StrengthTrend)
                            .text()
                            .not_null()
                            .default("stable"),
                    )
                    .col(
                        ColumnDef::new(Connections::LastCalculatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Connections::Tags).json_binary().null())
                    .col(ColumnDef::new(Connections::InitiatorNotes).text().null())
                    .col(ColumnDef::new(Connections::RecipientNotes).text().null())
                    .col(
                        ColumnDef::new(Connections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connections::ConnectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connections::LastInteractionAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connections::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_user_lo")
                            .from(Connections::Table, Connections::UserLo)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connections_user_hi")
                            .from(Connections::Table, Connections::UserHi)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Canonical-pair uniqueness: the single atomic constraint behind
        // duplicate-edge prevention under concurrent creation.
        manager
            .create_index(
                Index::create()
                    .name("idx_connections_pair")
                    .table(Connections::Table)
                    .col(Connections::UserLo)
                    .col(Connections::UserHi)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Endpoint indexes for O(degree) neighbor lookups.
        manager
            .create_index(
                Index::create()
                    .name("idx_connections_user_lo")
                    .table(Connections::Table)
                    .col(Connections::UserLo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connections_user_hi")
                    .table(Connections::Table)
                    .col(Connections::UserHi)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_connections_pair").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_connections_user_lo").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_connections_user_hi").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Connections::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Connections {
    Table,
    Id,
    UserLo,
    UserHi,
    InitiatorId,
    Status,
    Message,
    Strength,
    StrengthTrend,
    LastCalculatedAt,
    Tags,
    InitiatorNotes,
    RecipientNotes,
    CreatedAt,
    ConnectedAt,
    LastInteractionAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
