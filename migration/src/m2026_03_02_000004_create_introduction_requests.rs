//! Migration to create the introduction_requests table.
//!
//! Introduction requests track the three-party brokering workflow
//! (requester -> introducer -> target) with a 30-day expiry window.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(IntroductionRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntroductionRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::RequesterId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::IntroducerId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::TargetId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IntroductionRequests::Subject).text().not_null())
                    .col(ColumnDef::new(IntroductionRequests::Message).text().not_null())
                    .col(ColumnDef::new(IntroductionRequests::Purpose).text().not_null())
                    .col(
                        ColumnDef::new(IntroductionRequests::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::IntroducerMessage)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::IntroducerRespondedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(IntroductionRequests::IntroSubject).text().null())
                    .col(ColumnDef::new(IntroductionRequests::IntroMessage).text().null())
                    .col(
                        ColumnDef::new(IntroductionRequests::IntroSentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::TargetAccepted)
                            .boolean()
                            .null(),
                    )
                    .col(ColumnDef::new(IntroductionRequests::TargetMessage).text().null())
                    .col(
                        ColumnDef::new(IntroductionRequests::TargetRespondedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(IntroductionRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_introduction_requests_requester_id")
                            .from(
                                IntroductionRequests::Table,
                                IntroductionRequests::RequesterId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_introduction_requests_introducer_id")
                            .from(
                                IntroductionRequests::Table,
                                IntroductionRequests::IntroducerId,
                            )
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_introduction_requests_target_id")
                            .from(IntroductionRequests::Table, IntroductionRequests::TargetId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Duplicate-request guard queries by pair and creation window.
        manager
            .create_index(
                Index::create()
                    .name("idx_introduction_requests_pair_created")
                    .table(IntroductionRequests::Table)
                    .col(IntroductionRequests::RequesterId)
                    .col(IntroductionRequests::TargetId)
                    .col(IntroductionRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_introduction_requests_introducer_status")
                    .table(IntroductionRequests::Table)
                    .col(IntroductionRequests::IntroducerId)
                    .col(IntroductionRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_introduction_requests_pair_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_introduction_requests_introducer_status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(IntroductionRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IntroductionRequests {
    Table,
    Id,
    RequesterId,
    IntroducerId,
    TargetId,
    Subject,
    Message,
    Purpose,
    Status,
    IntroducerMessage,
    IntroducerRespondedAt,
    IntroSubject,
    IntroMessage,
    IntroSentAt,
    TargetAccepted,
    TargetMessage,
    TargetRespondedAt,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
