use sea_orm_migration::prelude::*;

use crate::m20240610_000001_create_tables::{Notifications, Orders};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The webhook matches orders by the provider session id.
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_transaction_id")
                    .table(Orders::Table)
                    .col(Orders::TransactionId)
                    .to_owned(),
            )
            .await?;

        // Unread-notification scans are always per user.
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_transaction_id")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
