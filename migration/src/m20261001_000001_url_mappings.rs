use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 url_mappings 表，code 作为主键保证唯一
        manager
            .create_table(
                Table::create()
                    .table(UrlMapping::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UrlMapping::Code)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UrlMapping::LongUrl).text().not_null())
                    .col(
                        ColumnDef::new(UrlMapping::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UrlMapping::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // updated_at 是过期策略的 TTL 键
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_url_mappings_updated_at")
                    .table(UrlMapping::Table)
                    .col(UrlMapping::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_url_mappings_updated_at")
                    .table(UrlMapping::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UrlMapping::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UrlMapping {
    #[sea_orm(iden = "url_mappings")]
    Table,
    Code,
    LongUrl,
    CreatedAt,
    UpdatedAt,
}
