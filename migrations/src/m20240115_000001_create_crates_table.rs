use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Crates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Crates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Crates::RunNumber).string().null())
                    .col(ColumnDef::new(Crates::Puc).string().not_null())
                    .col(ColumnDef::new(Crates::FarmName).string().not_null())
                    .col(ColumnDef::new(Crates::Commodity).string().not_null())
                    .col(ColumnDef::new(Crates::Variety).string().null())
                    .col(ColumnDef::new(Crates::GradeClass).string().null())
                    .col(ColumnDef::new(Crates::Size).string().null())
                    .col(ColumnDef::new(Crates::Weight).decimal().null())
                    .col(ColumnDef::new(Crates::DateReceived).date().not_null())
                    .col(ColumnDef::new(Crates::InspectorNotes).text().null())
                    .col(ColumnDef::new(Crates::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Dashboard and export both sort on date_received
        manager
            .create_index(
                Index::create()
                    .name("idx_crates_date_received")
                    .table(Crates::Table)
                    .col(Crates::DateReceived)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Crates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Crates {
    Table,
    Id,
    RunNumber,
    Puc,
    FarmName,
    Commodity,
    Variety,
    GradeClass,
    Size,
    Weight,
    DateReceived,
    InspectorNotes,
    CreatedAt,
}
