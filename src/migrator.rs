use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_counting_records_table::Migration),
            Box::new(m20240301_000002_create_cold_rooms_table::Migration),
            Box::new(m20240301_000003_create_cold_room_boxes_table::Migration),
            Box::new(m20240301_000004_create_pallets_table::Migration),
            Box::new(m20240301_000005_create_balance_entries_table::Migration),
        ]
    }
}

mod m20240301_000001_create_counting_records_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_counting_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CountingRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CountingRecords::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::SupplierName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CountingRecords::Region).string().null())
                        .col(
                            ColumnDef::new(CountingRecords::SubmittedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::CountingTotals)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::RemainingBoxes)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::HasRemaining)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CountingRecords::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_counting_records_has_remaining")
                        .table(CountingRecords::Table)
                        .col(CountingRecords::HasRemaining)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CountingRecords::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CountingRecords {
        Table,
        Id,
        SupplierName,
        Region,
        SubmittedAt,
        CountingTotals,
        RemainingBoxes,
        HasRemaining,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_cold_rooms_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_cold_rooms_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ColdRooms::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ColdRooms::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(ColdRooms::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ColdRooms::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ColdRooms::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ColdRooms {
        Table,
        Id,
        Name,
        CreatedAt,
    }
}

mod m20240301_000003_create_cold_room_boxes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_cold_room_boxes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ColdRoomBoxes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ColdRoomBoxes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ColdRoomBoxes::Variety).string().not_null())
                        .col(ColumnDef::new(ColdRoomBoxes::BoxType).string().not_null())
                        .col(ColumnDef::new(ColdRoomBoxes::Grade).string().not_null())
                        .col(ColumnDef::new(ColdRoomBoxes::Size).string().not_null())
                        .col(
                            ColumnDef::new(ColdRoomBoxes::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ColdRoomBoxes::ColdRoomId).uuid().not_null())
                        .col(
                            ColumnDef::new(ColdRoomBoxes::SupplierName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ColdRoomBoxes::SourceCountingRecordId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ColdRoomBoxes::IsInPallet)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ColdRoomBoxes::PalletId).uuid().null())
                        .col(
                            ColumnDef::new(ColdRoomBoxes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ColdRoomBoxes::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Lookup path of the duplicate guard and the dissolution merge.
            manager
                .create_index(
                    Index::create()
                        .name("idx_cold_room_boxes_bucket")
                        .table(ColdRoomBoxes::Table)
                        .col(ColdRoomBoxes::SourceCountingRecordId)
                        .col(ColdRoomBoxes::ColdRoomId)
                        .col(ColdRoomBoxes::Variety)
                        .col(ColdRoomBoxes::BoxType)
                        .col(ColdRoomBoxes::Grade)
                        .col(ColdRoomBoxes::Size)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cold_room_boxes_pallet")
                        .table(ColdRoomBoxes::Table)
                        .col(ColdRoomBoxes::PalletId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ColdRoomBoxes::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ColdRoomBoxes {
        Table,
        Id,
        Variety,
        BoxType,
        Grade,
        Size,
        Quantity,
        ColdRoomId,
        SupplierName,
        SourceCountingRecordId,
        IsInPallet,
        PalletId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_pallets_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_pallets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Pallets::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Pallets::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Pallets::Name).string().not_null())
                        .col(ColumnDef::new(Pallets::ColdRoomId).uuid().not_null())
                        .col(ColumnDef::new(Pallets::BoxType).string().not_null())
                        .col(
                            ColumnDef::new(Pallets::BoxesPerPallet)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Pallets::TotalBoxes)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Pallets::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Pallets::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_pallets_cold_room")
                        .table(Pallets::Table)
                        .col(Pallets::ColdRoomId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Pallets::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Pallets {
        Table,
        Id,
        Name,
        ColdRoomId,
        BoxType,
        BoxesPerPallet,
        TotalBoxes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_balance_entries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_balance_entries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BalanceEntries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BalanceEntries::UniqueKey)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BalanceEntries::CountingRecordId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BalanceEntries::LoadedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BalanceEntries::LoadingHistory)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BalanceEntries::UpdatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_balance_entries_record")
                        .table(BalanceEntries::Table)
                        .col(BalanceEntries::CountingRecordId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BalanceEntries::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum BalanceEntries {
        Table,
        UniqueKey,
        CountingRecordId,
        LoadedQuantity,
        LoadingHistory,
        UpdatedAt,
    }
}
