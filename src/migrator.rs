use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_products_table::Migration),
            Box::new(m20250101_000002_create_warehouses_table::Migration),
            Box::new(m20250101_000003_create_warehouse_stock_lines_table::Migration),
            Box::new(m20250101_000004_create_suppliers_table::Migration),
            Box::new(m20250101_000005_create_supplier_product_lines_table::Migration),
            Box::new(m20250101_000006_create_product_requests_table::Migration),
            Box::new(m20250101_000007_create_reservations_table::Migration),
            Box::new(m20250101_000008_create_inspection_images_table::Migration),
            Box::new(m20250101_000009_create_shipments_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Products::MinOrderQuantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Products::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(Products::Currency).string().not_null())
                        .col(
                            ColumnDef::new(Products::RequiresInspection)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::ShelfLifeDays).integer().null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_sku")
                        .table(Products::Table)
                        .col(Products::Sku)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        Unit,
        MinOrderQuantity,
        UnitPrice,
        Currency,
        RequiresInspection,
        ShelfLifeDays,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_warehouses_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_warehouses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::City).string().not_null())
                        .col(ColumnDef::new(Warehouses::State).string().not_null())
                        .col(ColumnDef::new(Warehouses::Country).string().not_null())
                        .col(ColumnDef::new(Warehouses::Address).string().null())
                        .col(
                            ColumnDef::new(Warehouses::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Warehouses {
        Table,
        Id,
        Code,
        Name,
        City,
        State,
        Country,
        Address,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_warehouse_stock_lines_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_warehouse_stock_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseStockLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseStockLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::ReservedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::BatchNumber)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(WarehouseStockLines::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(WarehouseStockLines::LocationCode)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStockLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_stock_lines_warehouse_product")
                        .table(WarehouseStockLines::Table)
                        .col(WarehouseStockLines::WarehouseId)
                        .col(WarehouseStockLines::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseStockLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseStockLines {
        Table,
        Id,
        WarehouseId,
        ProductId,
        Quantity,
        ReservedQuantity,
        BatchNumber,
        ExpiryDate,
        LocationCode,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_suppliers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::Code)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::Country).string().not_null())
                        .col(ColumnDef::new(Suppliers::City).string().null())
                        .col(
                            ColumnDef::new(Suppliers::LeadTimeDays)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::ReliabilityScore)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Code,
        Name,
        Country,
        City,
        LeadTimeDays,
        ReliabilityScore,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_supplier_product_lines_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_supplier_product_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SupplierProductLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierProductLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::SupplierId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::AvailableQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::MinOrderQuantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::Currency)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::CustomLeadTimeDays)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierProductLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_product_lines_supplier_product")
                        .table(SupplierProductLines::Table)
                        .col(SupplierProductLines::SupplierId)
                        .col(SupplierProductLines::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierProductLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum SupplierProductLines {
        Table,
        Id,
        SupplierId,
        ProductId,
        AvailableQuantity,
        MinOrderQuantity,
        UnitPrice,
        Currency,
        CustomLeadTimeDays,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000006_create_product_requests_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000006_create_product_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::RequestNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductRequests::DealerId).uuid().not_null())
                        .col(ColumnDef::new(ProductRequests::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductRequests::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::PlannedQuantity)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::DeliveryLocation)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::DeliveryCity)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::DeliveryState)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductRequests::Status).string().not_null())
                        .col(
                            ColumnDef::new(ProductRequests::RecommendedSource)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::RecommendationExplanation)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::RequestedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::EstimatedDeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductRequests::DealerNotes).text().null())
                        .col(
                            ColumnDef::new(ProductRequests::ProcurementNotes)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::ConfirmedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_requests_dealer_id")
                        .table(ProductRequests::Table)
                        .col(ProductRequests::DealerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_requests_status")
                        .table(ProductRequests::Table)
                        .col(ProductRequests::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductRequests {
        Table,
        Id,
        RequestNumber,
        DealerId,
        ProductId,
        Quantity,
        PlannedQuantity,
        DeliveryLocation,
        DeliveryCity,
        DeliveryState,
        Status,
        RecommendedSource,
        RecommendationExplanation,
        RequestedDeliveryDate,
        EstimatedDeliveryDate,
        DealerNotes,
        ProcurementNotes,
        ConfirmedAt,
        CompletedAt,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000007_create_reservations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000007_create_reservations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reservations::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reservations::RequestId).uuid().not_null())
                        .col(ColumnDef::new(Reservations::SourceType).string().not_null())
                        .col(ColumnDef::new(Reservations::SourceId).uuid().not_null())
                        .col(ColumnDef::new(Reservations::Quantity).integer().not_null())
                        .col(ColumnDef::new(Reservations::Status).string().not_null())
                        .col(
                            ColumnDef::new(Reservations::IsBlocked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Reservations::BlockReason).string().null())
                        .col(
                            ColumnDef::new(Reservations::IsPicked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Reservations::PickedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Reservations::PickedBy).uuid().null())
                        .col(ColumnDef::new(Reservations::Lifecycle).string().not_null())
                        .col(ColumnDef::new(Reservations::ReplacedById).uuid().null())
                        .col(
                            ColumnDef::new(Reservations::IsReplacement)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Reservations::OriginalReservationId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::ResolutionNotes)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Reservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_request_id")
                        .table(Reservations::Table)
                        .col(Reservations::RequestId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_lifecycle")
                        .table(Reservations::Table)
                        .col(Reservations::Lifecycle)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reservations {
        Table,
        Id,
        RequestId,
        SourceType,
        SourceId,
        Quantity,
        Status,
        IsBlocked,
        BlockReason,
        IsPicked,
        PickedAt,
        PickedBy,
        Lifecycle,
        ReplacedById,
        IsReplacement,
        OriginalReservationId,
        ResolutionNotes,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000008_create_inspection_images_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000008_create_inspection_images_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(InspectionImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InspectionImages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InspectionImages::RequestId).uuid().not_null())
                        .col(
                            ColumnDef::new(InspectionImages::ReservationId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::UploadedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::Filename)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::ImageType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InspectionImages::Result).string().not_null())
                        .col(
                            ColumnDef::new(InspectionImages::ConfidenceScore)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::DamageDetected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(InspectionImages::DamageType).string().null())
                        .col(
                            ColumnDef::new(InspectionImages::DamageSeverity)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::ExpiryDetected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::DetectedExpiryDate)
                                .date()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::IsExpired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(InspectionImages::SealIntact).boolean().null())
                        .col(
                            ColumnDef::new(InspectionImages::SpoilageDetected)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::Overridden)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::OverrideResult)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::OverrideReason)
                                .text()
                                .null(),
                        )
                        .col(ColumnDef::new(InspectionImages::OverriddenBy).uuid().null())
                        .col(
                            ColumnDef::new(InspectionImages::OverriddenAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(InspectionImages::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inspection_images_request_id")
                        .table(InspectionImages::Table)
                        .col(InspectionImages::RequestId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_inspection_images_reservation_id")
                        .table(InspectionImages::Table)
                        .col(InspectionImages::ReservationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InspectionImages::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum InspectionImages {
        Table,
        Id,
        RequestId,
        ReservationId,
        UploadedBy,
        Filename,
        ImageType,
        Result,
        ConfidenceScore,
        DamageDetected,
        DamageType,
        DamageSeverity,
        ExpiryDetected,
        DetectedExpiryDate,
        IsExpired,
        SealIntact,
        SpoilageDetected,
        Overridden,
        OverrideResult,
        OverrideReason,
        OverriddenBy,
        OverriddenAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000009_create_shipments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000009_create_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::RequestId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::ReservationId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::SourceType).string().not_null())
                        .col(ColumnDef::new(Shipments::SourceId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::Quantity).integer().not_null())
                        .col(ColumnDef::new(Shipments::Status).string().not_null())
                        .col(ColumnDef::new(Shipments::Carrier).string().null())
                        .col(
                            ColumnDef::new(Shipments::TrackingNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DispatchDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeliveryDate)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::DeliveryAddress)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::DeliveryCity).string().null())
                        .col(ColumnDef::new(Shipments::DeliveryState).string().null())
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_request_id")
                        .table(Shipments::Table)
                        .col(Shipments::RequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shipments {
        Table,
        Id,
        RequestId,
        ReservationId,
        SourceType,
        SourceId,
        Quantity,
        Status,
        Carrier,
        TrackingNumber,
        DispatchDate,
        DeliveryDate,
        DeliveryAddress,
        DeliveryCity,
        DeliveryState,
        CreatedAt,
        UpdatedAt,
    }
}
