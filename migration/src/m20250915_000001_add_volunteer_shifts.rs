use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    MaxShiftsPerUser,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    EventId,
    Name,
    Description,
    CreatedAt,
    UpdatedAt,
}

/// Many-to-many: users allowed to manage a role's shifts
#[derive(DeriveIden)]
enum RoleLeads {
    Table,
    Id,
    RoleId,
    UserId,
}

#[derive(DeriveIden)]
enum Shifts {
    Table,
    Id,
    RoleId,
    StartTime,
    EndTime,
    Capacity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ShiftAssignments {
    Table,
    Id,
    ShiftId,
    UserId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 0 = unlimited
        manager
            .alter_table(
                Table::alter()
                    .table(Events::Table)
                    .add_column(
                        ColumnDef::new(Events::MaxShiftsPerUser)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Roles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Roles::EventId).integer().not_null())
                    .col(ColumnDef::new(Roles::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Roles::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Roles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Roles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roles_event")
                            .from(Roles::Table, Roles::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_roles_event_name_unique")
                    .table(Roles::Table)
                    .col(Roles::EventId)
                    .col(Roles::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleLeads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleLeads::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleLeads::RoleId).integer().not_null())
                    .col(ColumnDef::new(RoleLeads::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_leads_role")
                            .from(RoleLeads::Table, RoleLeads::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_leads_user")
                            .from(RoleLeads::Table, RoleLeads::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_role_leads_unique")
                    .table(RoleLeads::Table)
                    .col(RoleLeads::RoleId)
                    .col(RoleLeads::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Shifts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shifts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shifts::RoleId).integer().not_null())
                    .col(
                        ColumnDef::new(Shifts::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shifts::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shifts::Capacity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Shifts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Shifts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shifts_role")
                            .from(Shifts::Table, Shifts::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shifts_role_window_unique")
                    .table(Shifts::Table)
                    .col(Shifts::RoleId)
                    .col(Shifts::StartTime)
                    .col(Shifts::EndTime)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShiftAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShiftAssignments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShiftAssignments::ShiftId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShiftAssignments::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShiftAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shift_assignments_shift")
                            .from(ShiftAssignments::Table, ShiftAssignments::ShiftId)
                            .to(Shifts::Table, Shifts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shift_assignments_user")
                            .from(ShiftAssignments::Table, ShiftAssignments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // concurrent duplicate signups: exactly one insert wins
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_shift_assignments_unique")
                    .table(ShiftAssignments::Table)
                    .col(ShiftAssignments::ShiftId)
                    .col(ShiftAssignments::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(ShiftAssignments::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Shifts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(RoleLeads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Roles::Table).to_owned())
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Events::Table)
                    .drop_column(Events::MaxShiftsPerUser)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
