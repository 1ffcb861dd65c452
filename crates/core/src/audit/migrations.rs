//! Audit store schema migration, following the corpus's `cetane`-based
//! migration convention (one `Migration` per module, registered in order).

use cetane::prelude::*;

fn m0001_audit_records() -> Migration {
    Migration::new("0001_audit_records").operation(
        CreateTable::new("audit_records")
            .add_field(Field::new("document_id", FieldType::Text).primary_key())
            .add_field(Field::new("status", FieldType::Text).not_null())
            .add_field(Field::new("page_count", FieldType::Integer))
            .add_field(Field::new("info", FieldType::Text))
            .add_field(Field::new("created_at", FieldType::Text).not_null())
            .add_field(Field::new("updated_at", FieldType::Text).not_null()),
    )
}

pub fn registry() -> MigrationRegistry {
    let mut reg = MigrationRegistry::new();
    reg.register(m0001_audit_records());
    reg
}
