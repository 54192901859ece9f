#![forbid(unsafe_code)]

mod attachments;
mod core;
mod indexes;
mod records;

pub(super) use indexes::SQL as INDEXES;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(core::SQL);
    sql.push_str(records::SQL);
    sql.push_str(attachments::SQL);
    sql
}
