//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain.

use diesel::prelude::*;

use super::schema::urls;

/// Listing row from the urls table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = urls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UrlSummaryRow {
    pub name: String,
    pub url: String,
    pub hits: i32,
}

/// Insertable struct for creating url records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = urls)]
pub(crate) struct NewUrlRow<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub owner: &'a str,
}
