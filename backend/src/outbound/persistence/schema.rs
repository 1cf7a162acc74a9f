//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The `hits`
//! table is written with raw SQL because its `remotehost` column is `inet`,
//! so it has no definition here.

diesel::table! {
    /// Registered short links.
    urls (id) {
        /// Primary key.
        id -> Int4,
        /// Creation timestamp.
        created -> Timestamptz,
        /// Unique short name.
        name -> Text,
        /// Redirect target.
        url -> Text,
        /// Owning user.
        #[sql_name = "user"]
        owner -> Text,
        /// Redirects served so far.
        hits -> Int4,
    }
}
