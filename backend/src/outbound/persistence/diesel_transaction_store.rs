//! PostgreSQL-backed `TransactionStore` implementation using Diesel ORM.
//!
//! Each transaction owns one pooled connection for its whole lifetime and
//! drives `BEGIN`/`COMMIT`/`ROLLBACK` explicitly through Diesel's
//! `AnsiTransactionManager`. When a schema is configured it is pinned with
//! `SET LOCAL search_path` right after `BEGIN`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Int4, Nullable, Text};
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};

use crate::domain::ports::{StoreError, Transaction, TransactionStore};
use crate::domain::{
    LinkId, LinkSummary, NewHit, NewLink, ShortName, TargetUrl, UserName,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewUrlRow, UrlSummaryRow};
use super::pool::DbPool;
use super::schema::urls;

const INSERT_HIT: &str =
    "INSERT INTO hits (url_id, remotehost, agent, referrer) VALUES ($1, $2::inet, $3, $4)";

/// Diesel-backed implementation of the `TransactionStore` port.
#[derive(Clone)]
pub struct DieselTransactionStore {
    pool: DbPool,
}

impl DieselTransactionStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for DieselTransactionStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let mut conn = self.pool.checkout().await.map_err(map_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        let mut transaction = DieselTransaction { conn };
        if let Some(schema) = self.pool.schema() {
            diesel::sql_query(format!("SET LOCAL search_path TO {}", schema.quoted()))
                .execute(transaction.conn())
                .await
                .map_err(|err| map_diesel_error(err, None))?;
        }
        Ok(Box::new(transaction))
    }
}

/// One open PostgreSQL transaction.
///
/// Dropping it unfinished drops the connection mid-transaction; the pool
/// discards such connections and the server rolls back.
struct DieselTransaction {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl DieselTransaction {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

fn link_id(id: i32) -> LinkId {
    LinkId(i64::from(id))
}

fn row_id(id: LinkId) -> Result<i32, StoreError> {
    i32::try_from(id.0).map_err(|_| StoreError::query(format!("link id {} out of range", id.0)))
}

fn corrupt(field: &str, name: &str) -> StoreError {
    StoreError::query(format!("invalid {field} stored for {name:?}"))
}

fn row_to_summary(row: UrlSummaryRow) -> Result<LinkSummary, StoreError> {
    let name = ShortName::new(row.name.as_str()).map_err(|_| corrupt("name", &row.name))?;
    Ok(LinkSummary {
        name,
        target: TargetUrl::from_stored(row.url),
        hits: i64::from(row.hits),
    })
}

#[async_trait]
impl Transaction for DieselTransaction {
    async fn lookup_and_increment_hit(
        &mut self,
        name: &ShortName,
    ) -> Result<(TargetUrl, LinkId), StoreError> {
        let (id, url): (i32, String) = diesel::update(urls::table.filter(urls::name.eq(name.as_str())))
            .set(urls::hits.eq(urls::hits + 1))
            .returning((urls::id, urls::url))
            .get_result(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        Ok((TargetUrl::from_stored(url), link_id(id)))
    }

    async fn lookup_owner(&mut self, name: &ShortName) -> Result<(LinkId, UserName), StoreError> {
        let (id, owner): (i32, String) = urls::table
            .filter(urls::name.eq(name.as_str()))
            .select((urls::id, urls::owner))
            .first(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        let owner = UserName::new(owner).ok_or_else(|| corrupt("owner", name.as_str()))?;
        Ok((link_id(id), owner))
    }

    async fn record_hit(&mut self, hit: &NewHit) -> Result<(), StoreError> {
        diesel::sql_query(INSERT_HIT)
            .bind::<Int4, _>(row_id(hit.link)?)
            .bind::<Text, _>(hit.remote.to_string())
            .bind::<Text, _>(hit.user_agent.as_str())
            .bind::<Nullable<Text>, _>(hit.referrer.as_deref())
            .execute(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        Ok(())
    }

    async fn insert_mapping(&mut self, link: &NewLink) -> Result<(), StoreError> {
        let row = NewUrlRow {
            name: link.name.as_str(),
            url: link.target.as_str(),
            owner: link.owner.as_str(),
        };
        diesel::insert_into(urls::table)
            .values(&row)
            .execute(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, Some(link.name.as_str())))?;
        Ok(())
    }

    async fn delete_mapping(&mut self, name: &ShortName) -> Result<(), StoreError> {
        let deleted = diesel::delete(urls::table.filter(urls::name.eq(name.as_str())))
            .execute(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        if deleted == 0 {
            return Err(StoreError::not_found());
        }
        Ok(())
    }

    async fn list_mappings_for_user(
        &mut self,
        owner: &UserName,
    ) -> Result<Vec<LinkSummary>, StoreError> {
        let rows: Vec<UrlSummaryRow> = urls::table
            .filter(urls::owner.eq(owner.as_str()))
            .order(urls::id.asc())
            .select(UrlSummaryRow::as_select())
            .load(self.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        rows.into_iter().map(row_to_summary).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        AnsiTransactionManager::commit_transaction(this.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        AnsiTransactionManager::rollback_transaction(this.conn())
            .await
            .map_err(|err| map_diesel_error(err, None))
    }
}
