//! In-memory transaction store.
//!
//! Backs the server when no database is configured and drives the HTTP
//! tests. Transactions are serialisable: `begin` takes the store lock and
//! holds it until the transaction ends. Writes land in place and leave an
//! undo entry; dropping an unfinished transaction replays the entries
//! backwards. New hits are buffered and appended on `commit`, so a request
//! never copies the hit history.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ports::{StoreError, Transaction, TransactionStore};
use crate::domain::{
    HitRecord, LinkId, LinkRecord, LinkSummary, NewHit, NewLink, ShortName, TargetUrl, UserName,
};

#[derive(Debug, Default)]
struct Tables {
    /// Keyed by id, which is also creation order.
    links: BTreeMap<LinkId, LinkRecord>,
    names: HashMap<ShortName, LinkId>,
    hits: BTreeMap<LinkId, Vec<HitRecord>>,
    /// Never reused, even when an insert is rolled back.
    last_id: i64,
}

impl Tables {
    fn id_of(&self, name: &ShortName) -> Result<LinkId, StoreError> {
        self.names.get(name).copied().ok_or_else(StoreError::not_found)
    }

    fn link_mut(&mut self, name: &ShortName) -> Result<&mut LinkRecord, StoreError> {
        let id = self.id_of(name)?;
        self.links.get_mut(&id).ok_or_else(StoreError::not_found)
    }

    fn revert(&mut self, entry: Undo) {
        match entry {
            Undo::Increment(id) => {
                if let Some(link) = self.links.get_mut(&id) {
                    link.hits -= 1;
                }
            }
            Undo::Insert(id) => {
                if let Some(link) = self.links.remove(&id) {
                    self.names.remove(&link.name);
                }
                self.hits.remove(&id);
            }
            Undo::Delete { link, hits } => {
                self.names.insert(link.name.clone(), link.id);
                if !hits.is_empty() {
                    self.hits.insert(link.id, hits);
                }
                self.links.insert(link.id, link);
            }
        }
    }
}

/// Inverse of one write made inside a transaction.
#[derive(Debug)]
enum Undo {
    Increment(LinkId),
    Insert(LinkId),
    Delete {
        link: LinkRecord,
        hits: Vec<HitRecord>,
    },
}

/// Process-local [`TransactionStore`].
#[derive(Clone)]
pub struct InMemoryTransactionStore {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl InMemoryTransactionStore {
    /// Empty store stamping hits with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }

    /// Committed state of `name`.
    ///
    /// Waits for any open transaction to finish.
    pub async fn link(&self, name: &str) -> Option<LinkRecord> {
        let name = ShortName::new(name).ok()?;
        let tables = self.tables.lock().await;
        let id = tables.id_of(&name).ok()?;
        tables.links.get(&id).cloned()
    }

    /// Committed hits recorded against `name`, oldest first.
    pub async fn hits_for(&self, name: &str) -> Vec<HitRecord> {
        let Ok(name) = ShortName::new(name) else {
            return Vec::new();
        };
        let tables = self.tables.lock().await;
        tables
            .id_of(&name)
            .ok()
            .and_then(|id| tables.hits.get(&id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            undo: Vec::new(),
            pending_hits: Vec::new(),
            clock: Arc::clone(&self.clock),
        }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
    pending_hits: Vec<HitRecord>,
    clock: Arc<dyn Clock>,
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        let undo = std::mem::take(&mut self.undo);
        for entry in undo.into_iter().rev() {
            self.guard.revert(entry);
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn lookup_and_increment_hit(
        &mut self,
        name: &ShortName,
    ) -> Result<(TargetUrl, LinkId), StoreError> {
        let link = self.guard.link_mut(name)?;
        link.hits += 1;
        let found = (link.target.clone(), link.id);
        self.undo.push(Undo::Increment(found.1));
        Ok(found)
    }

    async fn lookup_owner(&mut self, name: &ShortName) -> Result<(LinkId, UserName), StoreError> {
        let link = self.guard.link_mut(name)?;
        Ok((link.id, link.owner.clone()))
    }

    async fn record_hit(&mut self, hit: &NewHit) -> Result<(), StoreError> {
        if !self.guard.links.contains_key(&hit.link) {
            return Err(StoreError::query(format!(
                "hit references unknown link {}",
                hit.link.0
            )));
        }
        self.pending_hits.push(HitRecord {
            hit: hit.clone(),
            recorded_at: self.clock.utc(),
        });
        Ok(())
    }

    async fn insert_mapping(&mut self, link: &NewLink) -> Result<(), StoreError> {
        if self.guard.names.contains_key(&link.name) {
            return Err(StoreError::duplicate(link.name.as_str()));
        }
        self.guard.last_id += 1;
        let id = LinkId(self.guard.last_id);
        self.guard.names.insert(link.name.clone(), id);
        self.guard.links.insert(
            id,
            LinkRecord {
                id,
                name: link.name.clone(),
                target: link.target.clone(),
                owner: link.owner.clone(),
                hits: 0,
            },
        );
        self.undo.push(Undo::Insert(id));
        Ok(())
    }

    async fn delete_mapping(&mut self, name: &ShortName) -> Result<(), StoreError> {
        let id = self.guard.id_of(name)?;
        self.guard.names.remove(name);
        let hits = self.guard.hits.remove(&id).unwrap_or_default();
        if let Some(link) = self.guard.links.remove(&id) {
            self.undo.push(Undo::Delete { link, hits });
        }
        Ok(())
    }

    async fn list_mappings_for_user(
        &mut self,
        owner: &UserName,
    ) -> Result<Vec<LinkSummary>, StoreError> {
        Ok(self
            .guard
            .links
            .values()
            .filter(|link| &link.owner == owner)
            .map(|link| LinkSummary {
                name: link.name.clone(),
                target: link.target.clone(),
                hits: link.hits,
            })
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = self;
        let pending = std::mem::take(&mut this.pending_hits);
        for record in pending {
            // Hits on a link deleted later in the same transaction go with it.
            if this.guard.links.contains_key(&record.hit.link) {
                this.guard.hits.entry(record.hit.link).or_default().push(record);
            }
        }
        this.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Local, TimeZone, Utc};
    use rstest::{fixture, rstest};

    struct FixtureClock {
        utc_now: DateTime<Utc>,
    }

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.utc_now.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.utc_now
        }
    }

    fn fixture_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 6, 1, 12, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    #[fixture]
    fn store() -> InMemoryTransactionStore {
        InMemoryTransactionStore::new(Arc::new(FixtureClock {
            utc_now: fixture_timestamp(),
        }))
    }

    fn new_link(name: &str, url: &str, owner: &str) -> NewLink {
        NewLink {
            name: ShortName::new(name).expect("name"),
            target: TargetUrl::parse(url).expect("url"),
            owner: UserName::new(owner).expect("owner"),
        }
    }

    async fn seed(store: &InMemoryTransactionStore, link: NewLink) {
        let mut tx = store.begin().await.expect("begin");
        tx.insert_mapping(&link).await.expect("insert");
        tx.commit().await.expect("commit");
    }

    #[rstest]
    #[tokio::test]
    async fn committed_inserts_are_visible(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;

        let link = store.link("baz").await.expect("link exists");

        assert_eq!(link.target.as_str(), "http://example.com");
        assert_eq!(link.owner.as_str(), "test");
        assert_eq!(link.hits, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn rolled_back_and_dropped_transactions_leave_no_trace(store: InMemoryTransactionStore) {
        let mut tx = store.begin().await.expect("begin");
        tx.insert_mapping(&new_link("a", "http://example.com", "test"))
            .await
            .expect("insert");
        tx.rollback().await.expect("rollback");

        let mut tx = store.begin().await.expect("begin");
        tx.insert_mapping(&new_link("b", "http://example.com", "test"))
            .await
            .expect("insert");
        drop(tx);

        assert!(store.link("a").await.is_none());
        assert!(store.link("b").await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_names_are_rejected(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;

        let mut tx = store.begin().await.expect("begin");
        let err = tx
            .insert_mapping(&new_link("baz", "http://example.org", "other"))
            .await
            .expect_err("duplicate");

        assert_eq!(err, StoreError::duplicate("baz"));
    }

    #[rstest]
    #[tokio::test]
    async fn hits_are_counted_and_stamped(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;
        let name = ShortName::new("baz").expect("name");

        let mut tx = store.begin().await.expect("begin");
        let (target, id) = tx.lookup_and_increment_hit(&name).await.expect("lookup");
        tx.record_hit(&NewHit {
            link: id,
            remote: "127.0.0.1".parse().expect("ip"),
            user_agent: "curl/8".to_owned(),
            referrer: None,
        })
        .await
        .expect("record hit");
        tx.commit().await.expect("commit");

        assert_eq!(target.as_str(), "http://example.com");
        assert_eq!(store.link("baz").await.expect("link").hits, 1);
        let hits = store.hits_for("baz").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].recorded_at, fixture_timestamp());
    }

    fn hit_on(link: LinkId, agent: &str) -> NewHit {
        NewHit {
            link,
            remote: "127.0.0.1".parse().expect("ip"),
            user_agent: agent.to_owned(),
            referrer: None,
        }
    }

    async fn redirect(store: &InMemoryTransactionStore, name: &str, agent: &str) -> Box<dyn Transaction> {
        let name = ShortName::new(name).expect("name");
        let mut tx = store.begin().await.expect("begin");
        let (_, id) = tx.lookup_and_increment_hit(&name).await.expect("lookup");
        tx.record_hit(&hit_on(id, agent)).await.expect("record hit");
        tx
    }

    #[rstest]
    #[tokio::test]
    async fn rolled_back_hits_leave_counts_and_history_untouched(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;
        redirect(&store, "baz", "first").await.commit().await.expect("commit");

        redirect(&store, "baz", "second").await.rollback().await.expect("rollback");
        drop(redirect(&store, "baz", "third").await);

        assert_eq!(store.link("baz").await.expect("link").hits, 1);
        let agents: Vec<_> = store
            .hits_for("baz")
            .await
            .into_iter()
            .map(|record| record.hit.user_agent)
            .collect();
        assert_eq!(agents, vec!["first"]);
    }

    #[rstest]
    #[tokio::test]
    async fn commits_append_to_earlier_hits(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;
        seed(&store, new_link("qux", "http://example.org", "test")).await;

        for agent in ["one", "two", "three"] {
            redirect(&store, "baz", agent).await.commit().await.expect("commit");
        }
        redirect(&store, "qux", "other").await.commit().await.expect("commit");

        assert_eq!(store.link("baz").await.expect("link").hits, 3);
        let agents: Vec<_> = store
            .hits_for("baz")
            .await
            .into_iter()
            .map(|record| record.hit.user_agent)
            .collect();
        assert_eq!(agents, vec!["one", "two", "three"]);
        assert_eq!(store.hits_for("qux").await.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn rolled_back_deletes_restore_the_link_and_its_hits(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;
        redirect(&store, "baz", "kept").await.commit().await.expect("commit");
        let name = ShortName::new("baz").expect("name");

        let mut tx = store.begin().await.expect("begin");
        tx.delete_mapping(&name).await.expect("delete");
        assert_eq!(tx.lookup_owner(&name).await, Err(StoreError::NotFound));
        tx.rollback().await.expect("rollback");

        let link = store.link("baz").await.expect("link restored");
        assert_eq!(link.hits, 1);
        assert_eq!(store.hits_for("baz").await.len(), 1);

        let mut tx = store.begin().await.expect("begin");
        let (target, _) = tx.lookup_and_increment_hit(&name).await.expect("lookup");
        assert_eq!(target.as_str(), "http://example.com");
    }

    #[rstest]
    #[tokio::test]
    async fn rolled_back_inserts_do_not_reuse_ids(store: InMemoryTransactionStore) {
        let mut tx = store.begin().await.expect("begin");
        tx.insert_mapping(&new_link("gone", "http://example.com", "test"))
            .await
            .expect("insert");
        drop(tx);
        seed(&store, new_link("kept", "http://example.com", "test")).await;

        assert_eq!(store.link("kept").await.expect("link").id, LinkId(2));
        assert!(store.link("gone").await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn misses_are_not_found(store: InMemoryTransactionStore) {
        let name = ShortName::new("nope").expect("name");
        let mut tx = store.begin().await.expect("begin");

        assert_eq!(
            tx.lookup_and_increment_hit(&name).await,
            Err(StoreError::NotFound)
        );
        assert_eq!(tx.lookup_owner(&name).await, Err(StoreError::NotFound));
        assert_eq!(tx.delete_mapping(&name).await, Err(StoreError::NotFound));
    }

    #[rstest]
    #[tokio::test]
    async fn delete_removes_the_link_and_its_hits(store: InMemoryTransactionStore) {
        seed(&store, new_link("baz", "http://example.com", "test")).await;
        let name = ShortName::new("baz").expect("name");

        let mut tx = store.begin().await.expect("begin");
        tx.delete_mapping(&name).await.expect("delete");
        tx.commit().await.expect("commit");

        assert!(store.link("baz").await.is_none());
        assert!(store.hits_for("baz").await.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn listing_is_per_owner_in_creation_order(store: InMemoryTransactionStore) {
        seed(&store, new_link("b", "http://example.com/b", "ada")).await;
        seed(&store, new_link("x", "http://example.com/x", "bob")).await;
        seed(&store, new_link("a", "http://example.com/a", "ada")).await;

        let mut tx = store.begin().await.expect("begin");
        let ada = tx
            .list_mappings_for_user(&UserName::new("ada").expect("owner"))
            .await
            .expect("list");
        let nobody = tx
            .list_mappings_for_user(&UserName::new("carol").expect("owner"))
            .await
            .expect("list");

        let names: Vec<_> = ada.iter().map(|link| link.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(nobody.is_empty());
    }
}
