//! Test helpers for inbound HTTP components.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{StoreError, Transaction};
use crate::domain::{
    LinkId, LinkRecord, LinkSummary, NewHit, NewLink, ShortName, TargetUrl, UserName,
};

#[derive(Default)]
struct Recorded {
    events: Vec<&'static str>,
    hits: Vec<NewHit>,
    inserted: Vec<NewLink>,
    deleted: Vec<String>,
}

/// Shared record of what a [`ScriptedTransaction`] was asked to do.
#[derive(Clone, Default)]
pub struct TransactionLog {
    inner: Arc<Mutex<Recorded>>,
}

impl TransactionLog {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().expect("transaction log lock")
    }

    /// Lifecycle events in order (`commit`, `rollback`).
    pub fn events(&self) -> Vec<&'static str> {
        self.lock().events.clone()
    }

    /// Hits passed to `record_hit`.
    pub fn hits(&self) -> Vec<NewHit> {
        self.lock().hits.clone()
    }

    /// Links passed to `insert_mapping`.
    pub fn inserted(&self) -> Vec<NewLink> {
        self.lock().inserted.clone()
    }

    /// Names passed to `delete_mapping`.
    pub fn deleted(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }
}

/// Hand-written [`Transaction`] over a fixed set of links.
pub struct ScriptedTransaction {
    log: TransactionLog,
    links: Vec<LinkRecord>,
    commit_error: Option<StoreError>,
    rollback_error: Option<StoreError>,
}

impl ScriptedTransaction {
    /// Empty transaction reporting to `log`.
    pub fn new(log: &TransactionLog) -> Self {
        Self {
            log: log.clone(),
            links: Vec::new(),
            commit_error: None,
            rollback_error: None,
        }
    }

    /// Seed a link; ids are assigned in insertion order from 1.
    pub fn with_link(mut self, name: &str, url: &str, owner: &str) -> Self {
        let id = LinkId(i64::try_from(self.links.len()).expect("small fixture") + 1);
        self.links.push(LinkRecord {
            id,
            name: ShortName::new(name).expect("fixture name"),
            target: TargetUrl::parse(url).expect("fixture url"),
            owner: UserName::new(owner).expect("fixture owner"),
            hits: 0,
        });
        self
    }

    /// Make `commit` fail with `error`.
    pub fn failing_commit(mut self, error: StoreError) -> Self {
        self.commit_error = Some(error);
        self
    }

    /// Make `rollback` fail with `error`.
    pub fn failing_rollback(mut self, error: StoreError) -> Self {
        self.rollback_error = Some(error);
        self
    }

    fn find(&mut self, name: &ShortName) -> Result<&mut LinkRecord, StoreError> {
        self.links
            .iter_mut()
            .find(|link| &link.name == name)
            .ok_or_else(StoreError::not_found)
    }
}

#[async_trait]
impl Transaction for ScriptedTransaction {
    async fn lookup_and_increment_hit(
        &mut self,
        name: &ShortName,
    ) -> Result<(TargetUrl, LinkId), StoreError> {
        let link = self.find(name)?;
        link.hits += 1;
        Ok((link.target.clone(), link.id))
    }

    async fn lookup_owner(&mut self, name: &ShortName) -> Result<(LinkId, UserName), StoreError> {
        let link = self.find(name)?;
        Ok((link.id, link.owner.clone()))
    }

    async fn record_hit(&mut self, hit: &NewHit) -> Result<(), StoreError> {
        self.log.lock().hits.push(hit.clone());
        Ok(())
    }

    async fn insert_mapping(&mut self, link: &NewLink) -> Result<(), StoreError> {
        if self.links.iter().any(|existing| existing.name == link.name) {
            return Err(StoreError::duplicate(link.name.as_str()));
        }
        self.log.lock().inserted.push(link.clone());
        Ok(())
    }

    async fn delete_mapping(&mut self, name: &ShortName) -> Result<(), StoreError> {
        self.find(name)?;
        self.links.retain(|link| &link.name != name);
        self.log.lock().deleted.push(name.to_string());
        Ok(())
    }

    async fn list_mappings_for_user(
        &mut self,
        owner: &UserName,
    ) -> Result<Vec<LinkSummary>, StoreError> {
        Ok(self
            .links
            .iter()
            .filter(|link| &link.owner == owner)
            .map(|link| LinkSummary {
                name: link.name.clone(),
                target: link.target.clone(),
                hits: link.hits,
            })
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.log.lock().events.push("commit");
        self.commit_error.map_or(Ok(()), Err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.log.lock().events.push("rollback");
        self.rollback_error.map_or(Ok(()), Err)
    }
}
