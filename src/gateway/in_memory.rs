//! InMemoryGateway - shared in-process remote store for testing and development.

use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{GatewayError, RemoteSyncGateway};
use crate::Record;

/// A one-shot failure armed on the gateway. The first matching call fails
/// with `GatewayError::Transport` and consumes the fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault<I> {
    List,
    Search,
    Create,
    Update(I),
    Delete(I),
}

/// A call received by the gateway, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall<I> {
    List,
    Search { field: String, term: String },
    Create,
    Update(I),
    Delete(I),
}

struct Storage<R: Record> {
    records: Vec<R>,
    next_id: u32,
    faults: Vec<Fault<R::Id>>,
    calls: Vec<GatewayCall<R::Id>>,
}

/// In-memory remote store holding one collection of `R`.
///
/// Clone-friendly via Arc: clones share storage, so a test can hand one
/// handle to a controller and inspect the other.
#[derive(Clone)]
pub struct InMemoryGateway<R: Record> {
    storage: Arc<RwLock<Storage<R>>>,
    assign: Option<fn(u32) -> R::Id>,
    latency: Option<Duration>,
}

impl<R: Record> InMemoryGateway<R>
where
    R::Id: From<u32>,
{
    /// A store that assigns ids from a counter on create, like a database
    /// sequence.
    pub fn sequential() -> Self {
        Self::with_assignment(Some(<R::Id as From<u32>>::from))
    }
}

impl<R: Record> InMemoryGateway<R> {
    /// A store that keeps the id carried by the created record (natural
    /// keys such as usernames). Creating an existing id is a `Conflict`.
    pub fn client_keyed() -> Self {
        Self::with_assignment(None)
    }

    fn with_assignment(assign: Option<fn(u32) -> R::Id>) -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage {
                records: Vec::new(),
                next_id: 1,
                faults: Vec::new(),
                calls: Vec::new(),
            })),
            assign,
            latency: None,
        }
    }

    /// Delay every call by `latency` before it touches storage.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Pre-populate the store, keeping the given ids. Does not journal.
    pub fn seed(&self, records: impl IntoIterator<Item = R>) {
        if let Ok(mut storage) = self.storage.write() {
            for record in records {
                storage.records.retain(|r| r.id() != record.id());
                storage.records.push(record);
            }
        }
    }

    /// Arm a one-shot fault.
    pub fn inject(&self, fault: Fault<R::Id>) {
        if let Ok(mut storage) = self.storage.write() {
            storage.faults.push(fault);
        }
    }

    /// Snapshot of the stored records, in server order.
    pub fn records(&self) -> Vec<R> {
        self.storage
            .read()
            .map(|s| s.records.clone())
            .unwrap_or_default()
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<GatewayCall<R::Id>> {
        self.storage
            .read()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Ids passed to `delete`, in arrival order.
    pub fn deletes(&self) -> Vec<R::Id> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Number of `create` calls received.
    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, GatewayCall::Create))
            .count()
    }

    /// Forget the journal.
    pub fn clear_calls(&self) {
        if let Ok(mut storage) = self.storage.write() {
            storage.calls.clear();
        }
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Journal the call, check the collection name and consume a matching
    /// fault.
    fn enter(
        &self,
        collection: &str,
        call: GatewayCall<R::Id>,
    ) -> Result<RwLockWriteGuard<'_, Storage<R>>, GatewayError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| GatewayError::Transport("storage lock poisoned".into()))?;

        let fault = match &call {
            GatewayCall::List => Fault::List,
            GatewayCall::Search { .. } => Fault::Search,
            GatewayCall::Create => Fault::Create,
            GatewayCall::Update(id) => Fault::Update(id.clone()),
            GatewayCall::Delete(id) => Fault::Delete(id.clone()),
        };
        storage.calls.push(call);

        if collection != R::COLLECTION {
            return Err(GatewayError::Status {
                code: 404,
                message: format!("unknown collection {}", collection),
            });
        }

        if let Some(pos) = storage.faults.iter().position(|f| *f == fault) {
            storage.faults.remove(pos);
            tracing::debug!(collection, ?fault, "injected fault triggered");
            return Err(GatewayError::Transport("injected fault".into()));
        }

        Ok(storage)
    }
}

#[async_trait]
impl<R: Record> RemoteSyncGateway<R> for InMemoryGateway<R> {
    async fn list(&self, collection: &str) -> Result<Vec<R>, GatewayError> {
        self.pause().await;
        let storage = self.enter(collection, GatewayCall::List)?;
        Ok(storage.records.clone())
    }

    async fn search(
        &self,
        collection: &str,
        field: &str,
        term: &str,
    ) -> Result<Vec<R>, GatewayError> {
        self.pause().await;
        let storage = self.enter(
            collection,
            GatewayCall::Search {
                field: field.to_string(),
                term: term.to_string(),
            },
        )?;

        let needle = term.to_lowercase();
        Ok(storage
            .records
            .iter()
            .filter(|r| {
                r.field(field)
                    .search_text()
                    .is_some_and(|text| text.contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn create(&self, collection: &str, record: &R) -> Result<R, GatewayError> {
        self.pause().await;
        let mut storage = self.enter(collection, GatewayCall::Create)?;

        let mut created = record.clone();
        match self.assign {
            Some(assign) => loop {
                let candidate = assign(storage.next_id);
                storage.next_id += 1;
                if !storage.records.iter().any(|r| *r.id() == candidate) {
                    created.set_id(candidate);
                    break;
                }
            },
            None => {
                if storage.records.iter().any(|r| r.id() == record.id()) {
                    return Err(GatewayError::Conflict {
                        collection: collection.to_string(),
                        id: record.id().to_string(),
                    });
                }
            }
        }

        storage.records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, collection: &str, id: &R::Id, record: &R) -> Result<R, GatewayError> {
        self.pause().await;
        let mut storage = self.enter(collection, GatewayCall::Update(id.clone()))?;

        let slot = storage
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| GatewayError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let mut updated = record.clone();
        updated.set_id(id.clone());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &R::Id) -> Result<(), GatewayError> {
        self.pause().await;
        let mut storage = self.enter(collection, GatewayCall::Delete(id.clone()))?;

        let before = storage.records.len();
        storage.records.retain(|r| r.id() != id);
        if storage.records.len() == before {
            return Err(GatewayError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
