#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, Weak},
};

use curbside_core::{Coordinate, Document, document};
use tokio::sync::mpsc;

use super::{Change, ChangeKind, Collection, Database, DatabaseError, DocPath, GeoEvent};
use crate::Subscription;

type Sink<E> = Box<dyn FnMut(&E) -> bool + Send>;

/// In-memory database for tests, simulation and offline use
///
/// Documents are kept per collection in key order. All state is wrapped in
/// `Arc<Mutex<>>` so clones share one store. Watchers run under the lock, which
/// gives every watcher the same global write order.
#[derive(Clone)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<MemoryDatabaseInner>>,
}

struct DocWatcher {
    id: u64,
    collection: Collection,
    sink: Sink<Change>,
}

struct GeoWatcher {
    id: u64,
    center: Coordinate,
    radius_m: f64,
    /// Keys currently inside the circle
    inside: HashSet<String>,
    sink: Sink<GeoEvent>,
}

impl GeoWatcher {
    fn covers(&self, location: &Coordinate) -> bool {
        self.center.distance_to(location) <= self.radius_m
    }
}

#[derive(Default)]
struct MemoryDatabaseInner {
    documents: HashMap<Collection, BTreeMap<String, Document>>,
    locations: BTreeMap<String, Coordinate>,
    doc_watchers: Vec<DocWatcher>,
    geo_watchers: Vec<GeoWatcher>,
    next_watcher_id: u64,
}

impl MemoryDatabaseInner {
    fn collection(&mut self, collection: Collection) -> &mut BTreeMap<String, Document> {
        self.documents.entry(collection).or_default()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_watcher_id;
        self.next_watcher_id += 1;
        id
    }

    /// Store `document` and notify watchers of the collection.
    fn write(&mut self, path: &DocPath, document: Document) {
        let previous = self.collection(path.collection).insert(path.key.clone(), document.clone());
        let kind = if previous.is_some() { ChangeKind::Changed } else { ChangeKind::Added };
        self.notify(path.collection, &Change { key: path.key.clone(), kind, document });
    }

    fn notify(&mut self, collection: Collection, change: &Change) {
        // Sinks report false once their subscription is gone
        self.doc_watchers.retain_mut(|w| w.collection != collection || (w.sink)(change));
    }

    fn relocate(&mut self, key: &str, location: Coordinate) {
        self.geo_watchers.retain_mut(|watcher| {
            let was_inside = watcher.inside.contains(key);
            let event = match (was_inside, watcher.covers(&location)) {
                (false, true) => {
                    watcher.inside.insert(key.to_owned());
                    GeoEvent::Entered { key: key.to_owned(), location }
                },
                (true, true) => GeoEvent::Moved { key: key.to_owned(), location },
                (true, false) => {
                    watcher.inside.remove(key);
                    GeoEvent::Exited { key: key.to_owned() }
                },
                (false, false) => return true,
            };
            (watcher.sink)(&event)
        });
    }

    fn evict(&mut self, key: &str) {
        self.geo_watchers.retain_mut(|watcher| {
            if !watcher.inside.remove(key) {
                return true;
            }
            (watcher.sink)(&GeoEvent::Exited { key: key.to_owned() })
        });
    }

    fn unregister(&mut self, id: u64) {
        self.doc_watchers.retain(|w| w.id != id);
        self.geo_watchers.retain(|w| w.id != id);
    }
}

/// Wrap a filter-map closure into a sink that forwards to `tx`.
fn forward<E, T, F>(mut filter: F, tx: mpsc::UnboundedSender<T>) -> Sink<E>
where
    E: 'static,
    T: Send + 'static,
    F: FnMut(&E) -> Option<T> + Send + 'static,
{
    Box::new(move |event| match filter(event) {
        Some(item) => tx.send(item).is_ok(),
        None => !tx.is_closed(),
    })
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryDatabaseInner::default())) }
    }

    /// All documents in a collection, in key order.
    pub fn snapshot(&self, collection: Collection) -> Result<Vec<(String, Document)>, DatabaseError> {
        let inner = self.inner.lock()?;
        Ok(inner
            .documents
            .get(&collection)
            .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    /// Number of live watchers of either kind.
    ///
    /// Useful for checking that sessions release their subscriptions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    pub fn watcher_count(&self) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.doc_watchers.len() + inner.geo_watchers.len()
    }

    fn cancel_handle(&self, id: u64) -> impl FnOnce() + Send + 'static {
        let weak: Weak<Mutex<MemoryDatabaseInner>> = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade()
                && let Ok(mut inner) = inner.lock()
            {
                inner.unregister(id);
            }
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for MemoryDatabase {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, DatabaseError> {
        let inner = self.inner.lock()?;
        Ok(inner.documents.get(&path.collection).and_then(|docs| docs.get(&path.key)).cloned())
    }

    fn set(&self, path: &DocPath, document: Document) -> Result<(), DatabaseError> {
        self.inner.lock()?.write(path, document);
        Ok(())
    }

    fn update(&self, path: &DocPath, fields: Vec<(String, Document)>) -> Result<(), DatabaseError> {
        let mut inner = self.inner.lock()?;

        let mut merged =
            inner.collection(path.collection).get(&path.key).cloned().unwrap_or(Document::Null);
        document::merge(&mut merged, fields);
        inner.write(path, merged);

        Ok(())
    }

    fn remove(&self, path: &DocPath) -> Result<bool, DatabaseError> {
        let mut inner = self.inner.lock()?;

        let Some(document) = inner.collection(path.collection).remove(&path.key) else {
            return Ok(false);
        };
        let change = Change { key: path.key.clone(), kind: ChangeKind::Removed, document };
        inner.notify(path.collection, &change);

        Ok(true)
    }

    fn transact<F, E>(&self, path: &DocPath, apply: F) -> Result<Document, E>
    where
        F: FnOnce(Option<&Document>) -> Result<Document, E>,
        E: From<DatabaseError>,
    {
        let mut inner = self.inner.lock().map_err(|_| E::from(DatabaseError::Poisoned))?;

        let replacement = apply(inner.collection(path.collection).get(&path.key))?;
        inner.write(path, replacement.clone());

        Ok(replacement)
    }

    fn watch<T, F>(&self, collection: Collection, filter: F) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&Change) -> Option<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sink = forward(filter, tx);

        let mut inner = self.inner.lock()?;
        let id = inner.next_id();

        for (key, document) in inner.collection(collection).iter() {
            sink(&Change { key: key.clone(), kind: ChangeKind::Added, document: document.clone() });
        }
        inner.doc_watchers.push(DocWatcher { id, collection, sink });
        drop(inner);

        Ok(Subscription::new(rx, self.cancel_handle(id)))
    }

    fn set_location(&self, key: &str, location: Coordinate) -> Result<(), DatabaseError> {
        let mut inner = self.inner.lock()?;
        inner.locations.insert(key.to_owned(), location);
        inner.relocate(key, location);
        Ok(())
    }

    fn remove_location(&self, key: &str) -> Result<bool, DatabaseError> {
        let mut inner = self.inner.lock()?;
        let existed = inner.locations.remove(key).is_some();
        inner.evict(key);
        Ok(existed)
    }

    fn location(&self, key: &str) -> Result<Option<Coordinate>, DatabaseError> {
        Ok(self.inner.lock()?.locations.get(key).copied())
    }

    fn query_radius<T, F>(
        &self,
        center: Coordinate,
        radius_m: f64,
        filter: F,
    ) -> Result<Subscription<T>, DatabaseError>
    where
        T: Send + 'static,
        F: FnMut(&GeoEvent) -> Option<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = GeoWatcher {
            id: 0,
            center,
            radius_m,
            inside: HashSet::new(),
            sink: forward(filter, tx),
        };

        let mut inner = self.inner.lock()?;
        watcher.id = inner.next_id();

        for (key, location) in &inner.locations {
            if watcher.covers(location) {
                watcher.inside.insert(key.clone());
                (watcher.sink)(&GeoEvent::Entered { key: key.clone(), location: *location });
            }
        }
        let id = watcher.id;
        inner.geo_watchers.push(watcher);
        drop(inner);

        Ok(Subscription::new(rx, self.cancel_handle(id)))
    }
}
