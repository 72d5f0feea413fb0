//! Per-call timeout for engine clients.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::data::IndexDocument;
use crate::engine::{
    AliasAction, BulkResponse, EngineQuery, IndexSpec, SearchEngine, SearchResponse,
};
use crate::error::{ArchiveError, Result};

/// Wraps an engine so that no call blocks longer than `timeout`.
///
/// Each call runs on a worker thread; a call that has not answered in time is
/// reported as [`ArchiveError::EngineUnavailable`] and its worker is left to
/// finish in the background.
pub struct TimeoutEngine<E> {
    inner: Arc<E>,
    timeout: Duration,
}

impl<E: SearchEngine + 'static> TimeoutEngine<E> {
    pub fn new(inner: Arc<E>, timeout: Duration) -> Self {
        TimeoutEngine { inner, timeout }
    }

    pub fn inner(&self) -> &Arc<E> {
        &self.inner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn call<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&E) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = crossbeam_channel::bounded(1);
        std::thread::Builder::new()
            .name(format!("engine-{operation}"))
            .spawn(move || {
                let _ = tx.send(f(&inner));
            })
            .map_err(|e| ArchiveError::unavailable(format!("{operation}: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Engine call {operation} timed out after {:?}", self.timeout);
                Err(ArchiveError::unavailable(format!(
                    "{operation} timed out after {:?}",
                    self.timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ArchiveError::unavailable(format!(
                "{operation}: worker exited without a result"
            ))),
        }
    }
}

impl<E: SearchEngine + 'static> SearchEngine for TimeoutEngine<E> {
    fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()> {
        let (name, spec) = (name.to_string(), spec.clone());
        self.call("create_index", move |e| e.create_index(&name, &spec))
    }

    fn delete_index(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.call("delete_index", move |e| e.delete_index(&name))
    }

    fn index_exists(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.call("index_exists", move |e| e.index_exists(&name))
    }

    fn indices_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.call("indices_with_prefix", move |e| e.indices_with_prefix(&prefix))
    }

    fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>> {
        let alias = alias.to_string();
        self.call("indices_for_alias", move |e| e.indices_for_alias(&alias))
    }

    fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
        let actions = actions.to_vec();
        self.call("update_aliases", move |e| e.update_aliases(&actions))
    }

    fn put_document(&self, target: &str, document: IndexDocument) -> Result<()> {
        let target = target.to_string();
        self.call("put_document", move |e| e.put_document(&target, document))
    }

    fn update_document(&self, target: &str, id: &str, partial: IndexDocument) -> Result<()> {
        let (target, id) = (target.to_string(), id.to_string());
        self.call("update_document", move |e| {
            e.update_document(&target, &id, partial)
        })
    }

    fn delete_document(&self, target: &str, id: &str) -> Result<()> {
        let (target, id) = (target.to_string(), id.to_string());
        self.call("delete_document", move |e| e.delete_document(&target, &id))
    }

    fn get_document(&self, target: &str, id: &str) -> Result<Option<IndexDocument>> {
        let (target, id) = (target.to_string(), id.to_string());
        self.call("get_document", move |e| e.get_document(&target, &id))
    }

    fn search(&self, request: &EngineQuery) -> Result<SearchResponse> {
        let request = request.clone();
        self.call("search", move |e| e.search(&request))
    }

    fn bulk(&self, index: &str, documents: Vec<IndexDocument>) -> Result<BulkResponse> {
        let index = index.to_string();
        self.call("bulk", move |e| e.bulk(&index, documents))
    }

    fn refresh(&self, target: &str) -> Result<()> {
        let target = target.to_string();
        self.call("refresh", move |e| e.refresh(&target))
    }
}
