use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::destination::base::ChunkDestination;
use crate::error::SluiceResult;
use crate::types::{Chunk, Command};

/// An in-memory destination that records every applied chunk.
///
/// Useful for local runs and tests. Application is trivially atomic because a
/// chunk is appended in a single critical section.
#[derive(Debug)]
pub struct MemoryDestination<R> {
    inner: Arc<Mutex<Vec<Chunk<R>>>>,
}

impl<R> Clone for MemoryDestination<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> MemoryDestination<R> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<R: Clone> MemoryDestination<R> {
    /// Returns every chunk applied so far, in application order.
    pub async fn applied_chunks(&self) -> Vec<Chunk<R>> {
        self.inner.lock().await.clone()
    }

    /// Returns every applied command, flattened across chunks.
    pub async fn applied_commands(&self) -> Vec<Command<R>> {
        self.inner.lock().await.iter().flatten().cloned().collect()
    }
}

impl<R> Default for MemoryDestination<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone + Send + Sync> ChunkDestination<R> for MemoryDestination<R> {
    async fn apply_chunk(&self, chunk: &[Command<R>]) -> SluiceResult<()> {
        let mut inner = self.inner.lock().await;
        info!("applying a chunk of {} commands", chunk.len());
        inner.push(chunk.to_vec());

        Ok(())
    }
}
