use std::future::Future;

use crate::error::SluiceResult;
use crate::types::Command;

/// A transactional executor of command chunks.
///
/// Implementations must apply the whole chunk atomically: either every command
/// in the slice takes effect, or none does and an error is returned. The batch
/// writer relies on this contract to retry a failed chunk as a unit without
/// risking partial application.
pub trait ChunkDestination<R> {
    fn apply_chunk(&self, chunk: &[Command<R>]) -> impl Future<Output = SluiceResult<()>> + Send;
}
