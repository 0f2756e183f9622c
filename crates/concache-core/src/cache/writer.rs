//! Background persistence of field values.
//!
//! `set_value` updates memory synchronously and queues the dehydrated value
//! here. A single writer task applies the queue in order, so the last write
//! to a field is also the last one to reach storage.

use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::CacheError;
use crate::storage::{StorageBackend, StorageError};

pub(crate) struct WriteRequest {
    pub key: &'static str,
    pub value: String,
    pub done: oneshot::Sender<Result<(), StorageError>>,
}

/// Completion handle for a queued write.
///
/// Dropping it does not cancel the write; awaiting it reports whether the
/// value reached storage.
pub struct PendingWrite {
    inner: Inner,
}

enum Inner {
    Queued(oneshot::Receiver<Result<(), StorageError>>),
    Finished(Result<(), CacheError>),
}

impl PendingWrite {
    pub(crate) fn queued(rx: oneshot::Receiver<Result<(), StorageError>>) -> Self {
        Self {
            inner: Inner::Queued(rx),
        }
    }

    pub(crate) fn failed(error: CacheError) -> Self {
        Self {
            inner: Inner::Finished(Err(error)),
        }
    }

    /// Wait until the value has been written
    pub async fn wait(self) -> Result<(), CacheError> {
        match self.inner {
            Inner::Queued(rx) => match rx.await {
                Ok(result) => result.map_err(CacheError::from),
                Err(_) => Err(CacheError::WriteDropped),
            },
            Inner::Finished(result) => result,
        }
    }
}

impl IntoFuture for PendingWrite {
    type Output = Result<(), CacheError>;
    type IntoFuture = BoxFuture<'static, Result<(), CacheError>>;

    fn into_future(self) -> Self::IntoFuture {
        self.wait().boxed()
    }
}

/// Drain the write queue until every sender is gone.
pub(crate) async fn run_writer(
    storage: Arc<dyn StorageBackend>,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
) {
    while let Some(request) = rx.recv().await {
        let result = storage.set(request.key, &request.value).await;
        if let Err(ref e) = result {
            warn!(field = request.key, error = %e, "Failed to persist field");
        }
        // Nobody waiting is fine
        let _ = request.done.send(result);
    }
    debug!("Cache writer stopped");
}
