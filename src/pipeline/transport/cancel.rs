use std::future::Future;

use tokio::sync::oneshot;

use super::TransportError;

/// Caller side of a cancellation pair. Consumed by [`CancelHandle::cancel`].
///
/// Dropping the handle without calling `cancel` leaves the request running.
#[derive(Debug)]
pub struct CancelHandle {
    tx: oneshot::Sender<()>,
}

/// Request side of a cancellation pair, passed along with a submission.
#[derive(Debug)]
pub struct CancelToken {
    rx: oneshot::Receiver<()>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(self) {
        // Receiver already gone means the request finished first.
        let _ = self.tx.send(());
    }
}

/// Drive `fut` to completion unless `token` fires first.
///
/// On cancellation the future is dropped, which aborts any in-flight HTTP
/// exchange, and [`TransportError::Cancelled`] is returned.
pub async fn cancellable<F, T>(fut: F, token: Option<CancelToken>) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    let Some(token) = token else {
        return fut.await;
    };
    tokio::select! {
        result = fut => result,
        Ok(()) = token.rx => {
            tracing::info!("Inference request cancelled by caller");
            Err(TransportError::Cancelled)
        }
    }
}
