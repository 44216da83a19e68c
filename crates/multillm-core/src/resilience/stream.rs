use futures_util::StreamExt;
use futures_util::stream;
use tokio_util::sync::CancellationToken;

use super::lease::CallLease;
use crate::error::LlmError;
use crate::provider::DeltaStream;
use crate::types::ChatDelta;

struct Forward {
    pending: Option<ChatDelta>,
    inner: DeltaStream,
    lease: Option<CallLease>,
    cancel: CancellationToken,
}

/// Replay `first`, then forward the rest of `inner` as is, without retrying
///
/// Ends right after the first terminal delta or error. A source that ends
/// without a terminal settles the call as successful.
pub(super) fn committed(first: ChatDelta, inner: DeltaStream, lease: CallLease, cancel: CancellationToken) -> DeltaStream {
    let state = Forward {
        pending: Some(first),
        inner,
        lease: Some(lease),
        cancel,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        state.lease.as_ref()?;

        let next = match state.pending.take() {
            Some(delta) => Some(Ok(delta)),
            None => tokio::select! {
                biased;
                () = state.cancel.cancelled() => Some(Err(LlmError::Cancelled)),
                next = state.inner.next() => next,
            },
        };

        match next {
            Some(Ok(delta)) => {
                if delta.is_final
                    && let Some(lease) = state.lease.take()
                {
                    lease.succeed().await;
                }
                Some((Ok(delta), state))
            }
            Some(Err(error)) => {
                if let Some(lease) = state.lease.take() {
                    lease.fail(&error).await;
                }
                Some((Err(error), state))
            }
            None => {
                if let Some(lease) = state.lease.take() {
                    lease.succeed().await;
                }
                None
            }
        }
    }))
}
