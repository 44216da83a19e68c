use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::error::LlmError;
use crate::hooks::{CallContext, HookNotifier};

/// Pending end-or-error notification of one call, plus its admission slot
///
/// Settling releases the slot and notifies hooks. A lease dropped unsettled
/// (the caller dropped the call future or the stream) releases the slot and
/// reports [`LlmError::Cancelled`] from a task on the ambient runtime.
pub(super) struct CallLease {
    permit: Option<OwnedSemaphorePermit>,
    notifier: Arc<HookNotifier>,
    ctx: CallContext,
    settled: bool,
}

impl CallLease {
    pub(super) const fn new(notifier: Arc<HookNotifier>, ctx: CallContext) -> Self {
        Self {
            permit: None,
            notifier,
            ctx,
            settled: false,
        }
    }

    pub(super) fn hold(&mut self, permit: OwnedSemaphorePermit) {
        self.permit = Some(permit);
    }

    pub(super) async fn succeed(mut self) {
        self.settled = true;
        drop(self.permit.take());
        self.notifier.end(&self.ctx).await;
    }

    pub(super) async fn fail(mut self, error: &LlmError) {
        self.settled = true;
        drop(self.permit.take());
        self.notifier.error(&self.ctx, error).await;
    }
}

impl Drop for CallLease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        drop(self.permit.take());

        let notifier = Arc::clone(&self.notifier);
        let ctx = self.ctx.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    notifier.error(&ctx, &LlmError::Cancelled).await;
                });
            }
            Err(_) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    "call abandoned outside a runtime, error hooks skipped"
                );
            }
        }
    }
}
