//! Master/auxiliary composition.
//!
//! An auxiliary request records into its master's command buffer and never
//! submits. Because it holds a mutable borrow of the master, the master can
//! neither be finalized nor dropped while an auxiliary is alive.

use crate::backend::CommandBuffer;
use crate::error::SyncError;
use crate::types::{PipelineStage, ReadMemoryAccess, WriteMemoryAccess};

use super::SyncRequest;
use super::hooks::{AfterOperationHook, BeforeOperationHook, CommandBufferSlot, HookTransfer};

impl<'a> SyncRequest<'a> {
    /// Create a request that shares `master`'s command buffer.
    ///
    /// The master's command buffer is provisioned now if it has not been
    /// already. `before` and `after` select how the auxiliary obtains each of
    /// its barrier hooks (see [`HookTransfer`]). The auxiliary carries no
    /// queue configuration and its [`submit_and_sync`](Self::submit_and_sync)
    /// does nothing: the master submits everything recorded through it.
    ///
    /// The auxiliary borrows the master mutably, so the master cannot be
    /// finalized while the auxiliary is alive:
    ///
    /// ```compile_fail
    /// use redlilium_gpu_sync::{DummyDevice, HookTransfer, SyncContext, SyncRequest};
    ///
    /// let device = DummyDevice::new();
    /// let context = SyncContext::new(device.command_pool(), device.queue(0));
    /// let mut master = SyncRequest::by_return(&context);
    /// let mut auxiliary = SyncRequest::auxiliary_with_barriers(
    ///     &mut master,
    ///     HookTransfer::None,
    ///     HookTransfer::None,
    /// )
    /// .unwrap();
    /// master.submit_and_sync().unwrap();
    /// auxiliary.submit_and_sync().unwrap();
    /// ```
    ///
    /// Dropping or finalizing the auxiliary first releases the borrow:
    ///
    /// ```
    /// use redlilium_gpu_sync::{DummyDevice, HookTransfer, SyncContext, SyncRequest};
    ///
    /// let device = DummyDevice::new();
    /// let context = SyncContext::new(device.command_pool(), device.queue(0));
    /// let mut master = SyncRequest::by_return(&context);
    /// let mut auxiliary = SyncRequest::auxiliary_with_barriers(
    ///     &mut master,
    ///     HookTransfer::None,
    ///     HookTransfer::None,
    /// )
    /// .unwrap();
    /// auxiliary.submit_and_sync().unwrap();
    /// drop(auxiliary);
    /// assert!(master.submit_and_sync().unwrap().is_some());
    /// ```
    pub fn auxiliary_with_barriers<'m>(
        master: &'m mut SyncRequest<'a>,
        before: HookTransfer<BeforeOperationHook<'m>>,
        after: HookTransfer<AfterOperationHook<'m>>,
    ) -> Result<SyncRequest<'m>, SyncError> {
        log::trace!(
            "Composing auxiliary request (before: {}, after: {})",
            before.name(),
            after.name()
        );

        let mut auxiliary = SyncRequest::blank(&master.context);
        let (command_buffer, master_before, master_after) = master.provisioned_parts()?;

        auxiliary.before_hook = match before {
            HookTransfer::None => None,
            HookTransfer::Explicit(hook) => Some(hook),
            HookTransfer::StealOnDemand => Some(Box::new(
                move |command_buffer: &mut CommandBuffer,
                      stage: PipelineStage,
                      access: Option<ReadMemoryAccess>| {
                    match master_before.take() {
                        Some(hook) => hook(command_buffer, stage, access),
                        None => log::trace!("Master before-hook already consumed"),
                    }
                },
            )),
            HookTransfer::StealImmediately => master_before.take(),
        };

        auxiliary.after_hook = match after {
            HookTransfer::None => None,
            HookTransfer::Explicit(hook) => Some(hook),
            HookTransfer::StealOnDemand => Some(Box::new(
                move |command_buffer: &mut CommandBuffer,
                      stage: PipelineStage,
                      access: Option<WriteMemoryAccess>| {
                    match master_after.take() {
                        Some(hook) => hook(command_buffer, stage, access),
                        None => log::trace!("Master after-hook already consumed"),
                    }
                },
            )),
            HookTransfer::StealImmediately => master_after.take(),
        };

        auxiliary.command_buffer_slot = CommandBufferSlot::External(command_buffer);
        Ok(auxiliary)
    }
}
