//! Construction, configuration and the operation-facing half of the protocol.

use crate::backend::{CommandBuffer, CommandPool, Queue, Semaphore};
use crate::error::SyncError;
use crate::types::{CommandBufferRequest, PipelineStage, ReadMemoryAccess, WriteMemoryAccess};

use super::hooks::{AfterOperationHook, BeforeOperationHook, CommandBufferSlot};
use super::presets;
use super::strategy::{SyncStrategy, classify};
use super::{SyncContext, SyncRequest};

/// Parts of a request with a provisioned command buffer, borrowed disjointly.
pub(super) type ProvisionedParts<'s, 'a> = (
    &'s mut CommandBuffer,
    &'s mut Option<BeforeOperationHook<'a>>,
    &'s mut Option<AfterOperationHook<'a>>,
);

impl<'a> SyncRequest<'a> {
    pub(super) fn blank(context: &SyncContext) -> Self {
        Self {
            context: context.clone(),
            strategy_override: None,
            command_buffer_request: CommandBufferRequest::default(),
            semaphore_sink: None,
            wait_semaphores: Vec::new(),
            command_buffer_slot: CommandBufferSlot::Empty,
            existing_command_buffer: None,
            owned_command_buffer: None,
            before_hook: None,
            after_hook: None,
            queue_override: None,
            queue_hint: None,
            finalized: None,
        }
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// A request with nothing configured. Finalizing it waits for the queue
    /// to become idle and logs a warning.
    pub fn new(context: &SyncContext) -> Self {
        Self::blank(context)
    }

    /// The caller asserts that no synchronization is needed.
    ///
    /// Finalizing such a request panics.
    pub fn no_sync(context: &SyncContext) -> Self {
        let mut request = Self::blank(context);
        request.strategy_override = Some(SyncStrategy::NotRequired);
        request
    }

    /// Synchronize by waiting for the queue to become idle.
    ///
    /// With `deliberately` set, the usual warning about this expensive
    /// fallback is suppressed.
    pub fn wait_idle(context: &SyncContext, deliberately: bool) -> Self {
        let mut request = Self::blank(context);
        if deliberately {
            request.strategy_override = Some(SyncStrategy::ViaWaitIdleDeliberately);
        }
        request
    }

    /// Hand a semaphore signaled on completion to `sink`.
    ///
    /// Installs the default barrier presets.
    pub fn with_semaphore(context: &SyncContext, sink: impl FnOnce(Semaphore) + 'a) -> Self {
        let mut request = Self::blank(context);
        request.semaphore_sink = Some(Box::new(sink));
        request.with_default_presets()
    }

    /// Synchronize with barriers and hand the submitted command buffer to
    /// `handoff`, which must keep it alive until the GPU is done with it.
    ///
    /// Installs the default barrier presets.
    pub fn with_barriers(context: &SyncContext, handoff: impl FnOnce(CommandBuffer) + 'a) -> Self {
        let mut request = Self::blank(context);
        request.command_buffer_slot = CommandBufferSlot::Handoff(Box::new(handoff));
        request.with_default_presets()
    }

    /// Synchronize with barriers and return the recorded, unsubmitted
    /// command buffer from [`SyncRequest::submit_and_sync`].
    ///
    /// Installs the default barrier presets.
    pub fn by_return(context: &SyncContext) -> Self {
        let mut request = Self::blank(context);
        request.strategy_override = Some(SyncStrategy::ByReturn);
        request.with_default_presets()
    }

    /// Record barriers and commands into `command_buffer`, which the caller
    /// has started recording and will submit.
    ///
    /// Installs the default barrier presets.
    pub fn with_existing_command_buffer(
        context: &SyncContext,
        command_buffer: &'a mut CommandBuffer,
    ) -> Self {
        let mut request = Self::blank(context);
        request.strategy_override = Some(SyncStrategy::ByExistingCommandBuffer);
        request.existing_command_buffer = Some(command_buffer);
        request.with_default_presets()
    }

    fn with_default_presets(mut self) -> Self {
        self.before_hook = Some(presets::default_before_operation());
        self.after_hook = Some(presets::default_after_operation());
        self
    }

    // ========================================================================
    // Builders
    // ========================================================================

    /// Replace the barrier recorded in front of the operation.
    pub fn before_operation(
        mut self,
        hook: impl FnOnce(&mut CommandBuffer, PipelineStage, Option<ReadMemoryAccess>) + 'a,
    ) -> Self {
        self.before_hook = Some(Box::new(hook));
        self
    }

    /// Replace the barrier recorded behind the operation.
    pub fn after_operation(
        mut self,
        hook: impl FnOnce(&mut CommandBuffer, PipelineStage, Option<WriteMemoryAccess>) + 'a,
    ) -> Self {
        self.after_hook = Some(Box::new(hook));
        self
    }

    /// Make the submission wait on `semaphore`.
    pub fn wait_for_semaphore(mut self, semaphore: Semaphore) -> Self {
        self.wait_semaphores.push(semaphore);
        self
    }

    pub fn wait_for_semaphores(mut self, semaphores: impl IntoIterator<Item = Semaphore>) -> Self {
        self.wait_semaphores.extend(semaphores);
        self
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Submit to `queue`, regardless of any hint.
    pub fn on_queue(&mut self, queue: &Queue) -> &mut Self {
        self.queue_override = Some(queue.clone());
        self
    }

    pub fn create_reusable_commandbuffer(&mut self) -> &mut Self {
        self.command_buffer_request = CommandBufferRequest::Reusable;
        self
    }

    pub fn create_single_use_commandbuffer(&mut self) -> &mut Self {
        self.command_buffer_request = CommandBufferRequest::SingleUse;
        self
    }

    /// Recommend a queue. Operations call this; an explicit
    /// [`on_queue`](Self::on_queue) takes precedence.
    pub fn set_queue_hint(&mut self, queue: &Queue) {
        self.queue_hint = Some(queue.clone());
    }

    /// The queue submission goes to: override, else hint, else the context's
    /// default queue.
    pub fn queue_to_use(&self) -> &Queue {
        self.queue_override
            .as_ref()
            .or(self.queue_hint.as_ref())
            .unwrap_or(&self.context.queue)
    }

    // ========================================================================
    // Operation protocol
    // ========================================================================

    /// The command buffer the operation records into.
    ///
    /// An auxiliary request returns its master's buffer and a request created
    /// with [`with_existing_command_buffer`](Self::with_existing_command_buffer)
    /// returns the caller's. Otherwise the first call allocates a buffer from
    /// the context's pool and begins recording; later calls return the same
    /// buffer.
    ///
    /// # Panics
    ///
    /// If called after [`submit_and_sync`](Self::submit_and_sync).
    pub fn get_or_create_command_buffer(&mut self) -> Result<&mut CommandBuffer, SyncError> {
        self.provisioned_parts().map(|(command_buffer, _, _)| command_buffer)
    }

    /// Run the before-hook, if still registered, with the operation's first
    /// stage and read access. Later calls do nothing.
    pub fn establish_barrier_before_the_operation(
        &mut self,
        dst_stage: PipelineStage,
        dst_access: Option<ReadMemoryAccess>,
    ) -> Result<(), SyncError> {
        if self.before_hook.is_none() {
            return Ok(());
        }
        let (command_buffer, before_hook, _) = self.provisioned_parts()?;
        if let Some(hook) = before_hook.take() {
            hook(command_buffer, dst_stage, dst_access);
        }
        Ok(())
    }

    /// Run the after-hook, if still registered, with the operation's last
    /// stage and write access. Later calls do nothing.
    pub fn establish_barrier_after_the_operation(
        &mut self,
        src_stage: PipelineStage,
        src_access: Option<WriteMemoryAccess>,
    ) -> Result<(), SyncError> {
        if self.after_hook.is_none() {
            return Ok(());
        }
        let (command_buffer, _, after_hook) = self.provisioned_parts()?;
        if let Some(hook) = after_hook.take() {
            hook(command_buffer, src_stage, src_access);
        }
        Ok(())
    }

    /// Move the whole state into a new request, leaving a neutral
    /// `NotRequired` request without hooks or command buffer behind.
    pub fn take(&mut self) -> SyncRequest<'a> {
        let neutral = Self::no_sync(&self.context);
        std::mem::replace(self, neutral)
    }

    /// # Panics
    ///
    /// If the request was already finalized.
    pub(super) fn provisioned_parts(&mut self) -> Result<ProvisionedParts<'_, 'a>, SyncError> {
        assert!(
            self.finalized.is_none(),
            "command buffer requested after submit_and_sync(); a finalized request cannot record further commands"
        );
        let Self {
            context,
            command_buffer_request,
            command_buffer_slot,
            existing_command_buffer,
            owned_command_buffer,
            before_hook,
            after_hook,
            ..
        } = self;

        let command_buffer: &mut CommandBuffer =
            if let CommandBufferSlot::External(master) = command_buffer_slot {
                master
            } else if let Some(existing) = existing_command_buffer {
                existing
            } else {
                let command_buffer = match owned_command_buffer.take() {
                    Some(command_buffer) => command_buffer,
                    None => allocate_recording(&context.pool, *command_buffer_request)?,
                };
                owned_command_buffer.insert(command_buffer)
            };

        Ok((command_buffer, before_hook, after_hook))
    }

    /// The owned command buffer for submission, allocating an empty one if
    /// the operation never recorded anything.
    pub(super) fn take_owned_command_buffer(&mut self) -> Result<CommandBuffer, SyncError> {
        match self.owned_command_buffer.take() {
            Some(command_buffer) => Ok(command_buffer),
            None => {
                log::debug!(
                    "Nothing was recorded for this {} request; submitting an empty command buffer",
                    self.classify()
                );
                allocate_recording(&self.context.pool, self.command_buffer_request)
            }
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// The strategy finalization will apply, or applied if it already ran.
    pub fn classify(&self) -> SyncStrategy {
        if let Some(strategy) = self.finalized {
            return strategy;
        }
        classify(
            self.semaphore_sink.is_some(),
            !self.command_buffer_slot.is_empty(),
            self.strategy_override,
        )
    }

    /// Whether this request records into a master's command buffer.
    pub fn is_auxiliary(&self) -> bool {
        matches!(self.command_buffer_slot, CommandBufferSlot::External(_))
    }

    /// Whether an owned command buffer is allocated and not yet submitted
    /// or returned.
    pub fn has_pending_command_buffer(&self) -> bool {
        self.owned_command_buffer.is_some()
    }

    pub fn has_before_hook(&self) -> bool {
        self.before_hook.is_some()
    }

    pub fn has_after_hook(&self) -> bool {
        self.after_hook.is_some()
    }

    pub fn wait_semaphore_count(&self) -> usize {
        self.wait_semaphores.len()
    }

    pub fn command_buffer_request(&self) -> CommandBufferRequest {
        self.command_buffer_request
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn context(&self) -> &SyncContext {
        &self.context
    }
}

fn allocate_recording(
    pool: &CommandPool,
    request: CommandBufferRequest,
) -> Result<CommandBuffer, SyncError> {
    let mut command_buffer = pool.allocate(request)?;
    command_buffer.begin_recording()?;
    log::trace!(
        "Provisioned {:?} command buffer {}",
        request,
        command_buffer.id()
    );
    Ok(command_buffer)
}

impl Drop for SyncRequest<'_> {
    fn drop(&mut self) {
        if let Some(command_buffer) = &self.owned_command_buffer {
            if self.classify() == SyncStrategy::ByReturn {
                log::error!(
                    "Synchronization by return was requested, but command buffer {} was never fetched",
                    command_buffer.id()
                );
            } else {
                log::error!(
                    "Command buffer {} was never submitted but its synchronization request is dropped. This is a bug.",
                    command_buffer.id()
                );
            }
        }

        if cfg!(debug_assertions) {
            if self.before_hook.is_some() {
                log::debug!("Before-operation barrier hook was never invoked");
            }
            if self.after_hook.is_some() {
                log::debug!("After-operation barrier hook was never invoked");
            }
        }
    }
}
