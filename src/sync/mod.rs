//! Synchronization of single GPU operations with their neighbors.
//!
//! A [`SyncRequest`] accompanies one logical GPU operation (a copy, a draw,
//! a dispatch) and decides how that operation is ordered against the work
//! before and after it. The operation drives the request through a fixed
//! protocol:
//!
//! ```text
//! 1. get_or_create_command_buffer()              provision (lazy, once)
//! 2. establish_barrier_before_the_operation()    before-hook (at most once)
//! 3. <native commands of the operation>
//! 4. establish_barrier_after_the_operation()     after-hook (at most once)
//! 5. submit_and_sync()                           finalize (exactly once)
//! ```
//!
//! The strategy applied in step 5 is derived from what the caller configured
//! (see [`SyncStrategy`]):
//!
//! | Configured                         | Strategy                     |
//! |------------------------------------|------------------------------|
//! | semaphore sink                     | `ViaSemaphore`               |
//! | command buffer handoff / master    | `ViaBarrier`                 |
//! | explicit override                  | the override                 |
//! | nothing                            | `ViaWaitIdle` (with warning) |
//!
//! Several operations can share one command buffer: an auxiliary request
//! created with [`SyncRequest::auxiliary_with_barriers`] borrows its master's
//! command buffer and may take over the master's barrier hooks. Only the
//! master submits.

mod compose;
mod finalize;
pub mod hooks;
pub mod presets;
mod request;
mod strategy;

use crate::backend::{CommandBuffer, CommandPool, Queue, Semaphore};
use crate::types::CommandBufferRequest;

pub use hooks::{
    AfterOperationHook, BeforeOperationHook, CommandBufferHandoff, CommandBufferSlot,
    HookTransfer, SemaphoreSink,
};
pub use strategy::SyncStrategy;

/// Defaults shared by all requests: where command buffers come from and
/// which queue they are submitted to when a request names none.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pool: CommandPool,
    queue: Queue,
}

impl SyncContext {
    pub fn new(pool: CommandPool, queue: Queue) -> Self {
        Self { pool, queue }
    }

    /// Pool new command buffers are allocated from.
    pub fn pool(&self) -> &CommandPool {
        &self.pool
    }

    /// Queue used when a request carries neither override nor hint.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}

static_assertions::assert_impl_all!(SyncContext: Send, Sync);

/// Synchronization state for one GPU operation.
///
/// A request is used from a single thread. Its hooks may capture non-`Send`
/// state such as [`TrackedImage`](crate::TrackedImage) references.
pub struct SyncRequest<'a> {
    context: SyncContext,
    strategy_override: Option<SyncStrategy>,
    command_buffer_request: CommandBufferRequest,
    semaphore_sink: Option<SemaphoreSink<'a>>,
    wait_semaphores: Vec<Semaphore>,
    command_buffer_slot: CommandBufferSlot<'a>,
    /// Caller-managed buffer for `ByExistingCommandBuffer`.
    existing_command_buffer: Option<&'a mut CommandBuffer>,
    /// Allocated lazily; taken out exactly once by finalization.
    owned_command_buffer: Option<CommandBuffer>,
    before_hook: Option<BeforeOperationHook<'a>>,
    after_hook: Option<AfterOperationHook<'a>>,
    queue_override: Option<Queue>,
    queue_hint: Option<Queue>,
    /// Strategy applied by `submit_and_sync`, frozen once it starts.
    finalized: Option<SyncStrategy>,
}

impl std::fmt::Debug for SyncRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRequest")
            .field("strategy", &self.classify())
            .field("command_buffer_request", &self.command_buffer_request)
            .field("command_buffer_slot", &self.command_buffer_slot)
            .field(
                "owned_command_buffer",
                &self.owned_command_buffer.as_ref().map(CommandBuffer::id),
            )
            .field("wait_semaphores", &self.wait_semaphores.len())
            .field("before_hook", &self.before_hook.is_some())
            .field("after_hook", &self.after_hook.is_some())
            .field("finalized", &self.finalized.is_some())
            .finish_non_exhaustive()
    }
}
