//! One-shot callbacks held by a synchronization request.
//!
//! Every callback is a boxed `FnOnce` stored in an `Option` and taken out
//! when invoked, so none of them can fire twice.

use crate::backend::{CommandBuffer, Semaphore};
use crate::types::{PipelineStage, ReadMemoryAccess, WriteMemoryAccess};

/// Records the barrier in front of an operation.
///
/// Receives the command buffer, the operation's first stage and the access
/// the operation is about to perform.
pub type BeforeOperationHook<'a> =
    Box<dyn FnOnce(&mut CommandBuffer, PipelineStage, Option<ReadMemoryAccess>) + 'a>;

/// Records the barrier behind an operation.
///
/// Receives the command buffer, the operation's last stage and the writes
/// it performed.
pub type AfterOperationHook<'a> =
    Box<dyn FnOnce(&mut CommandBuffer, PipelineStage, Option<WriteMemoryAccess>) + 'a>;

/// Receives the semaphore signaled when the submitted work completes.
pub type SemaphoreSink<'a> = Box<dyn FnOnce(Semaphore) + 'a>;

/// Receives ownership of a submitted command buffer.
pub type CommandBufferHandoff<'a> = Box<dyn FnOnce(CommandBuffer) + 'a>;

/// Where the command buffer of a request comes from, and where it goes.
#[derive(Default)]
pub enum CommandBufferSlot<'a> {
    /// Nothing configured. The request allocates and finalizes its own buffer.
    #[default]
    Empty,
    /// Commands go into a buffer owned by another request (the master).
    External(&'a mut CommandBuffer),
    /// The request allocates its own buffer and hands it over after
    /// submission.
    Handoff(CommandBufferHandoff<'a>),
}

impl CommandBufferSlot<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl std::fmt::Debug for CommandBufferSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::External(cmd) => f.debug_tuple("External").field(&cmd.id()).finish(),
            Self::Handoff(_) => f.write_str("Handoff"),
        }
    }
}

/// How an auxiliary request obtains one of its barrier hooks.
pub enum HookTransfer<H> {
    /// The auxiliary gets no hook.
    None,
    /// An independent hook, unrelated to the master's.
    Explicit(H),
    /// The master's hook is taken out and run when the auxiliary's hook is
    /// invoked. Until then it stays with the master.
    StealOnDemand,
    /// The master's hook is moved into the auxiliary right away.
    StealImmediately,
}

impl<H> HookTransfer<H> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Explicit(_) => "explicit",
            Self::StealOnDemand => "steal-on-demand",
            Self::StealImmediately => "steal-immediately",
        }
    }
}

impl<H> Default for HookTransfer<H> {
    fn default() -> Self {
        Self::None
    }
}

impl<H> std::fmt::Debug for HookTransfer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
