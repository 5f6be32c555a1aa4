//! Synchronization strategies and their classification.

/// How a request synchronizes its operation with surrounding GPU work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStrategy {
    /// Submit and hand a completion semaphore to the caller's sink.
    ViaSemaphore,
    /// Barriers only. The owning request submits and hands the command buffer
    /// to the caller; an auxiliary request leaves submission to its master.
    ViaBarrier,
    /// Submit and block until the queue is idle. Chosen implicitly when
    /// nothing cheaper was configured.
    ViaWaitIdle,
    /// Same as [`SyncStrategy::ViaWaitIdle`], but explicitly requested.
    ViaWaitIdleDeliberately,
    /// The caller asserted no synchronization is needed. Finalizing such a
    /// request is a protocol violation.
    NotRequired,
    /// The recorded command buffer is returned from finalization.
    ByReturn,
    /// Commands are recorded into a command buffer managed by the caller.
    ByExistingCommandBuffer,
}

impl SyncStrategy {
    /// Whether finalization blocks the host until the queue is idle.
    pub fn blocks_host(self) -> bool {
        matches!(self, Self::ViaWaitIdle | Self::ViaWaitIdleDeliberately)
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ViaSemaphore => "via_semaphore",
            Self::ViaBarrier => "via_barrier",
            Self::ViaWaitIdle => "via_wait_idle",
            Self::ViaWaitIdleDeliberately => "via_wait_idle_deliberately",
            Self::NotRequired => "not_required",
            Self::ByReturn => "by_return",
            Self::ByExistingCommandBuffer => "by_existing_command_buffer",
        };
        f.write_str(name)
    }
}

/// Derive the active strategy.
///
/// A semaphore sink wins over a command buffer slot, which wins over an
/// explicit override. Without any of them the request falls back to an
/// implicit wait-idle.
pub(crate) fn classify(
    has_semaphore_sink: bool,
    has_command_buffer_slot: bool,
    strategy_override: Option<SyncStrategy>,
) -> SyncStrategy {
    if has_semaphore_sink {
        return SyncStrategy::ViaSemaphore;
    }
    if has_command_buffer_slot {
        return SyncStrategy::ViaBarrier;
    }
    strategy_override.unwrap_or(SyncStrategy::ViaWaitIdle)
}
