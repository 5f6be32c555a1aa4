//! Submission: the terminal step of a request.

use crate::backend::{CommandBuffer, Semaphore};
use crate::error::SyncError;
use crate::types::{MemoryAccess, PipelineStage};

use super::SyncRequest;
use super::hooks::CommandBufferSlot;
use super::strategy::SyncStrategy;

impl SyncRequest<'_> {
    /// End recording and submit according to [`classify`](Self::classify).
    ///
    /// Returns the recorded command buffer for `ByReturn` and `None` for
    /// every other strategy. Wait semaphores are consumed in any case; only
    /// `ViaSemaphore` submissions actually wait on them.
    ///
    /// # Panics
    ///
    /// - if the request was created with [`no_sync`](Self::no_sync)
    /// - for `ByReturn` if no command buffer was ever provisioned
    /// - if called a second time on the same request
    pub fn submit_and_sync(&mut self) -> Result<Option<CommandBuffer>, SyncError> {
        assert!(
            self.finalized.is_none(),
            "submit_and_sync() has already been called on this request"
        );
        let strategy = self.classify();
        assert!(
            strategy != SyncStrategy::NotRequired,
            "submit_and_sync() reached on a request that declared no synchronization \
             is required; provide a concrete synchronization strategy"
        );
        self.finalized = Some(strategy);

        let wait_semaphores = std::mem::take(&mut self.wait_semaphores);
        if !wait_semaphores.is_empty() && strategy != SyncStrategy::ViaSemaphore {
            log::warn!(
                "Releasing {} wait semaphore(s) unused: strategy {} does not wait on semaphores",
                wait_semaphores.len(),
                strategy
            );
        }

        match strategy {
            SyncStrategy::ViaSemaphore => {
                self.submit_via_semaphore(wait_semaphores)?;
                Ok(None)
            }
            SyncStrategy::ViaBarrier => {
                self.submit_via_barrier()?;
                Ok(None)
            }
            SyncStrategy::ViaWaitIdle | SyncStrategy::ViaWaitIdleDeliberately => {
                self.submit_and_wait_idle(strategy)?;
                Ok(None)
            }
            SyncStrategy::ByReturn => self.return_command_buffer().map(Some),
            SyncStrategy::ByExistingCommandBuffer | SyncStrategy::NotRequired => Ok(None),
        }
    }

    fn submit_via_semaphore(&mut self, wait_semaphores: Vec<Semaphore>) -> Result<(), SyncError> {
        let Some(sink) = self.semaphore_sink.take() else {
            return Ok(());
        };
        let mut command_buffer = self.take_owned_command_buffer()?;

        // Closing barrier: the consumer of the semaphore is unknown.
        command_buffer.establish_global_memory_barrier(
            PipelineStage::ALL_COMMANDS,
            PipelineStage::ALL_COMMANDS,
            Some(MemoryAccess::ANY),
            Some(MemoryAccess::ANY),
        );
        command_buffer.end_recording()?;

        let semaphore = self
            .queue_to_use()
            .submit_and_obtain_semaphore(command_buffer, wait_semaphores)?;
        log::trace!("Handing semaphore {} to the caller", semaphore.id());
        sink(semaphore);
        Ok(())
    }

    fn submit_via_barrier(&mut self) -> Result<(), SyncError> {
        let handoff = match std::mem::take(&mut self.command_buffer_slot) {
            CommandBufferSlot::Handoff(handoff) => handoff,
            slot => {
                // Auxiliary: the master submits.
                self.command_buffer_slot = slot;
                return Ok(());
            }
        };

        let mut command_buffer = self.take_owned_command_buffer()?;
        command_buffer.end_recording()?;
        self.queue_to_use().submit(&command_buffer, None)?;
        handoff(command_buffer);
        Ok(())
    }

    fn submit_and_wait_idle(&mut self, strategy: SyncStrategy) -> Result<(), SyncError> {
        let mut command_buffer = self.take_owned_command_buffer()?;
        command_buffer.end_recording()?;

        let queue = self.queue_to_use();
        if strategy == SyncStrategy::ViaWaitIdle {
            log::warn!(
                "Waiting for queue {} to become idle because no other synchronization strategy was configured",
                queue.queue_index()
            );
        }
        queue.submit(&command_buffer, None)?;
        queue.wait_idle()?;
        Ok(())
    }

    fn return_command_buffer(&mut self) -> Result<CommandBuffer, SyncError> {
        let Some(mut command_buffer) = self.owned_command_buffer.take() else {
            panic!("synchronization by return was requested, but no command buffer was ever recorded");
        };
        command_buffer.end_recording()?;
        Ok(command_buffer)
    }
}
