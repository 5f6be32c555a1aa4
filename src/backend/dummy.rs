//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. Every pool, queue,
//! command buffer and semaphore created from one [`DummyDevice`] appends what
//! it would have done to a shared event log, so tests can observe exactly
//! which barriers were recorded and how work was submitted.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SyncError;
use crate::types::{CommandBufferRequest, ImageLayout, MemoryAccess, PipelineStage};

use super::{CommandBuffer, CommandPool, ImageBarrier, ImageHandle, Queue, Semaphore};

/// An action observed by the dummy backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DummyEvent {
    /// A command buffer was handed out by the pool.
    Allocated {
        command_buffer: u64,
        request: CommandBufferRequest,
    },
    BeginRecording {
        command_buffer: u64,
    },
    EndRecording {
        command_buffer: u64,
    },
    GlobalBarrier {
        command_buffer: u64,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    },
    ImageBarrier {
        command_buffer: u64,
        image: u64,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    },
    CopyImage {
        command_buffer: u64,
        src: u64,
        dst: u64,
    },
    /// A command buffer was submitted to a queue.
    Submitted {
        queue: u32,
        command_buffer: u64,
        wait_semaphores: Vec<u64>,
        signal_semaphore: Option<u64>,
    },
    /// The host blocked until a queue became idle.
    QueueIdle {
        queue: u32,
    },
    /// A command buffer was dropped and returned to the pool.
    Released {
        command_buffer: u64,
    },
}

impl DummyEvent {
    /// The command buffer this event concerns, if any.
    pub fn command_buffer(&self) -> Option<u64> {
        match self {
            Self::Allocated { command_buffer, .. }
            | Self::BeginRecording { command_buffer }
            | Self::EndRecording { command_buffer }
            | Self::GlobalBarrier { command_buffer, .. }
            | Self::ImageBarrier { command_buffer, .. }
            | Self::CopyImage { command_buffer, .. }
            | Self::Submitted { command_buffer, .. }
            | Self::Released { command_buffer } => Some(*command_buffer),
            Self::QueueIdle { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct DummyState {
    next_command_buffer: u64,
    next_semaphore: u64,
    events: Vec<DummyEvent>,
    fail_next_allocation: bool,
    fail_next_submission: bool,
}

/// Dummy device: the shared state behind all dummy pools and queues.
///
/// Cloning the device shares the event log.
#[derive(Debug, Clone, Default)]
pub struct DummyDevice {
    state: Arc<Mutex<DummyState>>,
}

impl DummyDevice {
    /// Create a new dummy device with an empty event log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    /// A command pool allocating from this device.
    pub fn command_pool(&self) -> CommandPool {
        CommandPool::Dummy(self.clone())
    }

    /// The queue with the given index (family 0).
    pub fn queue(&self, index: u32) -> Queue {
        Queue::Dummy(DummyQueue {
            device: self.clone(),
            index,
        })
    }

    /// Create a standalone semaphore, e.g. to wait on in a later submission.
    pub fn create_semaphore(&self) -> Semaphore {
        Semaphore::Dummy(DummySemaphore {
            id: self.next_semaphore_id(),
        })
    }

    /// Snapshot of all recorded events, in order.
    pub fn events(&self) -> Vec<DummyEvent> {
        self.state.lock().events.clone()
    }

    /// Forget all recorded events.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Make the next command buffer allocation fail.
    pub fn fail_next_allocation(&self) {
        self.state.lock().fail_next_allocation = true;
    }

    /// Make the next queue submission fail.
    pub fn fail_next_submission(&self) {
        self.state.lock().fail_next_submission = true;
    }

    pub(super) fn allocate(
        &self,
        request: CommandBufferRequest,
    ) -> Result<CommandBuffer, SyncError> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_allocation) {
            return Err(SyncError::CommandBufferAllocation(
                "dummy pool exhausted".to_string(),
            ));
        }

        let id = state.next_command_buffer;
        state.next_command_buffer += 1;
        state.events.push(DummyEvent::Allocated {
            command_buffer: id,
            request,
        });
        log::trace!("DummyDevice: allocated command buffer {} ({:?})", id, request);

        Ok(CommandBuffer::Dummy(DummyCommandBuffer {
            id,
            request,
            recording: false,
            device: self.clone(),
        }))
    }

    fn next_semaphore_id(&self) -> u64 {
        let mut state = self.state.lock();
        let id = state.next_semaphore;
        state.next_semaphore += 1;
        id
    }

    fn push(&self, event: DummyEvent) {
        self.state.lock().events.push(event);
    }
}

/// Dummy command buffer.
#[derive(Debug)]
pub struct DummyCommandBuffer {
    id: u64,
    request: CommandBufferRequest,
    recording: bool,
    device: DummyDevice,
}

impl DummyCommandBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(super) fn request(&self) -> CommandBufferRequest {
        self.request
    }

    pub(super) fn is_recording(&self) -> bool {
        self.recording
    }

    pub(super) fn begin_recording(&mut self) -> Result<(), SyncError> {
        if self.recording {
            return Err(SyncError::Recording(format!(
                "command buffer {} is already recording",
                self.id
            )));
        }
        self.recording = true;
        self.device.push(DummyEvent::BeginRecording {
            command_buffer: self.id,
        });
        Ok(())
    }

    pub(super) fn end_recording(&mut self) -> Result<(), SyncError> {
        if !self.recording {
            return Err(SyncError::Recording(format!(
                "command buffer {} is not recording",
                self.id
            )));
        }
        self.recording = false;
        self.device.push(DummyEvent::EndRecording {
            command_buffer: self.id,
        });
        Ok(())
    }

    pub(super) fn record_global_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    ) {
        self.device.push(DummyEvent::GlobalBarrier {
            command_buffer: self.id,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        });
    }

    pub(super) fn record_image_barrier(&mut self, barrier: &ImageBarrier<'_>) {
        self.device.push(DummyEvent::ImageBarrier {
            command_buffer: self.id,
            image: barrier.image.raw(),
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
            src_stage: barrier.src_stage,
            dst_stage: barrier.dst_stage,
            src_access: barrier.src_access,
            dst_access: barrier.dst_access,
        });
    }

    pub(super) fn record_copy_image(&mut self, src: &ImageHandle, dst: &ImageHandle) {
        self.device.push(DummyEvent::CopyImage {
            command_buffer: self.id,
            src: src.raw(),
            dst: dst.raw(),
        });
    }
}

impl Drop for DummyCommandBuffer {
    fn drop(&mut self) {
        self.device.push(DummyEvent::Released {
            command_buffer: self.id,
        });
    }
}

/// Dummy semaphore. Only carries an identifier.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DummySemaphore {
    id: u64,
}

impl DummySemaphore {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Dummy queue.
#[derive(Debug, Clone)]
pub struct DummyQueue {
    device: DummyDevice,
    index: u32,
}

impl DummyQueue {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(super) fn submit(
        &self,
        command_buffer: &CommandBuffer,
        signal: Option<&Semaphore>,
    ) -> Result<(), SyncError> {
        self.record_submission(command_buffer, Vec::new(), signal.map(Semaphore::id))
    }

    pub(super) fn submit_and_obtain_semaphore(
        &self,
        command_buffer: CommandBuffer,
        wait_semaphores: Vec<Semaphore>,
    ) -> Result<Semaphore, SyncError> {
        let semaphore = self.device.create_semaphore();
        let waits = wait_semaphores.iter().map(Semaphore::id).collect();
        self.record_submission(&command_buffer, waits, Some(semaphore.id()))?;
        // Completes immediately, so the command buffer and the wait
        // semaphores can go right away.
        drop(command_buffer);
        drop(wait_semaphores);
        Ok(semaphore)
    }

    pub(super) fn wait_idle(&self) -> Result<(), SyncError> {
        self.device.push(DummyEvent::QueueIdle { queue: self.index });
        Ok(())
    }

    fn record_submission(
        &self,
        command_buffer: &CommandBuffer,
        wait_semaphores: Vec<u64>,
        signal_semaphore: Option<u64>,
    ) -> Result<(), SyncError> {
        let mut state = self.device.state.lock();
        if std::mem::take(&mut state.fail_next_submission) {
            return Err(SyncError::Submission("dummy queue rejected work".to_string()));
        }
        state.events.push(DummyEvent::Submitted {
            queue: self.index,
            command_buffer: command_buffer.id(),
            wait_semaphores,
            signal_semaphore,
        });
        log::trace!(
            "DummyQueue {}: submitted command buffer {}",
            self.index,
            command_buffer.id()
        );
        Ok(())
    }
}
