//! GPU backend abstraction layer.
//!
//! The synchronization core only ever talks to the handful of primitives in
//! this module: a command pool that hands out command buffers, the command
//! buffer's recording calls (begin, end, barriers), a queue that submits and
//! waits, and opaque semaphores.
//!
//! # Available Backends
//!
//! - `dummy` (always compiled): records every call into an event log, for tests
//! - `vulkan-backend`: native Vulkan backend using ash
//!
//! Each primitive is an enum dispatching to the backend that created it.

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

pub mod dummy;

#[cfg(feature = "vulkan-backend")]
use std::sync::Arc;

#[cfg(feature = "vulkan-backend")]
use ash::vk;
#[cfg(feature = "vulkan-backend")]
use ash::vk::Handle;

use crate::error::SyncError;
use crate::image::TrackedImage;
use crate::types::{
    CommandBufferRequest, ImageAspect, ImageLayout, MemoryAccess, PipelineStage,
    ReadMemoryAccess, WriteMemoryAccess,
};

pub use dummy::{DummyCommandBuffer, DummyDevice, DummyEvent, DummyQueue, DummySemaphore};

#[cfg(feature = "vulkan-backend")]
pub use vulkan::{VulkanCommandBuffer, VulkanDevice, VulkanQueue, VulkanSemaphore};

/// Handle to a native image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageHandle {
    /// Dummy backend image, identified by an arbitrary number.
    Dummy(u64),
    /// Vulkan backend image.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::Image),
}

impl ImageHandle {
    /// Raw numeric value of the handle, for logging and event logs.
    pub fn raw(&self) -> u64 {
        match self {
            Self::Dummy(id) => *id,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(image) => image.as_raw(),
        }
    }
}

/// An image barrier resolved from a [`TrackedImage`], handed to the backends.
#[derive(Debug)]
pub(crate) struct ImageBarrier<'i> {
    pub image: &'i ImageHandle,
    pub aspect: ImageAspect,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub src_access: Option<MemoryAccess>,
    pub dst_access: Option<MemoryAccess>,
}

// ============================================================================
// Command buffers
// ============================================================================

/// An owned command buffer.
///
/// Dropping it returns it to its pool. For the Vulkan backend the native free
/// is deferred until the GPU can no longer be using it.
#[derive(Debug)]
pub enum CommandBuffer {
    Dummy(DummyCommandBuffer),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(VulkanCommandBuffer),
}

impl CommandBuffer {
    /// Raw numeric identifier, for logging and event logs.
    pub fn id(&self) -> u64 {
        match self {
            Self::Dummy(cmd) => cmd.id(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.handle().as_raw(),
        }
    }

    /// The usage this buffer was allocated for.
    pub fn request(&self) -> CommandBufferRequest {
        match self {
            Self::Dummy(cmd) => cmd.request(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.request(),
        }
    }

    /// Whether commands can currently be recorded.
    pub fn is_recording(&self) -> bool {
        match self {
            Self::Dummy(cmd) => cmd.is_recording(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.is_recording(),
        }
    }

    /// Start recording commands.
    pub fn begin_recording(&mut self) -> Result<(), SyncError> {
        match self {
            Self::Dummy(cmd) => cmd.begin_recording(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.begin_recording(),
        }
    }

    /// Stop recording commands. The buffer is ready for submission afterwards.
    pub fn end_recording(&mut self) -> Result<(), SyncError> {
        match self {
            Self::Dummy(cmd) => cmd.end_recording(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.end_recording(),
        }
    }

    /// Record a global memory barrier.
    ///
    /// Work in `dst_stage` waits for work in `src_stage`; `src_access` is made
    /// available and then `dst_access` made visible. `None` means no memory
    /// dependency for that side (execution dependency only).
    pub fn establish_global_memory_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    ) {
        if !self.is_recording() {
            log::error!(
                "Global barrier ignored: command buffer {} is not recording",
                self.id()
            );
            return;
        }
        match self {
            Self::Dummy(cmd) => {
                cmd.record_global_barrier(src_stage, dst_stage, src_access, dst_access)
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => {
                cmd.record_global_barrier(src_stage, dst_stage, src_access, dst_access)
            }
        }
    }

    /// Global memory barrier from prior writes to subsequent reads.
    pub fn establish_global_memory_barrier_rw(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<WriteMemoryAccess>,
        dst_access: Option<ReadMemoryAccess>,
    ) {
        self.establish_global_memory_barrier(
            src_stage,
            dst_stage,
            src_access.map(MemoryAccess::from),
            dst_access.map(MemoryAccess::from),
        );
    }

    /// Record an image memory barrier that transitions `image` from its
    /// current layout into its target layout.
    pub fn establish_image_memory_barrier(
        &mut self,
        image: &TrackedImage,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    ) {
        if !self.is_recording() {
            log::error!(
                "Image barrier ignored: command buffer {} is not recording",
                self.id()
            );
            return;
        }
        let (old_layout, new_layout) = image.commit_transition();
        let barrier = ImageBarrier {
            image: image.handle(),
            aspect: image.aspect(),
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        };
        match self {
            Self::Dummy(cmd) => cmd.record_image_barrier(&barrier),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.record_image_barrier(&barrier),
        }
    }

    /// Image memory barrier from prior writes to subsequent reads.
    pub fn establish_image_memory_barrier_rw(
        &mut self,
        image: &TrackedImage,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<WriteMemoryAccess>,
        dst_access: Option<ReadMemoryAccess>,
    ) {
        self.establish_image_memory_barrier(
            image,
            src_stage,
            dst_stage,
            src_access.map(MemoryAccess::from),
            dst_access.map(MemoryAccess::from),
        );
    }

    /// Record a copy of the whole of `src` into `dst`, in their current layouts.
    pub fn copy_image(&mut self, src: &TrackedImage, dst: &TrackedImage) {
        if !self.is_recording() {
            log::error!(
                "Image copy ignored: command buffer {} is not recording",
                self.id()
            );
            return;
        }
        match self {
            Self::Dummy(cmd) => cmd.record_copy_image(src.handle(), dst.handle()),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(cmd) => cmd.record_copy_image(src, dst),
        }
    }
}

// ============================================================================
// Semaphores
// ============================================================================

/// An owned GPU semaphore.
#[derive(Debug)]
pub enum Semaphore {
    Dummy(DummySemaphore),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(VulkanSemaphore),
}

impl Semaphore {
    /// Raw numeric identifier, for logging and event logs.
    pub fn id(&self) -> u64 {
        match self {
            Self::Dummy(semaphore) => semaphore.id(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(semaphore) => semaphore.handle().as_raw(),
        }
    }
}

// ============================================================================
// Pools and queues
// ============================================================================

/// Source of new command buffers.
#[derive(Debug, Clone)]
pub enum CommandPool {
    Dummy(DummyDevice),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(Arc<VulkanDevice>),
}

impl CommandPool {
    /// Allocate a command buffer. Recording is not started.
    pub fn allocate(&self, request: CommandBufferRequest) -> Result<CommandBuffer, SyncError> {
        match self {
            Self::Dummy(device) => device.allocate(request),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(device) => VulkanCommandBuffer::allocate(device, request)
                .map(CommandBuffer::Vulkan),
        }
    }
}

/// A queue that command buffers are submitted to.
#[derive(Debug, Clone)]
pub enum Queue {
    Dummy(DummyQueue),
    #[cfg(feature = "vulkan-backend")]
    Vulkan(VulkanQueue),
}

impl Queue {
    /// Queue family index.
    pub fn family_index(&self) -> u32 {
        match self {
            Self::Dummy(_) => 0,
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(queue) => queue.family_index(),
        }
    }

    /// Index of the queue within its family.
    pub fn queue_index(&self) -> u32 {
        match self {
            Self::Dummy(queue) => queue.index(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(queue) => queue.queue_index(),
        }
    }

    /// Submit a recorded command buffer, optionally signaling `signal`.
    ///
    /// The caller keeps ownership of the command buffer and must keep it alive
    /// until the GPU is done with it.
    pub fn submit(
        &self,
        command_buffer: &CommandBuffer,
        signal: Option<&Semaphore>,
    ) -> Result<(), SyncError> {
        match self {
            Self::Dummy(queue) => queue.submit(command_buffer, signal),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(queue) => queue.submit(command_buffer, signal),
        }
    }

    /// Submit a recorded command buffer after `wait_semaphores` are signaled
    /// and return a new semaphore signaled on completion.
    ///
    /// The queue takes ownership of the command buffer and the wait
    /// semaphores and keeps them alive until the GPU is done with them.
    pub fn submit_and_obtain_semaphore(
        &self,
        command_buffer: CommandBuffer,
        wait_semaphores: Vec<Semaphore>,
    ) -> Result<Semaphore, SyncError> {
        match self {
            Self::Dummy(queue) => {
                queue.submit_and_obtain_semaphore(command_buffer, wait_semaphores)
            }
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(queue) => {
                queue.submit_and_obtain_semaphore(command_buffer, wait_semaphores)
            }
        }
    }

    /// Block the calling thread until all work on this queue has completed.
    pub fn wait_idle(&self) -> Result<(), SyncError> {
        match self {
            Self::Dummy(queue) => queue.wait_idle(),
            #[cfg(feature = "vulkan-backend")]
            Self::Vulkan(queue) => queue.wait_idle(),
        }
    }
}

static_assertions::assert_impl_all!(CommandPool: Send, Sync);
static_assertions::assert_impl_all!(Queue: Send, Sync);
static_assertions::assert_impl_all!(CommandBuffer: Send);
static_assertions::assert_impl_all!(Semaphore: Send);
