//! Vulkan backend using ash.
//!
//! The caller owns instance and logical device creation; a [`VulkanDevice`]
//! wraps an existing `ash::Device`, creates the command pool that
//! synchronization requests allocate from, and hands out queues of the same
//! family.
//!
//! Command buffers and semaphores hold an `Arc` to their device. Dropping
//! them parks the native handle in the [`DeferredDestructor`]; call
//! [`VulkanDevice::advance_frame`] once per frame (after waiting on the frame's
//! fence) to actually release them.
//!
//! Host access to the command pool, and to every buffer allocated from it,
//! must be externally synchronized. Allocation, recording and release all
//! take the device's pool lock, so requests on different threads may share
//! one [`VulkanDevice`].

pub mod command;
pub mod conversion;
pub mod deferred;

use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;

use crate::error::SyncError;
use crate::image::TrackedImage;
use crate::types::{CommandBufferRequest, ImageAspect, MemoryAccess, PipelineStage};

use self::conversion::{
    convert_command_buffer_request, convert_dst_stage, convert_image_aspect,
    convert_image_layout, convert_memory_access, convert_src_stage,
};
use self::deferred::{DeferredDestructor, DeferredResource};
use super::{CommandBuffer, CommandPool, ImageBarrier, ImageHandle, Queue, Semaphore};

/// Map a Vulkan result code into a [`SyncError`].
pub(crate) fn vk_error(result: vk::Result, wrap: fn(String) -> SyncError) -> SyncError {
    match result {
        vk::Result::ERROR_DEVICE_LOST => SyncError::DeviceLost,
        other => wrap(format!("{other:?}")),
    }
}

// ============================================================================
// Device
// ============================================================================

/// Vulkan device wrapper owning the command pool used for synchronization.
pub struct VulkanDevice {
    device: ash::Device,
    /// Held for any host access to the pool or its command buffers.
    command_pool: Mutex<vk::CommandPool>,
    queue_family_index: u32,
    deferred_destructor: DeferredDestructor,
    /// `vkQueueSubmit` and `vkQueueWaitIdle` require external synchronization.
    submission_lock: Mutex<()>,
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("handle", &self.device.handle())
            .field("queue_family_index", &self.queue_family_index)
            .finish_non_exhaustive()
    }
}

impl VulkanDevice {
    /// Wrap `device`, creating a command pool for `queue_family_index`.
    ///
    /// The `ash::Device` must outlive the returned value and everything
    /// allocated from it; it is not destroyed on drop.
    pub fn new(device: ash::Device, queue_family_index: u32) -> Result<Arc<Self>, SyncError> {
        let command_pool = command::create_command_pool(&device, queue_family_index)?;
        log::info!(
            "Created Vulkan synchronization pool for queue family {}",
            queue_family_index
        );

        Ok(Arc::new(Self {
            device,
            command_pool: Mutex::new(command_pool),
            queue_family_index,
            deferred_destructor: DeferredDestructor::new(),
            submission_lock: Mutex::new(()),
        }))
    }

    /// Get the ash device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the queue family this device's pool allocates for.
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Get the deferred destructor.
    pub fn deferred_destructor(&self) -> &DeferredDestructor {
        &self.deferred_destructor
    }

    /// A command pool allocating from this device.
    pub fn command_pool(self: &Arc<Self>) -> CommandPool {
        CommandPool::Vulkan(Arc::clone(self))
    }

    /// Queue `queue_index` of this device's queue family.
    pub fn queue(self: &Arc<Self>, queue_index: u32) -> Queue {
        let queue = unsafe {
            self.device
                .get_device_queue(self.queue_family_index, queue_index)
        };
        Queue::Vulkan(VulkanQueue {
            device: Arc::clone(self),
            queue,
            queue_index,
        })
    }

    /// Create a binary semaphore.
    pub fn create_semaphore(self: &Arc<Self>) -> Result<Semaphore, SyncError> {
        VulkanSemaphore::new(self).map(Semaphore::Vulkan)
    }

    /// Release command buffers and semaphores dropped `MAX_FRAMES_IN_FLIGHT`
    /// frames ago.
    ///
    /// # Safety
    ///
    /// The caller must ensure the GPU has finished all work submitted that
    /// many frames ago.
    pub unsafe fn advance_frame(&self) {
        let _pool = self.command_pool.lock();
        unsafe { self.deferred_destructor.advance_frame(&self.device) };
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                log::error!("Failed to wait for device idle: {:?}", e);
            }
            let command_pool = *self.command_pool.get_mut();
            self.deferred_destructor.flush_all(&self.device);
            self.device.destroy_command_pool(command_pool, None);
        }
    }
}

// ============================================================================
// Command buffers
// ============================================================================

/// Vulkan primary command buffer.
pub struct VulkanCommandBuffer {
    device: Arc<VulkanDevice>,
    handle: vk::CommandBuffer,
    request: CommandBufferRequest,
    recording: bool,
}

impl std::fmt::Debug for VulkanCommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanCommandBuffer")
            .field("handle", &self.handle)
            .field("request", &self.request)
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}

impl VulkanCommandBuffer {
    pub(super) fn allocate(
        device: &Arc<VulkanDevice>,
        request: CommandBufferRequest,
    ) -> Result<Self, SyncError> {
        let handle = {
            let pool = device.command_pool.lock();
            command::allocate_primary_command_buffer(&device.device, *pool)?
        };
        log::trace!("Allocated Vulkan command buffer {:?} ({:?})", handle, request);
        Ok(Self {
            device: Arc::clone(device),
            handle,
            request,
            recording: false,
        })
    }

    /// Native handle.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    pub(super) fn request(&self) -> CommandBufferRequest {
        self.request
    }

    pub(super) fn is_recording(&self) -> bool {
        self.recording
    }

    pub(super) fn begin_recording(&mut self) -> Result<(), SyncError> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(convert_command_buffer_request(self.request));

        let _pool = self.device.command_pool.lock();
        unsafe { self.device.device.begin_command_buffer(self.handle, &begin_info) }
            .map_err(|e| vk_error(e, SyncError::Recording))?;
        self.recording = true;
        Ok(())
    }

    pub(super) fn end_recording(&mut self) -> Result<(), SyncError> {
        let _pool = self.device.command_pool.lock();
        unsafe { self.device.device.end_command_buffer(self.handle) }
            .map_err(|e| vk_error(e, SyncError::Recording))?;
        self.recording = false;
        Ok(())
    }

    pub(super) fn record_global_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Option<MemoryAccess>,
        dst_access: Option<MemoryAccess>,
    ) {
        let memory_barriers: Vec<vk::MemoryBarrier> =
            if src_access.is_none() && dst_access.is_none() {
                Vec::new()
            } else {
                vec![
                    vk::MemoryBarrier::default()
                        .src_access_mask(convert_memory_access(src_access))
                        .dst_access_mask(convert_memory_access(dst_access)),
                ]
            };

        let _pool = self.device.command_pool.lock();
        unsafe {
            self.device.device.cmd_pipeline_barrier(
                self.handle,
                convert_src_stage(src_stage),
                convert_dst_stage(dst_stage),
                vk::DependencyFlags::empty(),
                &memory_barriers,
                &[],
                &[],
            );
        }
    }

    pub(super) fn record_image_barrier(&mut self, barrier: &ImageBarrier<'_>) {
        let ImageHandle::Vulkan(image) = *barrier.image else {
            log::warn!(
                "Image barrier skipped: image {} does not belong to the Vulkan backend",
                barrier.image.raw()
            );
            return;
        };

        let image_barrier = vk::ImageMemoryBarrier::default()
            .old_layout(convert_image_layout(barrier.old_layout))
            .new_layout(convert_image_layout(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: convert_image_aspect(barrier.aspect),
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            })
            .src_access_mask(convert_memory_access(barrier.src_access))
            .dst_access_mask(convert_memory_access(barrier.dst_access));

        let _pool = self.device.command_pool.lock();
        unsafe {
            self.device.device.cmd_pipeline_barrier(
                self.handle,
                convert_src_stage(barrier.src_stage),
                convert_dst_stage(barrier.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            );
        }
    }

    pub(super) fn record_copy_image(&mut self, src: &TrackedImage, dst: &TrackedImage) {
        let (ImageHandle::Vulkan(src_image), ImageHandle::Vulkan(dst_image)) =
            (*src.handle(), *dst.handle())
        else {
            log::warn!("Image copy skipped: images do not belong to the Vulkan backend");
            return;
        };

        let layers = |aspect: ImageAspect| vk::ImageSubresourceLayers {
            aspect_mask: convert_image_aspect(aspect),
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let extent = src.extent();
        let region = vk::ImageCopy::default()
            .src_subresource(layers(src.aspect()))
            .dst_subresource(layers(dst.aspect()))
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: extent.depth,
            });

        let _pool = self.device.command_pool.lock();
        unsafe {
            self.device.device.cmd_copy_image(
                self.handle,
                src_image,
                convert_image_layout(src.current_layout()),
                dst_image,
                convert_image_layout(dst.current_layout()),
                &[region],
            );
        }
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        let pool = *self.device.command_pool.lock();
        self.device
            .deferred_destructor
            .park(DeferredResource::CommandBuffer {
                pool,
                buffer: self.handle,
            });
    }
}

// ============================================================================
// Semaphores
// ============================================================================

/// Vulkan binary semaphore.
pub struct VulkanSemaphore {
    device: Arc<VulkanDevice>,
    semaphore: vk::Semaphore,
}

impl std::fmt::Debug for VulkanSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanSemaphore")
            .field("semaphore", &self.semaphore)
            .finish_non_exhaustive()
    }
}

impl VulkanSemaphore {
    fn new(device: &Arc<VulkanDevice>) -> Result<Self, SyncError> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.device.create_semaphore(&semaphore_info, None) }
            .map_err(|e| vk_error(e, SyncError::SemaphoreCreation))?;
        Ok(Self {
            device: Arc::clone(device),
            semaphore,
        })
    }

    /// Native handle.
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        self.device
            .deferred_destructor
            .park(DeferredResource::Semaphore(self.semaphore));
    }
}

// ============================================================================
// Queues
// ============================================================================

/// Vulkan queue of the device's queue family.
#[derive(Clone)]
pub struct VulkanQueue {
    device: Arc<VulkanDevice>,
    queue: vk::Queue,
    queue_index: u32,
}

impl std::fmt::Debug for VulkanQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanQueue")
            .field("queue", &self.queue)
            .field("family_index", &self.device.queue_family_index)
            .field("queue_index", &self.queue_index)
            .finish()
    }
}

impl VulkanQueue {
    pub fn family_index(&self) -> u32 {
        self.device.queue_family_index
    }

    pub fn queue_index(&self) -> u32 {
        self.queue_index
    }

    pub(super) fn submit(
        &self,
        command_buffer: &CommandBuffer,
        signal: Option<&Semaphore>,
    ) -> Result<(), SyncError> {
        let cmd = native_command_buffer(command_buffer)?;
        let signal: Vec<vk::Semaphore> = signal
            .map(native_semaphore)
            .transpose()?
            .into_iter()
            .collect();
        self.queue_submit(cmd, &[], &signal)
    }

    pub(super) fn submit_and_obtain_semaphore(
        &self,
        command_buffer: CommandBuffer,
        wait_semaphores: Vec<Semaphore>,
    ) -> Result<Semaphore, SyncError> {
        let cmd = native_command_buffer(&command_buffer)?;
        let waits = wait_semaphores
            .iter()
            .map(native_semaphore)
            .collect::<Result<Vec<_>, _>>()?;
        let signal = VulkanSemaphore::new(&self.device)?;

        self.queue_submit(cmd, &waits, &[signal.handle()])?;

        // Both are parked in the deferred destructor until the GPU is done.
        drop(command_buffer);
        drop(wait_semaphores);
        Ok(Semaphore::Vulkan(signal))
    }

    pub(super) fn wait_idle(&self) -> Result<(), SyncError> {
        let _guard = self.device.submission_lock.lock();
        unsafe { self.device.device.queue_wait_idle(self.queue) }
            .map_err(|e| vk_error(e, SyncError::WaitIdle))
    }

    fn queue_submit(
        &self,
        cmd: vk::CommandBuffer,
        wait_semaphores: &[vk::Semaphore],
        signal_semaphores: &[vk::Semaphore],
    ) -> Result<(), SyncError> {
        let command_buffers = [cmd];
        let wait_stage_masks: Vec<vk::PipelineStageFlags> = wait_semaphores
            .iter()
            .map(|_| vk::PipelineStageFlags::ALL_COMMANDS)
            .collect();

        let mut submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        if !wait_semaphores.is_empty() {
            submit_info = submit_info
                .wait_semaphores(wait_semaphores)
                .wait_dst_stage_mask(&wait_stage_masks);
        }
        if !signal_semaphores.is_empty() {
            submit_info = submit_info.signal_semaphores(signal_semaphores);
        }

        let _guard = self.device.submission_lock.lock();
        unsafe {
            self.device
                .device
                .queue_submit(self.queue, &[submit_info], vk::Fence::null())
        }
        .map_err(|e| vk_error(e, SyncError::Submission))
    }
}

fn native_command_buffer(command_buffer: &CommandBuffer) -> Result<vk::CommandBuffer, SyncError> {
    match command_buffer {
        CommandBuffer::Vulkan(cmd) => Ok(cmd.handle()),
        other => Err(SyncError::Submission(format!(
            "command buffer {} was not allocated by the Vulkan backend",
            other.id()
        ))),
    }
}

fn native_semaphore(semaphore: &Semaphore) -> Result<vk::Semaphore, SyncError> {
    match semaphore {
        Semaphore::Vulkan(semaphore) => Ok(semaphore.handle()),
        other => Err(SyncError::Submission(format!(
            "semaphore {} was not created by the Vulkan backend",
            other.id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lost_maps_to_dedicated_error() {
        assert_eq!(
            vk_error(vk::Result::ERROR_DEVICE_LOST, SyncError::Submission),
            SyncError::DeviceLost
        );
        assert_eq!(
            vk_error(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY, SyncError::Recording),
            SyncError::Recording("ERROR_OUT_OF_DEVICE_MEMORY".to_string())
        );
    }

    #[test]
    fn test_foreign_command_buffer_is_rejected() {
        let device = crate::backend::DummyDevice::new();
        let cmd = device
            .command_pool()
            .allocate(CommandBufferRequest::SingleUse)
            .unwrap();

        assert!(matches!(
            native_command_buffer(&cmd),
            Err(SyncError::Submission(_))
        ));
    }
}
