//! Vulkan command pool and buffer management.

use ash::vk;

use crate::error::SyncError;

use super::vk_error;

/// Create a command pool whose buffers can be individually reset.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> Result<vk::CommandPool, SyncError> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    let pool = unsafe { device.create_command_pool(&pool_info, None) }
        .map_err(|e| vk_error(e, SyncError::CommandBufferAllocation))?;

    Ok(pool)
}

/// Allocate a single primary command buffer from `pool`.
pub fn allocate_primary_command_buffer(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> Result<vk::CommandBuffer, SyncError> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(|e| vk_error(e, SyncError::CommandBufferAllocation))?;

    buffers.into_iter().next().ok_or_else(|| {
        SyncError::CommandBufferAllocation("driver returned no command buffer".to_string())
    })
}
