//! Type conversions between synchronization types and Vulkan types.

use ash::vk;

use crate::types::{CommandBufferRequest, ImageAspect, ImageLayout, MemoryAccess, PipelineStage};

const STAGES: &[(PipelineStage, vk::PipelineStageFlags)] = &[
    (PipelineStage::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
    (PipelineStage::DRAW_INDIRECT, vk::PipelineStageFlags::DRAW_INDIRECT),
    (PipelineStage::VERTEX_INPUT, vk::PipelineStageFlags::VERTEX_INPUT),
    (PipelineStage::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
    (
        PipelineStage::TESSELLATION_CONTROL_SHADER,
        vk::PipelineStageFlags::TESSELLATION_CONTROL_SHADER,
    ),
    (
        PipelineStage::TESSELLATION_EVALUATION_SHADER,
        vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER,
    ),
    (PipelineStage::GEOMETRY_SHADER, vk::PipelineStageFlags::GEOMETRY_SHADER),
    (PipelineStage::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
    (
        PipelineStage::EARLY_FRAGMENT_TESTS,
        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
    ),
    (
        PipelineStage::LATE_FRAGMENT_TESTS,
        vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
    ),
    (
        PipelineStage::COLOR_ATTACHMENT_OUTPUT,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    ),
    (PipelineStage::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER),
    (PipelineStage::TRANSFER, vk::PipelineStageFlags::TRANSFER),
    (PipelineStage::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    (PipelineStage::HOST, vk::PipelineStageFlags::HOST),
    (PipelineStage::ALL_GRAPHICS, vk::PipelineStageFlags::ALL_GRAPHICS),
    (PipelineStage::ALL_COMMANDS, vk::PipelineStageFlags::ALL_COMMANDS),
];

const ACCESSES: &[(MemoryAccess, vk::AccessFlags)] = &[
    (
        MemoryAccess::INDIRECT_COMMAND_READ,
        vk::AccessFlags::INDIRECT_COMMAND_READ,
    ),
    (MemoryAccess::INDEX_READ, vk::AccessFlags::INDEX_READ),
    (
        MemoryAccess::VERTEX_ATTRIBUTE_READ,
        vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
    ),
    (MemoryAccess::UNIFORM_READ, vk::AccessFlags::UNIFORM_READ),
    (
        MemoryAccess::INPUT_ATTACHMENT_READ,
        vk::AccessFlags::INPUT_ATTACHMENT_READ,
    ),
    (MemoryAccess::SHADER_READ, vk::AccessFlags::SHADER_READ),
    (MemoryAccess::SHADER_WRITE, vk::AccessFlags::SHADER_WRITE),
    (
        MemoryAccess::COLOR_ATTACHMENT_READ,
        vk::AccessFlags::COLOR_ATTACHMENT_READ,
    ),
    (
        MemoryAccess::COLOR_ATTACHMENT_WRITE,
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
    ),
    (
        MemoryAccess::DEPTH_STENCIL_ATTACHMENT_READ,
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
    ),
    (
        MemoryAccess::DEPTH_STENCIL_ATTACHMENT_WRITE,
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
    ),
    (MemoryAccess::TRANSFER_READ, vk::AccessFlags::TRANSFER_READ),
    (MemoryAccess::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_WRITE),
    (MemoryAccess::HOST_READ, vk::AccessFlags::HOST_READ),
    (MemoryAccess::HOST_WRITE, vk::AccessFlags::HOST_WRITE),
    (MemoryAccess::MEMORY_READ, vk::AccessFlags::MEMORY_READ),
    (MemoryAccess::MEMORY_WRITE, vk::AccessFlags::MEMORY_WRITE),
];

/// Convert pipeline stages to Vulkan pipeline stage flags.
pub fn convert_pipeline_stage(stage: PipelineStage) -> vk::PipelineStageFlags {
    STAGES
        .iter()
        .filter(|(ours, _)| stage.contains(*ours))
        .fold(vk::PipelineStageFlags::empty(), |acc, (_, native)| {
            acc | *native
        })
}

/// Convert source stages, substituting TOP_OF_PIPE for an empty mask
/// (Vulkan rejects empty stage masks).
pub fn convert_src_stage(stage: PipelineStage) -> vk::PipelineStageFlags {
    let flags = convert_pipeline_stage(stage);
    if flags.is_empty() {
        vk::PipelineStageFlags::TOP_OF_PIPE
    } else {
        flags
    }
}

/// Convert destination stages, substituting BOTTOM_OF_PIPE for an empty mask.
pub fn convert_dst_stage(stage: PipelineStage) -> vk::PipelineStageFlags {
    let flags = convert_pipeline_stage(stage);
    if flags.is_empty() {
        vk::PipelineStageFlags::BOTTOM_OF_PIPE
    } else {
        flags
    }
}

/// Convert memory access to Vulkan access flags. `None` means no access.
pub fn convert_memory_access(access: Option<MemoryAccess>) -> vk::AccessFlags {
    let Some(access) = access else {
        return vk::AccessFlags::empty();
    };
    ACCESSES
        .iter()
        .filter(|(ours, _)| access.contains(*ours))
        .fold(vk::AccessFlags::empty(), |acc, (_, native)| acc | *native)
}

/// Convert an image layout to the Vulkan image layout.
pub fn convert_image_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Convert image aspects to Vulkan image aspect flags.
pub fn convert_image_aspect(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut result = vk::ImageAspectFlags::empty();

    if aspect.contains(ImageAspect::COLOR) {
        result |= vk::ImageAspectFlags::COLOR;
    }
    if aspect.contains(ImageAspect::DEPTH) {
        result |= vk::ImageAspectFlags::DEPTH;
    }
    if aspect.contains(ImageAspect::STENCIL) {
        result |= vk::ImageAspectFlags::STENCIL;
    }

    result
}

/// Usage flags passed when a command buffer begins recording.
pub fn convert_command_buffer_request(
    request: CommandBufferRequest,
) -> vk::CommandBufferUsageFlags {
    match request {
        CommandBufferRequest::Reusable => vk::CommandBufferUsageFlags::empty(),
        CommandBufferRequest::SingleUse => vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
    }
}
