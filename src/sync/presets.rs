//! Ready-made barrier hooks.
//!
//! The default presets assume nothing about neighboring operations and
//! synchronize against all stages and all memory. The `image_copy` presets
//! know the layouts an image copy needs and transition images accordingly.

use crate::backend::CommandBuffer;
use crate::types::{PipelineStage, ReadMemoryAccess, WriteMemoryAccess};

use super::hooks::{AfterOperationHook, BeforeOperationHook};

/// Wait for all prior commands and make all prior writes available before
/// the operation's reads.
pub fn default_before_operation<'a>() -> BeforeOperationHook<'a> {
    Box::new(
        |command_buffer: &mut CommandBuffer,
         dst_stage: PipelineStage,
         dst_access: Option<ReadMemoryAccess>| {
            command_buffer.establish_global_memory_barrier_rw(
                PipelineStage::ALL_COMMANDS,
                dst_stage,
                Some(WriteMemoryAccess::ANY),
                dst_access,
            );
        },
    )
}

/// Make the operation's writes available to all later stages and reads.
pub fn default_after_operation<'a>() -> AfterOperationHook<'a> {
    Box::new(
        |command_buffer: &mut CommandBuffer,
         src_stage: PipelineStage,
         src_access: Option<WriteMemoryAccess>| {
            command_buffer.establish_global_memory_barrier_rw(
                src_stage,
                PipelineStage::ALL_COMMANDS,
                src_access,
                Some(ReadMemoryAccess::ANY),
            );
        },
    )
}

pub mod image_copy {
    //! Hooks for copying one image into another, e.g. into a swapchain image.

    use crate::backend::CommandBuffer;
    use crate::image::TrackedImage;
    use crate::sync::hooks::{AfterOperationHook, BeforeOperationHook};
    use crate::types::{
        ImageLayout, MemoryAccess, PipelineStage, ReadMemoryAccess, WriteMemoryAccess,
    };

    /// Move `dst` into `TransferDst` and `src` into `TransferSrc`, the latter
    /// after all prior writes to it have completed.
    pub fn wait_for_previous_operations<'i>(
        src: &'i TrackedImage,
        dst: &'i TrackedImage,
    ) -> BeforeOperationHook<'i> {
        Box::new(
            move |command_buffer: &mut CommandBuffer,
                  dst_stage: PipelineStage,
                  dst_access: Option<ReadMemoryAccess>| {
                // Previous contents of dst are discarded, nothing to wait for.
                dst.set_target_layout(ImageLayout::TransferDst);
                command_buffer.establish_image_memory_barrier(
                    dst,
                    PipelineStage::TOP_OF_PIPE,
                    PipelineStage::TRANSFER,
                    None,
                    Some(MemoryAccess::TRANSFER_WRITE),
                );

                src.set_target_layout(ImageLayout::TransferSrc);
                command_buffer.establish_image_memory_barrier_rw(
                    src,
                    PipelineStage::ALL_COMMANDS,
                    dst_stage,
                    Some(WriteMemoryAccess::ANY),
                    dst_access,
                );
            },
        )
    }

    /// Move `dst` from `TransferDst` into `ColorAttachment` for further
    /// rendering once the copy has completed.
    pub fn let_subsequent_operations_wait<'i>(
        _src: &'i TrackedImage,
        dst: &'i TrackedImage,
    ) -> AfterOperationHook<'i> {
        Box::new(
            move |command_buffer: &mut CommandBuffer,
                  _src_stage: PipelineStage,
                  _src_access: Option<WriteMemoryAccess>| {
                debug_assert_eq!(dst.current_layout(), ImageLayout::TransferDst);
                dst.set_target_layout(ImageLayout::ColorAttachment);
                command_buffer.establish_image_memory_barrier(
                    dst,
                    PipelineStage::TRANSFER,
                    PipelineStage::ALL_COMMANDS,
                    Some(MemoryAccess::TRANSFER_WRITE),
                    Some(MemoryAccess::ANY),
                );
            },
        )
    }

    /// Move `dst` from `TransferDst` into `PresentSrc`.
    ///
    /// Presentation is ordered by a semaphore, so no destination access is
    /// made visible.
    pub fn directly_into_present<'i>(
        _src: &'i TrackedImage,
        dst: &'i TrackedImage,
    ) -> AfterOperationHook<'i> {
        Box::new(
            move |command_buffer: &mut CommandBuffer,
                  _src_stage: PipelineStage,
                  _src_access: Option<WriteMemoryAccess>| {
                debug_assert_eq!(dst.current_layout(), ImageLayout::TransferDst);
                dst.set_target_layout(ImageLayout::PresentSrc);
                command_buffer.establish_image_memory_barrier(
                    dst,
                    PipelineStage::TRANSFER,
                    PipelineStage::BOTTOM_OF_PIPE,
                    Some(MemoryAccess::TRANSFER_WRITE),
                    None,
                );
            },
        )
    }
}
