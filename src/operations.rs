//! GPU operations driven through a [`SyncRequest`].

use crate::backend::CommandBuffer;
use crate::error::SyncError;
use crate::image::TrackedImage;
use crate::sync::SyncRequest;
use crate::types::{PipelineStage, ReadMemoryAccess, WriteMemoryAccess};

/// Copy the whole of `src` into `dst`.
///
/// The copy is recorded in the images' current layouts, so `sync` should
/// carry hooks that move them into transfer layouts first, such as
/// [`presets::image_copy`](crate::sync::presets::image_copy). Returns the
/// command buffer if `sync` synchronizes by return.
pub fn copy_image(
    src: &TrackedImage,
    dst: &TrackedImage,
    mut sync: SyncRequest<'_>,
) -> Result<Option<CommandBuffer>, SyncError> {
    log::trace!(
        "Copying image {} into image {} ({})",
        src.handle().raw(),
        dst.handle().raw(),
        sync.classify()
    );

    sync.establish_barrier_before_the_operation(
        PipelineStage::TRANSFER,
        Some(ReadMemoryAccess::TRANSFER),
    )?;
    sync.get_or_create_command_buffer()?.copy_image(src, dst);
    sync.establish_barrier_after_the_operation(
        PipelineStage::TRANSFER,
        Some(WriteMemoryAccess::TRANSFER),
    )?;

    sync.submit_and_sync()
}
