//! # RedLilium GPU Sync
//!
//! Synchronization of individual GPU operations with the work around them.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`SyncRequest`] - Per-operation synchronization state: barrier hooks,
//!   command buffer provisioning and the final submission
//! - [`SyncStrategy`] - How a request synchronizes (semaphore, barriers,
//!   wait-idle, by return, into an existing command buffer)
//! - [`operations`] - Operations that follow the request protocol
//! - Two backends: Vulkan (via ash) and Dummy (records events, for testing)
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_gpu_sync::{SyncContext, SyncRequest, operations, presets};
//!
//! let context = SyncContext::new(device.command_pool(), device.queue(0));
//! let sync = SyncRequest::with_semaphore(&context, |semaphore| frame.wait_on(semaphore))
//!     .before_operation(presets::image_copy::wait_for_previous_operations(&src, &dst))
//!     .after_operation(presets::image_copy::directly_into_present(&src, &dst));
//! operations::copy_image(&src, &dst, sync)?;
//! ```

pub mod backend;
pub mod error;
pub mod image;
pub mod operations;
pub mod sync;
pub mod types;

// Re-export main types for convenience
pub use backend::{CommandBuffer, CommandPool, DummyDevice, ImageHandle, Queue, Semaphore};
pub use error::SyncError;
pub use image::TrackedImage;
pub use sync::{HookTransfer, SyncContext, SyncRequest, SyncStrategy, presets};
pub use types::{
    CommandBufferRequest, Extent3d, ImageAspect, ImageLayout, MemoryAccess, PipelineStage,
    ReadMemoryAccess, WriteMemoryAccess,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the synchronization subsystem.
pub fn init() {
    log::info!("RedLilium GPU Sync v{} initialized", VERSION);
}
