//! Synchronization error types.

use thiserror::Error;

/// Errors reported by the backend while provisioning, recording or submitting.
///
/// Protocol violations (finalizing a request that declared no synchronization,
/// returning a command buffer that was never provisioned, finalizing twice)
/// are not represented here. They panic, because they mean the caller's
/// declared strategy is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The command pool could not hand out a command buffer.
    #[error("command buffer allocation failed: {0}")]
    CommandBufferAllocation(String),
    /// Beginning or ending command buffer recording failed.
    #[error("command buffer recording failed: {0}")]
    Recording(String),
    /// The queue rejected a submission.
    #[error("queue submission failed: {0}")]
    Submission(String),
    /// A semaphore for signaling completion could not be created.
    #[error("semaphore creation failed: {0}")]
    SemaphoreCreation(String),
    /// Blocking until the queue became idle failed.
    #[error("waiting for queue idle failed: {0}")]
    WaitIdle(String),
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
}
