//! Deferred destruction of submitted command buffers and semaphores.
//!
//! Submission is asynchronous: a command buffer handed to the queue, or a
//! semaphore that a pending submission waits on or signals, may still be in
//! use by the GPU when its owner drops it. The native handle is parked here,
//! tagged with the frame it was dropped in, and released once that frame is
//! `MAX_FRAMES_IN_FLIGHT` frames old.
//!
//! ```text
//! frame:    N          N+1        N+2        N+3
//! drop  ->  park(N)
//! advance_frame()  ............................  release parked(N)
//! ```
//!
//! Releasing frees command buffers back to their pool, so the owner calls
//! [`DeferredDestructor::advance_frame`] with the pool lock held. Parking
//! never takes that lock.

use std::collections::VecDeque;

use ash::vk;
use parking_lot::Mutex;

/// Number of frame boundaries a parked handle survives.
pub const MAX_FRAMES_IN_FLIGHT: u64 = 3;

/// A native handle waiting to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredResource {
    Semaphore(vk::Semaphore),
    /// Freed back to the pool it was allocated from.
    CommandBuffer {
        pool: vk::CommandPool,
        buffer: vk::CommandBuffer,
    },
}

impl DeferredResource {
    /// # Safety
    ///
    /// The GPU must no longer use the handle and `device` must own it.
    unsafe fn release(self, device: &ash::Device) {
        match self {
            Self::Semaphore(semaphore) => unsafe { device.destroy_semaphore(semaphore, None) },
            Self::CommandBuffer { pool, buffer } => unsafe {
                device.free_command_buffers(pool, &[buffer])
            },
        }
    }
}

#[derive(Debug, Default)]
struct Parked {
    frame: u64,
    /// Oldest first.
    resources: VecDeque<(u64, DeferredResource)>,
}

/// Frame-tagged queue of handles waiting to be released.
#[derive(Debug, Default)]
pub struct DeferredDestructor {
    parked: Mutex<Parked>,
}

impl DeferredDestructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `resource` in the current frame.
    pub fn park(&self, resource: DeferredResource) {
        let mut parked = self.parked.lock();
        let frame = parked.frame;
        parked.resources.push_back((frame, resource));
    }

    /// Start the next frame and release everything parked
    /// `MAX_FRAMES_IN_FLIGHT` frames ago or earlier.
    ///
    /// # Safety
    ///
    /// The GPU must have finished all work submitted that many frames ago,
    /// `device` must be the device the parked handles belong to, and the
    /// caller must hold exclusive access to the pools they came from.
    pub unsafe fn advance_frame(&self, device: &ash::Device) {
        let expired = self.next_frame();
        if !expired.is_empty() {
            log::trace!("Releasing {} deferred Vulkan handles", expired.len());
        }
        for resource in expired {
            unsafe { resource.release(device) };
        }
    }

    /// Release everything regardless of age.
    ///
    /// # Safety
    ///
    /// The device must be idle.
    pub unsafe fn flush_all(&self, device: &ash::Device) {
        let all: Vec<_> = self.parked.lock().resources.drain(..).collect();
        for (_, resource) in all {
            unsafe { resource.release(device) };
        }
    }

    pub fn pending_count(&self) -> usize {
        self.parked.lock().resources.len()
    }

    pub fn current_frame(&self) -> u64 {
        self.parked.lock().frame
    }

    fn next_frame(&self) -> Vec<DeferredResource> {
        let mut parked = self.parked.lock();
        parked.frame += 1;
        let frame = parked.frame;

        let mut expired = Vec::new();
        while let Some(&(parked_in, resource)) = parked.resources.front()
            && parked_in + MAX_FRAMES_IN_FLIGHT <= frame
        {
            parked.resources.pop_front();
            expired.push(resource);
        }
        expired
    }
}
