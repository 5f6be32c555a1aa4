//! Images with tracked layouts.
//!
//! Barrier presets capture images by shared reference and transition them
//! from their current layout to a requested target layout. The layout state
//! therefore lives in [`Cell`]s: a [`TrackedImage`] belongs to a single
//! recording thread, just like the synchronization request that uses it.

use std::cell::Cell;

use crate::backend::ImageHandle;
use crate::types::{Extent3d, ImageAspect, ImageLayout};

/// An image whose layout is tracked across barriers.
#[derive(Debug)]
pub struct TrackedImage {
    handle: ImageHandle,
    aspect: ImageAspect,
    extent: Extent3d,
    current_layout: Cell<ImageLayout>,
    target_layout: Cell<ImageLayout>,
}

impl TrackedImage {
    /// Track an existing image that is currently in `layout`.
    pub fn new(
        handle: ImageHandle,
        aspect: ImageAspect,
        extent: Extent3d,
        layout: ImageLayout,
    ) -> Self {
        Self {
            handle,
            aspect,
            extent,
            current_layout: Cell::new(layout),
            target_layout: Cell::new(layout),
        }
    }

    /// Native image handle.
    pub fn handle(&self) -> &ImageHandle {
        &self.handle
    }

    pub fn aspect(&self) -> ImageAspect {
        self.aspect
    }

    pub fn extent(&self) -> Extent3d {
        self.extent
    }

    /// Layout the image is in as of the last recorded barrier.
    pub fn current_layout(&self) -> ImageLayout {
        self.current_layout.get()
    }

    /// Layout the next image barrier will transition to.
    pub fn target_layout(&self) -> ImageLayout {
        self.target_layout.get()
    }

    /// Request a layout for the next image barrier.
    pub fn set_target_layout(&self, layout: ImageLayout) {
        self.target_layout.set(layout);
    }

    /// Commit the pending transition, returning `(old, new)` layouts.
    pub(crate) fn commit_transition(&self) -> (ImageLayout, ImageLayout) {
        let old = self.current_layout.get();
        let new = self.target_layout.get();
        self.current_layout.set(new);
        (old, new)
    }
}
