//! Backend-agnostic value types used to describe barriers and command buffers.

use bitflags::bitflags;

// ============================================================================
// Pipeline stages
// ============================================================================

bitflags! {
    /// Pipeline stages a barrier waits on or unblocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u32 {
        /// Start of the pipeline, before any command is processed.
        const TOP_OF_PIPE = 1 << 0;
        /// Indirect draw/dispatch parameter consumption.
        const DRAW_INDIRECT = 1 << 1;
        /// Vertex and index buffer consumption.
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const TESSELLATION_CONTROL_SHADER = 1 << 4;
        const TESSELLATION_EVALUATION_SHADER = 1 << 5;
        const GEOMETRY_SHADER = 1 << 6;
        const FRAGMENT_SHADER = 1 << 7;
        /// Depth/stencil tests before fragment shading.
        const EARLY_FRAGMENT_TESTS = 1 << 8;
        /// Depth/stencil tests after fragment shading.
        const LATE_FRAGMENT_TESTS = 1 << 9;
        /// Final color values are written.
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
        const COMPUTE_SHADER = 1 << 11;
        /// Copy, blit, resolve and clear commands.
        const TRANSFER = 1 << 12;
        /// End of the pipeline, after all commands completed.
        const BOTTOM_OF_PIPE = 1 << 13;
        /// Host reads and writes of device memory.
        const HOST = 1 << 14;
        /// Every graphics stage.
        const ALL_GRAPHICS = 1 << 15;
        /// Every stage of every command.
        const ALL_COMMANDS = 1 << 16;
    }
}

// ============================================================================
// Memory access
// ============================================================================

bitflags! {
    /// Kinds of memory access made available (source) or visible (destination)
    /// by a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryAccess: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const INPUT_ATTACHMENT_READ = 1 << 4;
        const SHADER_READ = 1 << 5;
        const SHADER_WRITE = 1 << 6;
        const COLOR_ATTACHMENT_READ = 1 << 7;
        const COLOR_ATTACHMENT_WRITE = 1 << 8;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 9;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 10;
        const TRANSFER_READ = 1 << 11;
        const TRANSFER_WRITE = 1 << 12;
        const HOST_READ = 1 << 13;
        const HOST_WRITE = 1 << 14;
        /// Any read access.
        const MEMORY_READ = 1 << 15;
        /// Any write access.
        const MEMORY_WRITE = 1 << 16;
    }
}

impl MemoryAccess {
    /// Any read access.
    pub const ANY_READ: Self = Self::MEMORY_READ;
    /// Any write access.
    pub const ANY_WRITE: Self = Self::MEMORY_WRITE;
    /// Any access at all.
    pub const ANY: Self = Self::MEMORY_READ.union(Self::MEMORY_WRITE);

    /// Every flag that denotes a read.
    pub const READS: Self = Self::INDIRECT_COMMAND_READ
        .union(Self::INDEX_READ)
        .union(Self::VERTEX_ATTRIBUTE_READ)
        .union(Self::UNIFORM_READ)
        .union(Self::INPUT_ATTACHMENT_READ)
        .union(Self::SHADER_READ)
        .union(Self::COLOR_ATTACHMENT_READ)
        .union(Self::DEPTH_STENCIL_ATTACHMENT_READ)
        .union(Self::TRANSFER_READ)
        .union(Self::HOST_READ)
        .union(Self::MEMORY_READ);

    /// Every flag that denotes a write.
    pub const WRITES: Self = Self::SHADER_WRITE
        .union(Self::COLOR_ATTACHMENT_WRITE)
        .union(Self::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .union(Self::TRANSFER_WRITE)
        .union(Self::HOST_WRITE)
        .union(Self::MEMORY_WRITE);
}

/// Memory access restricted to read flags.
///
/// Used as the destination access of a barrier established before an
/// operation: the operation's reads must see prior writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadMemoryAccess(MemoryAccess);

impl ReadMemoryAccess {
    /// Any read access.
    pub const ANY: Self = Self(MemoryAccess::ANY_READ);
    pub const TRANSFER: Self = Self(MemoryAccess::TRANSFER_READ);
    pub const SHADER: Self = Self(MemoryAccess::SHADER_READ);
    pub const UNIFORM: Self = Self(MemoryAccess::UNIFORM_READ);
    pub const COLOR_ATTACHMENT: Self = Self(MemoryAccess::COLOR_ATTACHMENT_READ);
    pub const DEPTH_STENCIL_ATTACHMENT: Self = Self(MemoryAccess::DEPTH_STENCIL_ATTACHMENT_READ);
    pub const HOST: Self = Self(MemoryAccess::HOST_READ);

    /// Wrap `access` if it is non-empty and contains read flags only.
    pub fn new(access: MemoryAccess) -> Option<Self> {
        (!access.is_empty() && MemoryAccess::READS.contains(access)).then_some(Self(access))
    }

    /// The wrapped access flags.
    pub fn access(self) -> MemoryAccess {
        self.0
    }
}

impl std::ops::BitOr for ReadMemoryAccess {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<ReadMemoryAccess> for MemoryAccess {
    fn from(access: ReadMemoryAccess) -> Self {
        access.0
    }
}

/// Memory access restricted to write flags.
///
/// Used as the source access of a barrier established after an operation:
/// the operation's writes are made available to what follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteMemoryAccess(MemoryAccess);

impl WriteMemoryAccess {
    /// Any write access.
    pub const ANY: Self = Self(MemoryAccess::ANY_WRITE);
    pub const TRANSFER: Self = Self(MemoryAccess::TRANSFER_WRITE);
    pub const SHADER: Self = Self(MemoryAccess::SHADER_WRITE);
    pub const COLOR_ATTACHMENT: Self = Self(MemoryAccess::COLOR_ATTACHMENT_WRITE);
    pub const DEPTH_STENCIL_ATTACHMENT: Self =
        Self(MemoryAccess::DEPTH_STENCIL_ATTACHMENT_WRITE);
    pub const HOST: Self = Self(MemoryAccess::HOST_WRITE);

    /// Wrap `access` if it is non-empty and contains write flags only.
    pub fn new(access: MemoryAccess) -> Option<Self> {
        (!access.is_empty() && MemoryAccess::WRITES.contains(access)).then_some(Self(access))
    }

    /// The wrapped access flags.
    pub fn access(self) -> MemoryAccess {
        self.0
    }
}

impl std::ops::BitOr for WriteMemoryAccess {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<WriteMemoryAccess> for MemoryAccess {
    fn from(access: WriteMemoryAccess) -> Self {
        access.0
    }
}

// ============================================================================
// Command buffers
// ============================================================================

/// How a newly allocated command buffer is going to be used.
///
/// Affects only how the buffer begins recording and how the pool may recycle
/// it; synchronization behaves identically for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandBufferRequest {
    /// The buffer may be submitted more than once.
    Reusable,
    /// The buffer is submitted exactly once.
    #[default]
    SingleUse,
}

// ============================================================================
// Images
// ============================================================================

/// Image layout states relevant to barrier-driven layout transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents undefined. Can transition to any layout.
    #[default]
    Undefined,
    /// Least optimal but most flexible.
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    /// Source of a copy.
    TransferSrc,
    /// Destination of a copy.
    TransferDst,
    /// Ready for presentation to a swapchain.
    PresentSrc,
}

bitflags! {
    /// Which aspects of an image a barrier or copy covers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// 3D extent (width, height, depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Create a 2D extent (depth = 1).
    pub const fn new_2d(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }
}
