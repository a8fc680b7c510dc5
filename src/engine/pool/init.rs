//! ### English
//! Initialization for `SurfacePool`.
//!
//! ### 中文
//! `SurfacePool` 的初始化逻辑。

use dpi::PhysicalSize;

use crate::engine::domain::{ConsumerDomain, ProducerDomain};
use crate::engine::error::{SurfaceError, SurfaceResult};

use super::{MAX_QUEUE_LEN, PoolStats, STAGING_EXTENT, SurfacePool};

/// ### English
/// Initialization parameters for `SurfacePool`.
///
/// ### 中文
/// `SurfacePool` 的初始化参数。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfacePoolInit {
    /// ### English
    /// Size of every pooled surface (must be non-zero).
    ///
    /// ### 中文
    /// 每个池化 surface 的尺寸（必须非 0）。
    pub size: PhysicalSize<u32>,
    /// ### English
    /// Growth cap, `1..=MAX_QUEUE_LEN`.
    ///
    /// ### 中文
    /// 增长上限，取值 `1..=MAX_QUEUE_LEN`。
    pub capacity: usize,
}

impl SurfacePoolInit {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            capacity: MAX_QUEUE_LEN,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// ### English
/// Region copied by a forced wait: `STAGING_EXTENT` square, or the whole surface if smaller.
///
/// ### 中文
/// 强制等待所拷贝的区域：`STAGING_EXTENT` 见方，若 surface 更小则取整个 surface。
pub(super) fn staging_extent(size: PhysicalSize<u32>) -> PhysicalSize<u32> {
    PhysicalSize::new(
        size.width.min(STAGING_EXTENT),
        size.height.min(STAGING_EXTENT),
    )
}

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Creates an empty pool. Surfaces are created lazily by `acquire()`.
    ///
    /// #### Parameters
    /// - `producer`: Domain A (textures, markers).
    /// - `consumer`: Domain B (shared textures written by the converter).
    /// - `init`: Size and capacity.
    ///
    /// ### 中文
    /// 创建一个空池。surface 由 `acquire()` 按需创建。
    ///
    /// #### 参数
    /// - `producer`：域 A（纹理、标记）。
    /// - `consumer`：域 B（由 converter 写入的共享纹理）。
    /// - `init`：尺寸与容量。
    pub fn new(producer: P, consumer: C, init: SurfacePoolInit) -> SurfaceResult<Self> {
        let SurfacePoolInit { size, capacity } = init;

        if size.width == 0 || size.height == 0 {
            return Err(SurfaceError::config(format!(
                "surface size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }
        if capacity == 0 || capacity > MAX_QUEUE_LEN {
            return Err(SurfaceError::config(format!(
                "capacity must be within 1..={MAX_QUEUE_LEN}, got {capacity}"
            )));
        }

        Ok(Self {
            producer,
            consumer,
            size,
            staging_size: staging_extent(size),
            capacity,
            queue: Vec::with_capacity(capacity),
            cursor: 0,
            next_surface_id: 1,
            stats: PoolStats::default(),
            destroyed: false,
        })
    }
}
