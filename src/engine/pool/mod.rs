//! ### English
//! Growable ring of dual-handle surfaces shared between two execution domains.
//!
//! Following the shared-surface queue pattern, several frames may be in flight on the
//! presentation side at once. The ring grows on demand up to `MAX_QUEUE_LEN`; new surfaces are
//! inserted at the cursor (not appended), which keeps the retirement order of surfaces already in
//! flight and makes the new surface the next candidate. Beyond the cap a forced blocking wait
//! replaces growth.
//!
//! ### 中文
//! 在两个执行域之间共享的、可增长的双句柄 surface 环。
//!
//! 采用共享 surface 队列的做法，展示侧可以同时有多帧在途。环按需增长，上限为
//! `MAX_QUEUE_LEN`；新 surface 插入到游标位置（而非追加到末尾），这样既保留了在途 surface
//! 的完成顺序，也让新 surface 成为下一个候选。达到上限后以强制阻塞等待代替增长。

use dpi::PhysicalSize;

use super::domain::{ConsumerDomain, ProducerDomain};

mod acquire;
mod idle;
mod init;
mod release;
mod surface;
mod teardown;
mod wait;

pub use init::SurfacePoolInit;
pub use surface::{SurfaceHandle, SurfaceId, SurfaceState};

use surface::QueueSurface;

/// ### English
/// Hard upper bound on pool growth.
///
/// ### 中文
/// 池增长的硬上限。
pub const MAX_QUEUE_LEN: usize = 16;

/// ### English
/// Edge length of the region copied during a forced wait (clamped to the surface size).
///
/// ### 中文
/// 强制等待时拷贝区域的边长（会按 surface 尺寸裁剪）。
pub const STAGING_EXTENT: u32 = 16;

/// ### English
/// Counters describing how the pool has been absorbing backpressure.
///
/// ### 中文
/// 描述池如何吸收背压的计数器。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub surfaces_created: u64,
    /// ### English
    /// Acquires at capacity that had to stall on the producer domain ("queue underflow").
    ///
    /// ### 中文
    /// 达到容量上限、必须在生产者域阻塞的 acquire 次数（即 "queue underflow"）。
    pub forced_waits: u64,
    pub markers_issued: u64,
    pub marker_failures: u64,
}

/// ### English
/// Surface pool driven by a single control thread.
///
/// All mutating operations take `&mut self`; there is exactly one mutator, so no locking is
/// involved anywhere in the pool.
///
/// ### 中文
/// 由单个控制线程驱动的 surface 池。
///
/// 所有修改操作都接收 `&mut self`；只有一个修改者，因此池内部不涉及任何锁。
pub struct SurfacePool<P: ProducerDomain, C: ConsumerDomain> {
    /// ### English
    /// Domain A: owns textures and markers.
    ///
    /// ### 中文
    /// 域 A：持有纹理与标记。
    producer: P,
    /// ### English
    /// Domain B: opens shared textures, written by the converter.
    ///
    /// ### 中文
    /// 域 B：打开共享纹理，由 converter 写入。
    consumer: C,
    size: PhysicalSize<u32>,
    staging_size: PhysicalSize<u32>,
    capacity: usize,
    /// ### English
    /// Ring storage in evaluation order.
    ///
    /// ### 中文
    /// 按评估顺序排列的环存储。
    queue: Vec<QueueSurface<P, C>>,
    /// ### English
    /// Index of the next surface to evaluate.
    ///
    /// ### 中文
    /// 下一个待评估 surface 的索引。
    cursor: usize,
    next_surface_id: u32,
    stats: PoolStats,
    /// ### English
    /// Guard flag to make teardown idempotent.
    ///
    /// ### 中文
    /// 防重入标记：保证销毁幂等。
    destroyed: bool,
}

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// ### English
    /// Surface ids in ring order (index 0 first).
    ///
    /// ### 中文
    /// 按环顺序（从索引 0 开始）列出 surface 标识。
    pub fn surface_ids(&self) -> Vec<SurfaceId> {
        self.queue.iter().map(|surface| surface.id).collect()
    }

    pub fn state(&self, handle: &SurfaceHandle) -> Option<SurfaceState> {
        self.find(handle).map(|surface| surface.state)
    }

    /// ### English
    /// Borrows the domain-A texture of `handle` (what the presentation side samples).
    ///
    /// ### 中文
    /// 借用 `handle` 对应的域 A 纹理（展示侧采样的对象）。
    pub fn producer_texture(&self, handle: &SurfaceHandle) -> Option<&P::Texture> {
        self.find(handle).map(|surface| &surface.producer_texture)
    }

    /// ### English
    /// Borrows the domain-B texture of `handle` (what the converter writes).
    ///
    /// ### 中文
    /// 借用 `handle` 对应的域 B 纹理（converter 写入的对象）。
    pub fn consumer_texture(&self, handle: &SurfaceHandle) -> Option<&C::Texture> {
        self.find(handle).map(|surface| &surface.consumer_texture)
    }

    #[cfg(test)]
    pub(crate) fn marker(&self, handle: &SurfaceHandle) -> Option<&P::Marker> {
        self.find(handle).map(|surface| &surface.marker)
    }

    /// ### English
    /// Finds the surface named by `handle`, checking the cursor slot first.
    ///
    /// ### 中文
    /// 查找 `handle` 对应的 surface，优先检查游标所在槽位。
    fn find(&self, handle: &SurfaceHandle) -> Option<&QueueSurface<P, C>> {
        self.position(handle).map(|index| &self.queue[index])
    }

    fn position(&self, handle: &SurfaceHandle) -> Option<usize> {
        if self
            .queue
            .get(self.cursor)
            .is_some_and(|surface| surface.id == handle.id)
        {
            return Some(self.cursor);
        }
        self.queue
            .iter()
            .position(|surface| surface.id == handle.id)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/pool/pool.rs"]
mod tests;
