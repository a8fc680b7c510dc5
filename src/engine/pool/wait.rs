//! ### English
//! Forced blocking waits, used only when polling cannot prove a surface idle.
//!
//! Instead of waiting on a fence, a tiny region of the surface is copied into a staging resource
//! and the staging resource is mapped for reading. The map blocks until every earlier command in
//! that domain has retired, and because commands retire in issue order, that includes every write
//! into the surface. A large copy would buy nothing, so only `STAGING_EXTENT` pixels square are
//! copied.
//!
//! ### 中文
//! 强制阻塞等待，仅在轮询无法证明 surface 空闲时使用。
//!
//! 不等待 fence，而是把 surface 的一小块区域拷贝到 staging 资源，再以读方式 map 它。
//! map 会阻塞到该域中所有更早的命令完成；由于命令按提交顺序完成，这也包括对该 surface
//! 的所有写入。大拷贝没有任何收益，因此只拷贝 `STAGING_EXTENT` 见方的像素。

use dpi::PhysicalSize;
use tracing::error;

use crate::engine::domain::{ConsumerDomain, ExecutionDomain, ProducerDomain};
use crate::engine::error::{SurfaceError, SurfaceResult};

use super::{SurfaceHandle, SurfacePool, SurfaceState};

/// ### English
/// Copies `region` of `texture` into `staging`, then maps and unmaps `staging`.
///
/// ### 中文
/// 将 `texture` 的 `region` 区域拷贝到 `staging`，然后 map 并 unmap `staging`。
fn force_idle<D: ExecutionDomain>(
    domain: &D,
    texture: &D::Texture,
    staging: &D::Staging,
    region: PhysicalSize<u32>,
) -> SurfaceResult<()> {
    domain.copy_to_staging(texture, staging, region)?;
    domain.map_staging(staging)
}

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Blocks until the producer domain has retired all work touching the surface at `index`.
    ///
    /// Only called in the queue-underflow case (pool at capacity, cursor surface still busy).
    ///
    /// ### 中文
    /// 阻塞直到生产者域完成所有涉及 `index` 处 surface 的工作。
    ///
    /// 仅在 queue underflow（池已满且游标处 surface 仍忙碌）时调用。
    pub(super) fn wait_on_producer_domain(&mut self, index: usize) -> SurfaceResult<()> {
        let surface = &mut self.queue[index];
        if let Err(err) = force_idle(
            &self.producer,
            &surface.producer_texture,
            &surface.producer_staging,
            self.staging_size,
        ) {
            error!(surface = %surface.id, %err, "couldn't wait for producer domain");
            return Err(err);
        }

        surface.state = SurfaceState::Idle;
        Ok(())
    }

    /// ### English
    /// Blocks until the converter's write into `handle` has landed in the consumer domain.
    ///
    /// Call after `Converter::convert` and before the presentation side reads the surface.
    ///
    /// ### 中文
    /// 阻塞直到 converter 对 `handle` 的写入在消费者域中完成。
    ///
    /// 在 `Converter::convert` 之后、展示侧读取该 surface 之前调用。
    pub fn wait_on_consumer_domain(&mut self, handle: &SurfaceHandle) -> SurfaceResult<()> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }
        let Some(index) = self.position(handle) else {
            return Err(SurfaceError::StaleHandle(handle.id));
        };

        let surface = &self.queue[index];
        if let Err(err) = force_idle(
            &self.consumer,
            &surface.consumer_texture,
            &surface.consumer_staging,
            self.staging_size,
        ) {
            error!(surface = %surface.id, %err, "couldn't wait for consumer domain");
            return Err(err);
        }
        Ok(())
    }
}
