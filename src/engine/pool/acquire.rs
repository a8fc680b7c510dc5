//! ### English
//! Surface acquisition: poll, grow, or stall.
//!
//! ### 中文
//! surface 获取：轮询、增长或阻塞。

use tracing::{debug, error, warn};

use crate::engine::domain::{ConsumerDomain, ProducerDomain};
use crate::engine::error::{SurfaceError, SurfaceResult};

use super::surface::{QueueSurface, SurfaceId};
use super::{SurfaceHandle, SurfacePool, SurfaceState};

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Returns a surface that is proven idle and ready for the converter.
    ///
    /// Strategy:
    /// - Fast path: the surface at the cursor polls idle.
    /// - Growth: below capacity, create a surface and insert it at the cursor.
    /// - Underflow: at capacity, force the cursor surface idle with a blocking wait.
    ///
    /// On error nothing changes; the caller drops the frame.
    ///
    /// ### 中文
    /// 返回一个已确认空闲、可交给 converter 的 surface。
    ///
    /// 策略：
    /// - 快路径：游标处的 surface 轮询为空闲。
    /// - 增长：未达容量时，创建新 surface 并插入到游标位置。
    /// - 下溢：达到容量时，以阻塞等待强制游标处 surface 空闲。
    ///
    /// 出错时池状态不变；调用方丢弃该帧。
    pub fn acquire(&mut self) -> SurfaceResult<SurfaceHandle> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }

        if self.queue.is_empty() || !self.is_idle(self.cursor) {
            if self.queue.len() < self.capacity {
                let surface = self.create_surface()?;
                self.queue.insert(self.cursor, surface);
                self.stats.surfaces_created += 1;
                debug!(len = self.queue.len(), "surface queue grew");
            } else {
                self.wait_on_producer_domain(self.cursor)?;
                self.stats.forced_waits += 1;
                warn!(cursor = self.cursor, "surface queue underflow");
            }
        }

        let surface = &mut self.queue[self.cursor];
        surface.state = SurfaceState::WriteInFlight;
        Ok(SurfaceHandle { id: surface.id })
    }

    fn create_surface(&mut self) -> SurfaceResult<QueueSurface<P, C>> {
        let id = SurfaceId(self.next_surface_id);
        let surface = QueueSurface::create(
            &self.producer,
            &self.consumer,
            id,
            self.size,
            self.staging_size,
        )
        .inspect_err(|err| error!(surface = %id, %err, "failed to create surface"))?;

        self.next_surface_id += 1;
        Ok(surface)
    }
}
