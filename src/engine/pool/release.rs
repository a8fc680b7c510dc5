//! ### English
//! Surface release: arm the completion marker and advance the cursor.
//!
//! ### 中文
//! surface 释放：记录完成标记并推进游标。

use tracing::warn;

use crate::engine::domain::{ConsumerDomain, ProducerDomain};
use crate::engine::error::{SurfaceError, SurfaceResult};

use super::{SurfaceHandle, SurfacePool, SurfaceState};

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Hands the surface at the cursor over to the presentation side.
    ///
    /// A fresh marker is recorded after the work that reads the surface, the surface becomes busy
    /// until that marker is seen retired (or a forced wait clears it), and the cursor moves on.
    /// If the marker cannot be issued the surface still becomes busy; only a forced wait can then
    /// prove it idle.
    ///
    /// #### Parameters
    /// - `handle`: Must be the handle returned by the latest `acquire()`.
    ///
    /// ### 中文
    /// 将游标处的 surface 移交给展示侧。
    ///
    /// 在读取该 surface 的工作之后记录新的标记；在观察到该标记完成（或强制等待清除）之前，
    /// surface 保持忙碌，随后游标前移。若标记发出失败，surface 仍会变为忙碌，此时只能通过
    /// 强制等待证明其空闲。
    ///
    /// #### 参数
    /// - `handle`：必须是最近一次 `acquire()` 返回的句柄。
    pub fn release(&mut self, handle: SurfaceHandle) -> SurfaceResult<()> {
        if self.destroyed {
            return Err(SurfaceError::Destroyed);
        }

        let Some(surface) = self.queue.get_mut(self.cursor) else {
            return Err(SurfaceError::StaleHandle(handle.id));
        };
        if surface.id != handle.id || surface.state != SurfaceState::WriteInFlight {
            return Err(SurfaceError::StaleHandle(handle.id));
        }

        match self.producer.issue_marker(&mut surface.marker) {
            Ok(()) => {
                surface.marker_armed = true;
                self.stats.markers_issued += 1;
            }
            Err(err) => {
                surface.marker_armed = false;
                self.stats.marker_failures += 1;
                warn!(surface = %surface.id, %err, "failed to issue completion marker");
            }
        }
        surface.epoch += 1;
        surface.state = SurfaceState::ConsumerInFlight;

        self.cursor = (self.cursor + 1) % self.queue.len();
        Ok(())
    }
}
