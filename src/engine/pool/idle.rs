//! ### English
//! Non-blocking idle detection for pooled surfaces.
//!
//! ### 中文
//! 池化 surface 的非阻塞空闲检测。

use tracing::debug;

use crate::engine::domain::{ConsumerDomain, MarkerStatus, ProducerDomain};

use super::{SurfacePool, SurfaceState};

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Returns whether the surface at `index` may be handed to the converter.
    ///
    /// Only a released surface needs a poll; its marker is polled exactly once per call. Pending
    /// and failed polls both report "not idle" and are retried on the next `acquire()`.
    ///
    /// ### 中文
    /// 返回 `index` 处的 surface 是否可以交给 converter。
    ///
    /// 只有已 release 的 surface 需要轮询，且每次调用只轮询一次标记。
    /// 未完成与轮询失败都视为“非空闲”，留待下一次 `acquire()` 重试。
    pub(super) fn is_idle(&mut self, index: usize) -> bool {
        let surface = &mut self.queue[index];
        if surface.state != SurfaceState::ConsumerInFlight {
            return true;
        }
        if !surface.marker_armed {
            return false;
        }

        match self.producer.poll_marker(&mut surface.marker) {
            Ok(MarkerStatus::Ready) => {
                surface.state = SurfaceState::Idle;
                true
            }
            Ok(MarkerStatus::NotReady) => false,
            Err(err) => {
                self.stats.marker_failures += 1;
                debug!(surface = %surface.id, %err, "marker poll failed, treating surface as busy");
                false
            }
        }
    }
}
