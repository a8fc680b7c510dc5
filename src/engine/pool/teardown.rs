use tracing::debug;

use crate::engine::domain::{ConsumerDomain, ProducerDomain};

use super::SurfacePool;

impl<P: ProducerDomain, C: ConsumerDomain> SurfacePool<P, C> {
    /// ### English
    /// Destroys every surface owned by the pool (idempotent).
    ///
    /// Does not wait for busy surfaces: a resource destroyed while in-flight work still references
    /// it is kept alive by the owning domain until that work completes.
    ///
    /// ### 中文
    /// 销毁池持有的所有 surface（幂等）。
    ///
    /// 不会等待忙碌的 surface：在途工作仍引用的资源被销毁时，由所属执行域负责保活到该工作完成。
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }

        let surfaces = self.queue.len();
        let busy = self.queue.iter().filter(|surface| surface.is_busy()).count();
        for surface in self.queue.drain(..) {
            surface.destroy(&self.producer, &self.consumer);
        }
        self.cursor = 0;

        debug!(surfaces, busy, "surface pool destroyed");
    }
}

impl<P: ProducerDomain, C: ConsumerDomain> Drop for SurfacePool<P, C> {
    fn drop(&mut self) {
        self.destroy();
    }
}
