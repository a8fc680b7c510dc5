/// ### English
/// `interop_surface_queue` crate root.
/// Core implementation lives under `engine`; the most used types are re-exported here.
///
/// ### 中文
/// `interop_surface_queue` 的 crate 根。
/// 核心实现位于 `engine` 模块；常用类型在此重新导出。
pub mod engine;

pub use engine::domain::{
    ConsumerDomain, Converter, ExecutionDomain, MarkerStatus, ProducerDomain, ShareHandle,
};
pub use engine::error::{SurfaceError, SurfaceResult};
pub use engine::mapper::FrameMapper;
pub use engine::pool::{
    MAX_QUEUE_LEN, PoolStats, STAGING_EXTENT, SurfaceHandle, SurfaceId, SurfacePool,
    SurfacePoolInit, SurfaceState,
};

#[cfg(test)]
#[path = "../tests/unit/support/fake.rs"]
pub(crate) mod test_support;
