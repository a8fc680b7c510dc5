//! ### English
//! One pooled surface: the dual-handle record shared between the two execution domains.
//!
//! ### 中文
//! 一个池化 surface：在两个执行域之间共享的双句柄记录。

use std::fmt;

use dpi::PhysicalSize;
use tracing::warn;

use crate::engine::domain::{ConsumerDomain, ProducerDomain};
use crate::engine::error::{SurfaceError, SurfaceResult};

/// ### English
/// Stable identifier of a pooled surface, assigned in creation order starting at 1.
///
/// ### 中文
/// 池化 surface 的稳定标识，按创建顺序从 1 开始分配。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) u32);

impl SurfaceId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// ### English
/// Handle returned by `acquire()`. It names a surface but grants no access to its resources;
/// textures are borrowed through the pool.
///
/// ### 中文
/// `acquire()` 返回的句柄。它只标识 surface，不直接暴露资源；纹理需通过池借用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    pub(super) id: SurfaceId,
}

impl SurfaceHandle {
    pub fn id(&self) -> SurfaceId {
        self.id
    }
}

/// ### English
/// Per-surface lifecycle: `Idle -> WriteInFlight -> ConsumerInFlight -> Idle`.
///
/// ### 中文
/// 每个 surface 的生命周期：`Idle -> WriteInFlight -> ConsumerInFlight -> Idle`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceState {
    /// ### English
    /// Proven idle in both domains.
    ///
    /// ### 中文
    /// 已确认在两个域中均空闲。
    Idle,
    /// ### English
    /// Handed to the converter by `acquire()`, not yet released.
    ///
    /// ### 中文
    /// 已由 `acquire()` 交给 converter，尚未 release。
    WriteInFlight,
    /// ### English
    /// Released; a completion marker guards the presentation-side reads.
    ///
    /// ### 中文
    /// 已 release；完成标记守护着展示侧的读取。
    ConsumerInFlight,
}

pub(super) struct QueueSurface<P: ProducerDomain, C: ConsumerDomain> {
    pub(super) id: SurfaceId,
    pub(super) producer_texture: P::Texture,
    pub(super) producer_staging: P::Staging,
    pub(super) marker: P::Marker,
    /// ### English
    /// Whether the last `issue_marker` succeeded. An unarmed busy surface is only cleared by a
    /// forced wait.
    ///
    /// ### 中文
    /// 最近一次 `issue_marker` 是否成功。未就绪标记的忙碌 surface 只能通过强制等待清除。
    pub(super) marker_armed: bool,
    pub(super) consumer_texture: C::Texture,
    pub(super) consumer_staging: C::Staging,
    pub(super) state: SurfaceState,
    /// ### English
    /// Number of markers issued against this surface (monotonic).
    ///
    /// ### 中文
    /// 针对该 surface 发出的标记数量（单调递增）。
    pub(super) epoch: u64,
}

impl<P: ProducerDomain, C: ConsumerDomain> QueueSurface<P, C> {
    /// ### English
    /// Creates every resource of a surface. On failure, whatever was already created is destroyed
    /// before the error is returned.
    ///
    /// #### Parameters
    /// - `producer` / `consumer`: The two execution domains.
    /// - `id`: Identifier assigned to the new surface.
    /// - `size`: Full texture size.
    /// - `staging_size`: Staging size (already clamped to `STAGING_EXTENT`).
    ///
    /// ### 中文
    /// 创建 surface 的全部资源。失败时，先销毁已经创建的资源，再返回错误。
    ///
    /// #### 参数
    /// - `producer` / `consumer`：两个执行域。
    /// - `id`：分配给新 surface 的标识。
    /// - `size`：全尺寸纹理大小。
    /// - `staging_size`：staging 尺寸（已裁剪到 `STAGING_EXTENT`）。
    pub(super) fn create(
        producer: &P,
        consumer: &C,
        id: SurfaceId,
        size: PhysicalSize<u32>,
        staging_size: PhysicalSize<u32>,
    ) -> SurfaceResult<Self> {
        let mut parts = PartialSurface::<P, C>::empty();
        if let Err(err) = parts.fill(producer, consumer, size, staging_size) {
            parts.discard(producer, consumer, id);
            return Err(err);
        }

        let PartialSurface {
            producer_texture: Some(producer_texture),
            producer_staging: Some(producer_staging),
            marker: Some(marker),
            consumer_texture: Some(consumer_texture),
            consumer_staging: Some(consumer_staging),
        } = parts
        else {
            return Err(SurfaceError::allocation(format!("{id} was left incomplete")));
        };

        Ok(Self {
            id,
            producer_texture,
            producer_staging,
            marker,
            marker_armed: false,
            consumer_texture,
            consumer_staging,
            state: SurfaceState::Idle,
            epoch: 0,
        })
    }

    pub(super) fn is_busy(&self) -> bool {
        self.state == SurfaceState::ConsumerInFlight
    }

    /// ### English
    /// Destroys every resource of this surface exactly once, regardless of state.
    ///
    /// Failures are logged and swallowed; context teardown reclaims the rest.
    ///
    /// ### 中文
    /// 无论当前状态如何，恰好销毁该 surface 的每个资源一次。
    ///
    /// 失败只记录日志不上报；上下文销毁时会回收剩余资源。
    pub(super) fn destroy(self, producer: &P, consumer: &C) {
        let id = self.id;
        log_destroy(id, "consumer staging", consumer.destroy_staging(self.consumer_staging));
        log_destroy(id, "consumer texture", consumer.destroy_texture(self.consumer_texture));
        log_destroy(id, "marker", producer.destroy_marker(self.marker));
        log_destroy(id, "producer staging", producer.destroy_staging(self.producer_staging));
        log_destroy(id, "producer texture", producer.destroy_texture(self.producer_texture));
    }
}

struct PartialSurface<P: ProducerDomain, C: ConsumerDomain> {
    producer_texture: Option<P::Texture>,
    producer_staging: Option<P::Staging>,
    marker: Option<P::Marker>,
    consumer_texture: Option<C::Texture>,
    consumer_staging: Option<C::Staging>,
}

impl<P: ProducerDomain, C: ConsumerDomain> PartialSurface<P, C> {
    fn empty() -> Self {
        Self {
            producer_texture: None,
            producer_staging: None,
            marker: None,
            consumer_texture: None,
            consumer_staging: None,
        }
    }

    fn fill(
        &mut self,
        producer: &P,
        consumer: &C,
        size: PhysicalSize<u32>,
        staging_size: PhysicalSize<u32>,
    ) -> SurfaceResult<()> {
        let producer_texture = self.producer_texture.insert(producer.create_texture(size)?);
        let share = producer.share_handle(producer_texture)?;
        self.producer_staging = Some(producer.create_staging(staging_size)?);
        self.marker = Some(producer.create_marker()?);
        self.consumer_texture = Some(consumer.open_shared(share, size)?);
        self.consumer_staging = Some(consumer.create_staging(staging_size)?);
        Ok(())
    }

    fn discard(self, producer: &P, consumer: &C, id: SurfaceId) {
        if let Some(staging) = self.consumer_staging {
            log_destroy(id, "consumer staging", consumer.destroy_staging(staging));
        }
        if let Some(texture) = self.consumer_texture {
            log_destroy(id, "consumer texture", consumer.destroy_texture(texture));
        }
        if let Some(marker) = self.marker {
            log_destroy(id, "marker", producer.destroy_marker(marker));
        }
        if let Some(staging) = self.producer_staging {
            log_destroy(id, "producer staging", producer.destroy_staging(staging));
        }
        if let Some(texture) = self.producer_texture {
            log_destroy(id, "producer texture", producer.destroy_texture(texture));
        }
    }
}

fn log_destroy(id: SurfaceId, what: &str, result: SurfaceResult<()>) {
    if let Err(err) = result {
        warn!(surface = %id, %err, "failed to release {what}");
    }
}
