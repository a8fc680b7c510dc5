//! ### English
//! Contract between the surface pool and the two execution domains it bridges.
//!
//! Domain A (`ProducerDomain`) owns the full-size textures, issues completion markers and is
//! polled by the pool. Domain B (`ConsumerDomain`) opens the same textures through a share handle
//! and is where the converter writes. Neither side exposes a fence the other can wait on; the
//! pool only ever relies on each domain retiring its own command stream in issue order.
//!
//! ### 中文
//! surface 池与其桥接的两个执行域之间的契约。
//!
//! 域 A（`ProducerDomain`）持有全尺寸纹理、发出完成标记，并由池轮询。
//! 域 B（`ConsumerDomain`）通过共享句柄打开同一纹理，converter 在该域写入。
//! 两侧都不提供可供对方等待的 fence；池只依赖“每个域按提交顺序完成自身命令流”这一约定。

use dpi::PhysicalSize;

use super::error::SurfaceResult;

/// ### English
/// Result of a non-blocking marker poll.
///
/// ### 中文
/// 非阻塞标记轮询的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerStatus {
    /// All work issued before the marker has retired.
    Ready,
    /// The marker is still pending.
    NotReady,
}

/// ### English
/// Opaque cross-domain share handle exported by domain A and opened by domain B.
///
/// ### 中文
/// 由域 A 导出、由域 B 打开的不透明跨域共享句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShareHandle(pub u64);

/// ### English
/// Operations every execution domain provides: resources plus the staging copy and synchronous
/// map used to manufacture an idle guarantee without a fence.
///
/// ### 中文
/// 每个执行域都提供的操作：资源管理，以及在没有 fence 时用于制造“空闲保证”的
/// staging 拷贝与同步 map。
pub trait ExecutionDomain {
    /// ### English
    /// Full-size texture handle in this domain.
    ///
    /// ### 中文
    /// 该域中的全尺寸纹理句柄。
    type Texture;
    /// ### English
    /// Small CPU-readable staging resource in this domain.
    ///
    /// ### 中文
    /// 该域中可供 CPU 读取的小型 staging 资源。
    type Staging;

    /// ### English
    /// Creates a staging resource of `size` (already clamped by the caller).
    ///
    /// ### 中文
    /// 创建尺寸为 `size` 的 staging 资源（调用方已完成裁剪）。
    fn create_staging(&self, size: PhysicalSize<u32>) -> SurfaceResult<Self::Staging>;

    /// ### English
    /// Enqueues a copy of the top-left `region` of `texture` into `staging`.
    ///
    /// ### 中文
    /// 将 `texture` 左上角 `region` 区域的拷贝命令加入队列，目标为 `staging`。
    fn copy_to_staging(
        &self,
        texture: &Self::Texture,
        staging: &Self::Staging,
        region: PhysicalSize<u32>,
    ) -> SurfaceResult<()>;

    /// ### English
    /// Maps `staging` for CPU read and unmaps it again.
    ///
    /// Must block until every command issued earlier in this domain has retired.
    ///
    /// ### 中文
    /// 以 CPU 读方式 map `staging` 并立即 unmap。
    ///
    /// 必须阻塞直到该域中之前提交的所有命令都已完成。
    fn map_staging(&self, staging: &Self::Staging) -> SurfaceResult<()>;

    /// ### English
    /// Destroys `texture`. Work already queued against it must still complete safely.
    ///
    /// ### 中文
    /// 销毁 `texture`。已入队、引用它的工作仍须能安全完成。
    fn destroy_texture(&self, texture: Self::Texture) -> SurfaceResult<()>;

    /// ### English
    /// Destroys a staging resource created by `create_staging`.
    ///
    /// ### 中文
    /// 销毁由 `create_staging` 创建的 staging 资源。
    fn destroy_staging(&self, staging: Self::Staging) -> SurfaceResult<()>;
}

/// ### English
/// Domain A: owns the textures and the completion markers.
///
/// ### 中文
/// 域 A：持有纹理与完成标记。
pub trait ProducerDomain: ExecutionDomain {
    /// ### English
    /// Completion marker recorded into this domain's command stream.
    ///
    /// ### 中文
    /// 记录在该域命令流中的完成标记。
    type Marker;

    /// ### English
    /// Creates a full-size texture that can be exported with `share_handle`.
    ///
    /// ### 中文
    /// 创建可通过 `share_handle` 导出的全尺寸纹理。
    fn create_texture(&self, size: PhysicalSize<u32>) -> SurfaceResult<Self::Texture>;

    /// ### English
    /// Exports `texture` so the other domain can open it.
    ///
    /// ### 中文
    /// 导出 `texture`，使另一个域可以打开它。
    fn share_handle(&self, texture: &Self::Texture) -> SurfaceResult<ShareHandle>;

    /// ### English
    /// Creates a marker that has not been recorded yet; polling it reports `Ready`.
    ///
    /// ### 中文
    /// 创建一个尚未记录的标记；轮询它会返回 `Ready`。
    fn create_marker(&self) -> SurfaceResult<Self::Marker>;

    /// ### English
    /// Records `marker` after all work enqueued so far (replacing any earlier recording).
    ///
    /// ### 中文
    /// 在目前已入队的全部工作之后记录 `marker`（覆盖之前的记录）。
    fn issue_marker(&self, marker: &mut Self::Marker) -> SurfaceResult<()>;

    /// ### English
    /// Polls `marker` without blocking and without flushing.
    ///
    /// ### 中文
    /// 非阻塞、不 flush 地轮询 `marker`。
    fn poll_marker(&self, marker: &mut Self::Marker) -> SurfaceResult<MarkerStatus>;

    /// ### English
    /// Destroys `marker`, whether or not it has retired.
    ///
    /// ### 中文
    /// 销毁 `marker`，无论其是否已完成。
    fn destroy_marker(&self, marker: Self::Marker) -> SurfaceResult<()>;
}

/// ### English
/// Domain B: opens the textures exported by domain A.
///
/// ### 中文
/// 域 B：打开由域 A 导出的纹理。
pub trait ConsumerDomain: ExecutionDomain {
    /// ### English
    /// Opens the texture exported as `handle`. The result aliases the producer's storage;
    /// destroying it releases only this domain's view.
    ///
    /// #### Parameters
    /// - `handle`: Share handle from `ProducerDomain::share_handle`.
    /// - `size`: Expected texture size; a mismatch is an allocation failure.
    ///
    /// ### 中文
    /// 打开以 `handle` 导出的纹理。结果与生产者的存储互为别名；销毁它只释放本域的视图。
    ///
    /// #### 参数
    /// - `handle`：来自 `ProducerDomain::share_handle` 的共享句柄。
    /// - `size`：期望的纹理尺寸；不一致视为分配失败。
    fn open_shared(
        &self,
        handle: ShareHandle,
        size: PhysicalSize<u32>,
    ) -> SurfaceResult<Self::Texture>;
}

/// ### English
/// External capability that writes one source frame into a pooled surface (domain B side).
///
/// ### 中文
/// 将一帧源数据写入池化 surface（域 B 一侧）的外部能力。
pub trait Converter<C: ConsumerDomain> {
    /// ### English
    /// Source frame type accepted by this converter.
    ///
    /// ### 中文
    /// 该 converter 接受的源帧类型。
    type Frame: ?Sized;

    /// ### English
    /// Enqueues the write of `frame` into `target` on `domain`. Completion is not awaited here;
    /// the pool's consumer-side wait does that.
    ///
    /// ### 中文
    /// 在 `domain` 上入队将 `frame` 写入 `target` 的工作。此处不等待完成；
    /// 由池的消费者侧等待负责。
    fn convert(&mut self, domain: &C, frame: &Self::Frame, target: &C::Texture)
    -> SurfaceResult<()>;
}
