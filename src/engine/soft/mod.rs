//! ### English
//! CPU-emulated execution domains.
//!
//! Each `SoftDomain` owns a worker thread that executes its command stream strictly in issue
//! order, optionally delaying every command through a jitter hook. Textures are shared pixel
//! buffers; domains created from the same `SoftDevice` can open each other's textures through
//! share handles. This gives the pool a real asynchronous pair of domains without a GPU, which is
//! what the headless pipeline and the synchronization tests run on.
//!
//! ### 中文
//! 由 CPU 模拟的执行域。
//!
//! 每个 `SoftDomain` 持有一个工作线程，严格按提交顺序执行其命令流，并可通过 jitter 钩子
//! 为每条命令增加延迟。纹理是共享的像素缓冲；由同一个 `SoftDevice` 创建的域可以通过共享
//! 句柄打开彼此的纹理。这样无需 GPU 也能为池提供一对真正异步的执行域，无头管线与同步测试
//! 都运行在其之上。

mod convert;
mod timeline;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::Receiver;
use dpi::PhysicalSize;

use crate::engine::domain::{
    ConsumerDomain, ExecutionDomain, MarkerStatus, ProducerDomain, ShareHandle,
};
use crate::engine::error::{SurfaceError, SurfaceResult};

pub use convert::IdentityConverter;
pub use timeline::JitterFn;

use timeline::Timeline;

/// ### English
/// Pixel layout of every soft texture (packed 8-bit BGRX/RGBA).
///
/// ### 中文
/// 所有软件纹理的像素布局（紧密排列的 8 位 BGRX/RGBA）。
pub const BYTES_PER_PIXEL: usize = 4;

type Pixels = Arc<Mutex<Vec<u8>>>;

fn lock(pixels: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    pixels.lock().unwrap_or_else(PoisonError::into_inner)
}

fn byte_len(size: PhysicalSize<u32>) -> usize {
    size.width as usize * size.height as usize * BYTES_PER_PIXEL
}

/// ### English
/// Texture (or staging resource) living in a soft domain.
///
/// Cloning shares the pixel storage; in-flight commands hold such clones, which is how a
/// destroyed texture stays alive until the work referencing it has run.
///
/// ### 中文
/// 位于软件域中的纹理（或 staging 资源）。
///
/// clone 会共享像素存储；在途命令持有这样的 clone，因此被销毁的纹理会保活到引用它的
/// 工作执行完毕。
#[derive(Clone)]
pub struct SoftTexture {
    id: u64,
    size: PhysicalSize<u32>,
    pixels: Pixels,
}

impl SoftTexture {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }
}

/// ### English
/// Completion marker: the sequence number of the signal command last recorded (0 = never).
///
/// ### 中文
/// 完成标记：最近记录的 signal 命令序号（0 表示从未记录）。
#[derive(Debug)]
pub struct SoftMarker {
    target: u64,
}

impl SoftMarker {
    pub fn target(&self) -> u64 {
        self.target
    }
}

/// ### English
/// Resource creation/destruction counters of one soft domain.
///
/// ### 中文
/// 单个软件域的资源创建/销毁计数。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub created: u64,
    pub destroyed: u64,
}

impl ResourceCounts {
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.destroyed)
    }
}

#[derive(Default)]
struct DeviceShared {
    /// ### English
    /// Share handle -> pixel storage exported by a producer domain.
    ///
    /// ### 中文
    /// 共享句柄 -> 生产者域导出的像素存储。
    registry: Mutex<HashMap<u64, Pixels>>,
    next_id: AtomicU64,
}

/// ### English
/// Factory for soft domains that can share textures with each other.
///
/// ### 中文
/// 可相互共享纹理的软件域工厂。
#[derive(Clone, Default)]
pub struct SoftDevice {
    shared: Arc<DeviceShared>,
}

impl SoftDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_domain(&self, label: &str) -> SurfaceResult<SoftDomain> {
        self.spawn_domain(label, None)
    }

    /// ### English
    /// Creates a domain whose worker sleeps `jitter()` before every command.
    ///
    /// ### 中文
    /// 创建一个工作线程在每条命令前休眠 `jitter()` 的域。
    pub fn create_domain_with_jitter(
        &self,
        label: &str,
        jitter: Arc<JitterFn>,
    ) -> SurfaceResult<SoftDomain> {
        self.spawn_domain(label, Some(jitter))
    }

    fn spawn_domain(&self, label: &str, jitter: Option<Arc<JitterFn>>) -> SurfaceResult<SoftDomain> {
        let timeline = Timeline::spawn(label, jitter)?;
        Ok(SoftDomain {
            inner: Arc::new(DomainInner {
                label: label.to_string(),
                timeline,
                device: self.shared.clone(),
                created: AtomicU64::new(0),
                destroyed: AtomicU64::new(0),
            }),
        })
    }
}

struct DomainInner {
    label: String,
    timeline: Timeline,
    device: Arc<DeviceShared>,
    created: AtomicU64,
    destroyed: AtomicU64,
}

/// ### English
/// One asynchronous execution domain. Cheap to clone; the worker exits once the last clone is
/// dropped and its queue has drained.
///
/// ### 中文
/// 一个异步执行域。clone 开销很低；最后一个 clone 被 drop 且队列排空后工作线程退出。
#[derive(Clone)]
pub struct SoftDomain {
    inner: Arc<DomainInner>,
}

impl SoftDomain {
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn counters(&self) -> ResourceCounts {
        ResourceCounts {
            created: self.inner.created.load(Ordering::Relaxed),
            destroyed: self.inner.destroyed.load(Ordering::Relaxed),
        }
    }

    /// ### English
    /// Enqueues a full overwrite of `texture` with `data`.
    ///
    /// ### 中文
    /// 入队一次以 `data` 完整覆盖 `texture` 的写入。
    pub fn write_pixels(&self, texture: &SoftTexture, data: Vec<u8>) -> SurfaceResult<()> {
        let expected = byte_len(texture.size);
        if data.len() != expected {
            return Err(SurfaceError::conversion(format!(
                "expected {expected} bytes for {}x{}, got {}",
                texture.size.width,
                texture.size.height,
                data.len()
            )));
        }

        let pixels = texture.pixels.clone();
        self.inner.timeline.submit(move || {
            lock(&pixels).copy_from_slice(&data);
        })
    }

    /// ### English
    /// Enqueues a read of the whole texture; the contents arrive on the returned receiver once
    /// the command has executed.
    ///
    /// ### 中文
    /// 入队一次整张纹理的读取；命令执行后，内容会通过返回的接收端送达。
    pub fn read_pixels(&self, texture: &SoftTexture) -> SurfaceResult<Receiver<Vec<u8>>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let pixels = texture.pixels.clone();
        self.inner.timeline.submit(move || {
            let _ = tx.send(lock(&pixels).clone());
        })?;
        Ok(rx)
    }

    fn new_texture(&self, size: PhysicalSize<u32>) -> SoftTexture {
        self.inner.created.fetch_add(1, Ordering::Relaxed);
        SoftTexture {
            id: self.next_id(),
            size,
            pixels: Arc::new(Mutex::new(vec![0; byte_len(size)])),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.device.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn track_destroy(&self) {
        self.inner.destroyed.fetch_add(1, Ordering::Relaxed);
    }
}

fn copy_region(src: &SoftTexture, dst: &SoftTexture, region: PhysicalSize<u32>) {
    let row = region.width as usize * BYTES_PER_PIXEL;
    let src_stride = src.size.width as usize * BYTES_PER_PIXEL;
    let dst_stride = dst.size.width as usize * BYTES_PER_PIXEL;

    let source = lock(&src.pixels);
    let mut target = lock(&dst.pixels);
    for y in 0..region.height as usize {
        let from = y * src_stride;
        let to = y * dst_stride;
        target[to..to + row].copy_from_slice(&source[from..from + row]);
    }
}

impl ExecutionDomain for SoftDomain {
    type Texture = SoftTexture;
    type Staging = SoftTexture;

    fn create_staging(&self, size: PhysicalSize<u32>) -> SurfaceResult<SoftTexture> {
        Ok(self.new_texture(size))
    }

    fn copy_to_staging(
        &self,
        texture: &SoftTexture,
        staging: &SoftTexture,
        region: PhysicalSize<u32>,
    ) -> SurfaceResult<()> {
        let fits = |size: PhysicalSize<u32>| region.width <= size.width && region.height <= size.height;
        if !fits(texture.size) || !fits(staging.size) {
            return Err(SurfaceError::mapping(format!(
                "copy region {}x{} exceeds source or staging",
                region.width, region.height
            )));
        }
        // The worker holds the source lock while taking the destination lock.
        if Arc::ptr_eq(&texture.pixels, &staging.pixels) {
            return Err(SurfaceError::mapping(format!(
                "texture {} and staging {} share pixel storage",
                texture.id, staging.id
            )));
        }

        let src = texture.clone();
        let dst = staging.clone();
        self.inner
            .timeline
            .submit(move || copy_region(&src, &dst, region))
    }

    fn map_staging(&self, staging: &SoftTexture) -> SurfaceResult<()> {
        self.inner.timeline.finish()?;
        let _mapped = lock(&staging.pixels);
        Ok(())
    }

    fn destroy_texture(&self, texture: SoftTexture) -> SurfaceResult<()> {
        lock_registry(&self.inner.device).remove(&texture.id);
        self.track_destroy();
        Ok(())
    }

    fn destroy_staging(&self, _staging: SoftTexture) -> SurfaceResult<()> {
        self.track_destroy();
        Ok(())
    }
}

fn lock_registry(device: &DeviceShared) -> MutexGuard<'_, HashMap<u64, Pixels>> {
    device
        .registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

impl ProducerDomain for SoftDomain {
    type Marker = SoftMarker;

    fn create_texture(&self, size: PhysicalSize<u32>) -> SurfaceResult<SoftTexture> {
        Ok(self.new_texture(size))
    }

    fn share_handle(&self, texture: &SoftTexture) -> SurfaceResult<ShareHandle> {
        lock_registry(&self.inner.device).insert(texture.id, texture.pixels.clone());
        Ok(ShareHandle(texture.id))
    }

    fn create_marker(&self) -> SurfaceResult<SoftMarker> {
        self.inner.created.fetch_add(1, Ordering::Relaxed);
        Ok(SoftMarker { target: 0 })
    }

    fn issue_marker(&self, marker: &mut SoftMarker) -> SurfaceResult<()> {
        marker.target = self.inner.timeline.signal()?;
        Ok(())
    }

    fn poll_marker(&self, marker: &mut SoftMarker) -> SurfaceResult<MarkerStatus> {
        if self.inner.timeline.retired() >= marker.target {
            Ok(MarkerStatus::Ready)
        } else {
            Ok(MarkerStatus::NotReady)
        }
    }

    fn destroy_marker(&self, _marker: SoftMarker) -> SurfaceResult<()> {
        self.track_destroy();
        Ok(())
    }
}

impl ConsumerDomain for SoftDomain {
    fn open_shared(
        &self,
        handle: ShareHandle,
        size: PhysicalSize<u32>,
    ) -> SurfaceResult<SoftTexture> {
        let Some(pixels) = lock_registry(&self.inner.device).get(&handle.0).cloned() else {
            return Err(SurfaceError::allocation(format!(
                "unknown share handle {}",
                handle.0
            )));
        };
        if lock(&pixels).len() != byte_len(size) {
            return Err(SurfaceError::allocation(format!(
                "share handle {} does not match {}x{}",
                handle.0, size.width, size.height
            )));
        }

        self.inner.created.fetch_add(1, Ordering::Relaxed);
        Ok(SoftTexture {
            id: self.next_id(),
            size,
            pixels,
        })
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/soft/soft.rs"]
mod tests;
