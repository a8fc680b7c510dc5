//! ### English
//! Frame-mapping layer: drives one pool and one converter per video stream.
//!
//! Every frame goes `map()` (acquire, convert, wait for the write to land) and later `unmap()`
//! (release). A failed `map()` drops that frame only; the pipeline keeps running and the
//! presentation side keeps whatever it displayed before.
//!
//! ### 中文
//! 帧映射层：每个视频流驱动一个池与一个 converter。
//!
//! 每帧依次经过 `map()`（获取、转换、等待写入完成）与之后的 `unmap()`（释放）。
//! `map()` 失败只会丢弃该帧；管线继续运行，展示侧保留此前显示的内容。

use tracing::warn;

use super::domain::{ConsumerDomain, Converter, ProducerDomain};
use super::error::{SurfaceError, SurfaceResult};
use super::pool::{SurfaceHandle, SurfacePool};

/// ### English
/// Owns a `SurfacePool` and the converter that writes into it.
///
/// ### 中文
/// 持有一个 `SurfacePool` 以及向其写入的 converter。
pub struct FrameMapper<P: ProducerDomain, C: ConsumerDomain, V: Converter<C>> {
    pool: SurfacePool<P, C>,
    converter: V,
    /// ### English
    /// Surface currently mapped for presentation, if any.
    ///
    /// ### 中文
    /// 当前已映射、供展示使用的 surface（若有）。
    mapped: Option<SurfaceHandle>,
    dropped_frames: u64,
}

impl<P: ProducerDomain, C: ConsumerDomain, V: Converter<C>> FrameMapper<P, C, V> {
    pub fn new(pool: SurfacePool<P, C>, converter: V) -> Self {
        Self {
            pool,
            converter,
            mapped: None,
            dropped_frames: 0,
        }
    }

    /// ### English
    /// Converts `frame` into a pooled surface and returns its handle.
    ///
    /// A surface still mapped from the previous frame is released first.
    ///
    /// #### Parameters
    /// - `frame`: Source frame handed to the converter.
    ///
    /// ### 中文
    /// 将 `frame` 转换到一个池化 surface 中并返回其句柄。
    ///
    /// 若上一帧的 surface 仍处于映射状态，会先将其释放。
    ///
    /// #### 参数
    /// - `frame`：交给 converter 的源帧。
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn map(&mut self, frame: &V::Frame) -> SurfaceResult<SurfaceHandle> {
        self.unmap();

        match self.convert_into_pool(frame) {
            Ok(handle) => {
                self.mapped = Some(handle);
                Ok(handle)
            }
            Err(err) => {
                self.dropped_frames += 1;
                warn!(%err, dropped = self.dropped_frames, "dropping frame");
                Err(err)
            }
        }
    }

    fn convert_into_pool(&mut self, frame: &V::Frame) -> SurfaceResult<SurfaceHandle> {
        let handle = self.pool.acquire()?;
        let target = self
            .pool
            .consumer_texture(&handle)
            .ok_or(SurfaceError::StaleHandle(handle.id()))?;
        self.converter.convert(self.pool.consumer(), frame, target)?;
        self.pool.wait_on_consumer_domain(&handle)?;
        Ok(handle)
    }

    /// ### English
    /// Releases the mapped surface (no-op if nothing is mapped).
    ///
    /// ### 中文
    /// 释放已映射的 surface（若没有映射则不做任何事）。
    pub fn unmap(&mut self) {
        let Some(handle) = self.mapped.take() else {
            return;
        };
        if let Err(err) = self.pool.release(handle) {
            warn!(surface = %handle.id(), %err, "unmap ignored");
        }
    }

    pub fn mapped(&self) -> Option<SurfaceHandle> {
        self.mapped
    }

    /// ### English
    /// Domain-A texture of the mapped surface (what the presentation side samples).
    ///
    /// ### 中文
    /// 已映射 surface 的域 A 纹理（展示侧采样的对象）。
    pub fn presented_texture(&self) -> Option<&P::Texture> {
        self.mapped
            .as_ref()
            .and_then(|handle| self.pool.producer_texture(handle))
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn pool(&self) -> &SurfacePool<P, C> {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut SurfacePool<P, C> {
        &mut self.pool
    }

    pub fn converter_mut(&mut self) -> &mut V {
        &mut self.converter
    }

    /// ### English
    /// Tears down the pool without waiting for in-flight surfaces.
    ///
    /// ### 中文
    /// 销毁池，不等待在途 surface。
    pub fn destroy(&mut self) {
        self.mapped = None;
        self.pool.destroy();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/mapper/mapper.rs"]
mod tests;
