//! ### English
//! OpenGL execution domain.
//!
//! Both sides of the pool can be GL contexts from one share group: the producer context owns
//! the textures and records `GLsync` fences, the consumer context opens the same texture names
//! through its own framebuffers. Activation of the right context is the embedder's job; it is
//! handed in as a callback and cached per thread so that back-to-back calls on the same context
//! do not re-activate it.
//!
//! ### 中文
//! OpenGL 执行域。
//!
//! 池的两侧可以是同一共享组内的两个 GL 上下文：生产者上下文持有纹理并记录 `GLsync` fence，
//! 消费者上下文通过自己的 framebuffer 打开相同的纹理名。激活正确的上下文由嵌入方负责；
//! 以回调形式传入，并按线程缓存，使同一上下文上的连续调用不会重复激活。

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dpi::PhysicalSize;
use gleam::gl::{self, Gl};

use super::domain::{ConsumerDomain, ExecutionDomain, MarkerStatus, ProducerDomain, ShareHandle};
use super::error::{SurfaceError, SurfaceResult};

mod convert;
mod fences;
mod texture;

pub use convert::GlUploadConverter;
pub use fences::GlMarker;
pub use texture::GlTexture;

/// ### English
/// Per-thread "current GL domain" cache to avoid redundant activation calls.
///
/// ### 中文
/// 每线程缓存“当前 GL 域”，避免重复激活调用。
thread_local! {
    static CURRENT_GL_DOMAIN: Cell<usize> = const { Cell::new(0) };
}

static NEXT_CONTEXT_KEY: AtomicUsize = AtomicUsize::new(1);

/// ### English
/// Runs `activate` unless `context_key` is already current on this thread.
///
/// A domain without a hook leaves its context to the caller, so the cache no longer knows what
/// is current and is cleared. The next hooked domain then activates its context again.
///
/// ### 中文
/// 除非 `context_key` 已是当前线程上的 current 上下文，否则执行 `activate`。
///
/// 没有钩子的域把上下文交给调用方管理，缓存因此无法得知当前上下文，会被清空；
/// 之后带钩子的域会重新激活自己的上下文。
fn activate_cached(context_key: usize, activate: Option<&dyn Fn()>) {
    CURRENT_GL_DOMAIN.with(|current| {
        let Some(activate) = activate else {
            current.set(0);
            return;
        };
        if current.get() == context_key {
            return;
        }

        activate();
        current.set(context_key);
    });
}

/// ### English
/// One GL context acting as an execution domain.
///
/// ### 中文
/// 作为执行域的一个 GL 上下文。
pub struct GlDomain {
    /// ### English
    /// gleam GL API (resource management, blits, readback).
    ///
    /// ### 中文
    /// gleam GL API（资源管理、blit、读回）。
    gl: Rc<dyn Gl>,
    /// ### English
    /// glow GL API (fence operations).
    ///
    /// ### 中文
    /// glow GL API（fence 相关操作）。
    glow: Arc<glow::Context>,
    activate: Option<Rc<dyn Fn()>>,
    context_key: usize,
}

impl GlDomain {
    /// ### English
    /// Wraps a context that the caller keeps current on the calling thread.
    ///
    /// #### Parameters
    /// - `gl`: gleam GL API loaded for this context.
    /// - `glow`: glow GL API loaded for this context.
    ///
    /// ### 中文
    /// 包装一个由调用方在当前线程上保持 current 的上下文。
    ///
    /// #### 参数
    /// - `gl`：为该上下文加载的 gleam GL API。
    /// - `glow`：为该上下文加载的 glow GL API。
    pub fn new(gl: Rc<dyn Gl>, glow: Arc<glow::Context>) -> Self {
        Self {
            gl,
            glow,
            activate: None,
            context_key: NEXT_CONTEXT_KEY.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// ### English
    /// Installs the callback that makes this context current. It runs before every domain
    /// operation unless this domain is already the current one on the calling thread.
    ///
    /// ### 中文
    /// 设置使该上下文变为 current 的回调。除非该域已是调用线程上的当前域，
    /// 否则每次域操作之前都会执行它。
    pub fn with_activation(mut self, activate: impl Fn() + 'static) -> Self {
        self.activate = Some(Rc::new(activate));
        self
    }

    pub fn gl(&self) -> &Rc<dyn Gl> {
        &self.gl
    }

    fn make_current(&self) {
        activate_cached(self.context_key, self.activate.as_deref());
    }

    /// ### English
    /// Drains the GL error flag, returning the first pending error code if any.
    ///
    /// ### 中文
    /// 读取 GL 错误标志，若有待处理错误则返回其错误码。
    fn take_error(&self) -> Option<gl::GLenum> {
        let code = self.gl.get_error();
        (code != gl::NO_ERROR).then_some(code)
    }

    fn allocate(&self, size: PhysicalSize<u32>, what: &str) -> SurfaceResult<GlTexture> {
        self.make_current();
        let texture = GlTexture::new(&self.gl, size);
        match self.take_error() {
            None => Ok(texture),
            Some(code) => {
                texture.delete(&self.gl);
                Err(SurfaceError::allocation(format!(
                    "{what} {}x{}: GL error {code:#x}",
                    size.width, size.height
                )))
            }
        }
    }

    /// ### English
    /// Uploads tightly packed RGBA8 pixels covering all of `texture`.
    ///
    /// ### 中文
    /// 上传覆盖整张 `texture` 的紧密排列 RGBA8 像素。
    pub fn upload(&self, texture: &GlTexture, data: &[u8]) -> SurfaceResult<()> {
        let size = texture.size();
        let expected = size.width as usize * size.height as usize * 4;
        if data.len() != expected {
            return Err(SurfaceError::conversion(format!(
                "frame is {} bytes, texture {}x{} needs {expected}",
                data.len(),
                size.width,
                size.height
            )));
        }

        self.make_current();
        texture.upload(&self.gl, data);
        match self.take_error() {
            None => Ok(()),
            Some(code) => Err(SurfaceError::conversion(format!(
                "glTexSubImage2D: GL error {code:#x}"
            ))),
        }
    }
}

impl ExecutionDomain for GlDomain {
    type Texture = GlTexture;
    type Staging = GlTexture;

    fn create_staging(&self, size: PhysicalSize<u32>) -> SurfaceResult<GlTexture> {
        self.allocate(size, "staging texture")
    }

    fn copy_to_staging(
        &self,
        texture: &GlTexture,
        staging: &GlTexture,
        region: PhysicalSize<u32>,
    ) -> SurfaceResult<()> {
        self.make_current();
        texture.blit_to(&self.gl, staging, region);
        match self.take_error() {
            None => Ok(()),
            Some(code) => Err(SurfaceError::mapping(format!(
                "glBlitFramebuffer: GL error {code:#x}"
            ))),
        }
    }

    fn map_staging(&self, staging: &GlTexture) -> SurfaceResult<()> {
        self.make_current();
        let _ = staging.read_back(&self.gl);
        match self.take_error() {
            None => Ok(()),
            Some(code) => Err(SurfaceError::mapping(format!(
                "glReadPixels: GL error {code:#x}"
            ))),
        }
    }

    fn destroy_texture(&self, texture: GlTexture) -> SurfaceResult<()> {
        self.make_current();
        texture.delete(&self.gl);
        Ok(())
    }

    fn destroy_staging(&self, staging: GlTexture) -> SurfaceResult<()> {
        self.destroy_texture(staging)
    }
}

impl ProducerDomain for GlDomain {
    type Marker = GlMarker;

    fn create_texture(&self, size: PhysicalSize<u32>) -> SurfaceResult<GlTexture> {
        self.allocate(size, "shared texture")
    }

    fn share_handle(&self, texture: &GlTexture) -> SurfaceResult<ShareHandle> {
        Ok(ShareHandle(u64::from(texture.texture_id())))
    }

    fn create_marker(&self) -> SurfaceResult<GlMarker> {
        Ok(GlMarker::default())
    }

    fn issue_marker(&self, marker: &mut GlMarker) -> SurfaceResult<()> {
        self.make_current();
        self.insert_fence(marker)
    }

    fn poll_marker(&self, marker: &mut GlMarker) -> SurfaceResult<MarkerStatus> {
        self.make_current();
        self.poll_fence(marker)
    }

    fn destroy_marker(&self, mut marker: GlMarker) -> SurfaceResult<()> {
        self.make_current();
        self.delete_fence_if_any(&mut marker);
        Ok(())
    }
}

impl ConsumerDomain for GlDomain {
    fn open_shared(
        &self,
        handle: ShareHandle,
        size: PhysicalSize<u32>,
    ) -> SurfaceResult<GlTexture> {
        let texture_id = gl::GLuint::try_from(handle.0).map_err(|_| {
            SurfaceError::allocation(format!("share handle {:#x} is not a GL name", handle.0))
        })?;

        self.make_current();
        let texture = GlTexture::wrap(&self.gl, texture_id, size);
        match self.take_error() {
            None => Ok(texture),
            Some(code) => {
                texture.delete(&self.gl);
                Err(SurfaceError::allocation(format!(
                    "open shared texture {texture_id}: GL error {code:#x}"
                )))
            }
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/gl/activation.rs"]
mod tests;
