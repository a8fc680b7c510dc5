//! ### English
//! GL texture + framebuffer pair backing one pooled surface or staging resource.
//!
//! ### 中文
//! 支撑一个池化 surface 或 staging 资源的 GL 纹理 + framebuffer 组合。

use std::rc::Rc;

use dpi::PhysicalSize;
use gleam::gl::{self, Gl};

/// ### English
/// A color texture and the FBO used to blit from it or read it back.
///
/// Textures opened through a share handle do not own the texture name; only the FBO (which is
/// per-context and never shared) is deleted for them.
///
/// ### 中文
/// 一个颜色纹理，以及用于从中 blit 或读回的 FBO。
///
/// 通过共享句柄打开的纹理不拥有纹理名；对它们只删除 FBO（FBO 属于各自上下文，不会共享）。
pub struct GlTexture {
    /// ### English
    /// Framebuffer object ID (local to the creating context).
    ///
    /// ### 中文
    /// framebuffer 对象 ID（仅属于创建它的上下文）。
    framebuffer_id: gl::GLuint,
    /// ### English
    /// Color texture name, shared across contexts of the same share group.
    ///
    /// ### 中文
    /// 颜色纹理名，在同一共享组的上下文间共享。
    texture_id: gl::GLuint,
    size: PhysicalSize<u32>,
    owns_texture: bool,
}

impl GlTexture {
    /// ### English
    /// Allocates an RGBA8 texture of `size` and wraps it in a new FBO.
    ///
    /// #### Parameters
    /// - `gl`: GL API used to create resources.
    /// - `size`: Texture size.
    ///
    /// ### 中文
    /// 分配尺寸为 `size` 的 RGBA8 纹理，并用新的 FBO 包装。
    ///
    /// #### 参数
    /// - `gl`：用于创建资源的 GL API。
    /// - `size`：纹理尺寸。
    pub(super) fn new(gl: &Rc<dyn Gl>, size: PhysicalSize<u32>) -> Self {
        let texture_ids = gl.gen_textures(1);
        gl.bind_texture(gl::TEXTURE_2D, texture_ids[0]);
        gl.tex_image_2d(
            gl::TEXTURE_2D,
            0,
            gl::RGBA8 as gl::GLint,
            size.width as gl::GLsizei,
            size.height as gl::GLsizei,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            None,
        );
        gl.tex_parameter_i(
            gl::TEXTURE_2D,
            gl::TEXTURE_MAG_FILTER,
            gl::LINEAR as gl::GLint,
        );
        gl.tex_parameter_i(
            gl::TEXTURE_2D,
            gl::TEXTURE_MIN_FILTER,
            gl::LINEAR as gl::GLint,
        );
        gl.bind_texture(gl::TEXTURE_2D, 0);

        Self {
            framebuffer_id: attach_framebuffer(gl, texture_ids[0]),
            texture_id: texture_ids[0],
            size,
            owns_texture: true,
        }
    }

    /// ### English
    /// Wraps a texture name created by another context of the same share group.
    ///
    /// ### 中文
    /// 包装由同一共享组中另一个上下文创建的纹理名。
    pub(super) fn wrap(gl: &Rc<dyn Gl>, texture_id: gl::GLuint, size: PhysicalSize<u32>) -> Self {
        Self {
            framebuffer_id: attach_framebuffer(gl, texture_id),
            texture_id,
            size,
            owns_texture: false,
        }
    }

    pub fn texture_id(&self) -> gl::GLuint {
        self.texture_id
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// ### English
    /// Copies the top-left `region` of this texture into `dst` (nearest filtering, no scaling).
    ///
    /// ### 中文
    /// 将本纹理左上角 `region` 区域拷贝到 `dst`（最近邻过滤，无缩放）。
    pub(super) fn blit_to(&self, gl: &Rc<dyn Gl>, dst: &GlTexture, region: PhysicalSize<u32>) {
        let width = region.width as gl::GLint;
        let height = region.height as gl::GLint;
        gl.bind_framebuffer(gl::READ_FRAMEBUFFER, self.framebuffer_id);
        gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, dst.framebuffer_id);
        gl.blit_framebuffer(
            0,
            0,
            width,
            height,
            0,
            0,
            width,
            height,
            gl::COLOR_BUFFER_BIT,
            gl::NEAREST,
        );
        gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
    }

    /// ### English
    /// Reads the whole texture back to the CPU. Blocks until prior GL work writing it has
    /// completed.
    ///
    /// ### 中文
    /// 将整张纹理读回 CPU。会阻塞到之前写入它的 GL 工作完成。
    pub(super) fn read_back(&self, gl: &Rc<dyn Gl>) -> Vec<u8> {
        gl.bind_framebuffer(gl::FRAMEBUFFER, self.framebuffer_id);
        let pixels = gl.read_pixels(
            0,
            0,
            self.size.width as gl::GLsizei,
            self.size.height as gl::GLsizei,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
        );
        gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
        pixels
    }

    pub(super) fn upload(&self, gl: &Rc<dyn Gl>, data: &[u8]) {
        gl.bind_texture(gl::TEXTURE_2D, self.texture_id);
        gl.tex_sub_image_2d(
            gl::TEXTURE_2D,
            0,
            0,
            0,
            self.size.width as gl::GLsizei,
            self.size.height as gl::GLsizei,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            data,
        );
        gl.bind_texture(gl::TEXTURE_2D, 0);
    }

    /// ### English
    /// Deletes the GL resources owned by this texture.
    ///
    /// ### 中文
    /// 删除该纹理持有的 GL 资源。
    pub(super) fn delete(self, gl: &Rc<dyn Gl>) {
        gl.delete_framebuffers(&[self.framebuffer_id]);
        if self.owns_texture {
            gl.delete_textures(&[self.texture_id]);
        }
    }
}

fn attach_framebuffer(gl: &Rc<dyn Gl>, texture_id: gl::GLuint) -> gl::GLuint {
    let framebuffer_ids = gl.gen_framebuffers(1);
    gl.bind_framebuffer(gl::FRAMEBUFFER, framebuffer_ids[0]);
    gl.framebuffer_texture_2d(
        gl::FRAMEBUFFER,
        gl::COLOR_ATTACHMENT0,
        gl::TEXTURE_2D,
        texture_id,
        0,
    );
    gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
    framebuffer_ids[0]
}
