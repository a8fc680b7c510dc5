//! ### English
//! Converter that uploads CPU-side RGBA8 frames into a GL surface.
//!
//! ### 中文
//! 将 CPU 侧 RGBA8 帧上传到 GL surface 的 converter。

use crate::engine::domain::Converter;
use crate::engine::error::SurfaceResult;

use super::{GlDomain, GlTexture};

#[derive(Clone, Copy, Debug, Default)]
pub struct GlUploadConverter;

impl Converter<GlDomain> for GlUploadConverter {
    type Frame = [u8];

    fn convert(
        &mut self,
        domain: &GlDomain,
        frame: &[u8],
        target: &GlTexture,
    ) -> SurfaceResult<()> {
        domain.upload(target, frame)
    }
}
