use crate::engine::domain::Converter;
use crate::engine::error::SurfaceResult;

use super::{SoftDomain, SoftTexture};

/// ### English
/// Converter that copies the source bytes verbatim (frame layout must already match the surface).
///
/// ### 中文
/// 原样拷贝源字节的 converter（帧布局必须已与 surface 一致）。
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityConverter;

impl Converter<SoftDomain> for IdentityConverter {
    type Frame = [u8];

    fn convert(
        &mut self,
        domain: &SoftDomain,
        frame: &[u8],
        target: &SoftTexture,
    ) -> SurfaceResult<()> {
        domain.write_pixels(target, frame.to_vec())
    }
}
