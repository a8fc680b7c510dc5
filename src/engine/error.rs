//! ### English
//! Error taxonomy shared by the pool, the frame mapper and every execution domain.
//!
//! ### 中文
//! surface 池、帧映射层以及所有执行域共用的错误分类。

use super::pool::SurfaceId;

/// Convenience result type used across the crate.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// ### English
/// Per-frame failure kinds. None of them is fatal to the pipeline as a whole: the caller drops
/// the current frame and keeps going.
///
/// ### 中文
/// 按帧划分的失败类型。它们都不会终止整个管线：调用方丢弃当前帧后继续运行。
#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    /// A texture, staging resource or marker could not be created.
    #[error("allocation failure: {0}")]
    Allocation(String),

    /// A staging copy or a blocking map call failed.
    #[error("mapping failure: {0}")]
    Mapping(String),

    /// A completion marker could not be issued or polled.
    #[error("marker failure: {0}")]
    Marker(String),

    /// The converter could not write the frame.
    #[error("conversion failure: {0}")]
    Conversion(String),

    /// Invalid pool parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The handle does not name the surface awaiting release.
    #[error("{0} is not the surface awaiting release")]
    StaleHandle(SurfaceId),

    /// The pool was already torn down.
    #[error("surface pool has been destroyed")]
    Destroyed,
}

impl SurfaceError {
    /// Build a [`SurfaceError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`SurfaceError::Mapping`] value.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    /// Build a [`SurfaceError::Marker`] value.
    pub fn marker(msg: impl Into<String>) -> Self {
        Self::Marker(msg.into())
    }

    /// Build a [`SurfaceError::Conversion`] value.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Build a [`SurfaceError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
