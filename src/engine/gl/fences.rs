//! ### English
//! GL fence management for completion markers.
//!
//! ### 中文
//! 完成标记的 GL fence 管理。

use glow::HasContext as _;

use crate::engine::domain::MarkerStatus;
use crate::engine::error::{SurfaceError, SurfaceResult};

use super::GlDomain;

/// ### English
/// Completion marker backed by a `GLsync` stored as a `u64` handle (0 = no fence).
///
/// ### 中文
/// 以 `GLsync`（存为 `u64` 句柄，0 表示无 fence）实现的完成标记。
#[derive(Debug, Default)]
pub struct GlMarker {
    fence: u64,
}

/// ### English
/// Maps a `glClientWaitSync` result to a marker status.
///
/// ### 中文
/// 将 `glClientWaitSync` 的返回值映射为标记状态。
pub(super) fn fence_status(status: u32) -> SurfaceResult<MarkerStatus> {
    match status {
        glow::ALREADY_SIGNALED | glow::CONDITION_SATISFIED => Ok(MarkerStatus::Ready),
        glow::TIMEOUT_EXPIRED => Ok(MarkerStatus::NotReady),
        other => Err(SurfaceError::marker(format!(
            "glClientWaitSync returned {other:#x}"
        ))),
    }
}

impl GlDomain {
    /// ### English
    /// Deletes one `GLsync` represented as a `u64` handle.
    ///
    /// #### Parameters
    /// - `fence_value`: Fence handle (`GLsync` cast to `u64`).
    ///
    /// ### 中文
    /// 删除一个以 `u64` 句柄表示的 `GLsync`。
    ///
    /// #### 参数
    /// - `fence_value`：fence 句柄（`GLsync` 转为 `u64`）。
    #[inline]
    fn delete_sync_unsafe(&self, fence_value: u64) {
        let sync = glow::NativeFence(fence_value as usize as *mut _);
        unsafe {
            self.glow.delete_sync(sync);
        }
    }

    pub(super) fn delete_fence_if_any(&self, marker: &mut GlMarker) {
        let fence_value = std::mem::take(&mut marker.fence);
        if fence_value != 0 {
            self.delete_sync_unsafe(fence_value);
        }
    }

    /// ### English
    /// Replaces the marker's fence with a new one after all commands issued so far, then flushes
    /// so the fence can signal without anyone waiting on it.
    ///
    /// ### 中文
    /// 用一个位于目前所有已提交命令之后的新 fence 替换标记原有的 fence，然后 flush，
    /// 使该 fence 无需等待者也能 signal。
    pub(super) fn insert_fence(&self, marker: &mut GlMarker) -> SurfaceResult<()> {
        self.delete_fence_if_any(marker);
        let sync = unsafe { self.glow.fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0) }
            .map_err(SurfaceError::marker)?;
        marker.fence = sync.0 as usize as u64;
        self.gl.flush();
        Ok(())
    }

    /// ### English
    /// Polls the marker's fence with a zero timeout. Signaled fences are deleted right away.
    ///
    /// ### 中文
    /// 以零超时轮询标记的 fence。已 signal 的 fence 会立即删除。
    pub(super) fn poll_fence(&self, marker: &mut GlMarker) -> SurfaceResult<MarkerStatus> {
        if marker.fence == 0 {
            return Ok(MarkerStatus::Ready);
        }

        let sync = glow::NativeFence(marker.fence as usize as *mut _);
        let status = fence_status(unsafe { self.glow.client_wait_sync(sync, 0, 0) })?;
        if status == MarkerStatus::Ready {
            self.delete_fence_if_any(marker);
        }
        Ok(status)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/gl/fences.rs"]
mod tests;
