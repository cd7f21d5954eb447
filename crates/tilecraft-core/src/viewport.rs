//! 视口组件

use crate::math::Float2;

/// 视口（地图和瓦片集各自持有一个）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// 左上角偏移
    pub offset: Float2,
    /// 可视区域尺寸
    pub size: Float2,
    pub scale: f32,
}

impl Viewport {
    pub fn with_size(size: Float2) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Float2::zeros(),
            size: Float2::zeros(),
            scale: 1.0,
        }
    }
}
