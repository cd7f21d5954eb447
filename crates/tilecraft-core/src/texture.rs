//! 纹理与渲染器接口
//!
//! 核心只依赖渲染器的一项能力：按路径加载图像并返回纹理句柄。

use crate::error::{CoreError, Result};
use crate::math::Int2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 渲染器持有的不透明纹理句柄
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// 纹理组件
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub handle: TextureHandle,
    /// 像素尺寸，用于推导瓦片集范围
    pub size: Int2,
    pub path: PathBuf,
}

/// 渲染器能力
pub trait Renderer {
    /// 加载图像
    fn load_texture(&mut self, path: &Path) -> Result<Texture>;
}

/// 无图形输出的渲染器
///
/// 按预先登记的尺寸返回纹理，供命令行工具和测试使用。
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    sizes: HashMap<PathBuf, Int2>,
    next_handle: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一张纹理的尺寸
    pub fn with_texture(mut self, path: impl Into<PathBuf>, size: Int2) -> Self {
        self.sizes.insert(path.into(), size);
        self
    }
}

impl Renderer for HeadlessRenderer {
    fn load_texture(&mut self, path: &Path) -> Result<Texture> {
        let size = *self.sizes.get(path).ok_or_else(|| CoreError::TextureLoad {
            path: path.to_path_buf(),
            reason: "unknown image".to_string(),
        })?;

        self.next_handle += 1;
        debug!("Loaded texture {} ({}x{})", path.display(), size.x, size.y);

        Ok(Texture {
            handle: TextureHandle(self.next_handle),
            size,
            path: path.to_path_buf(),
        })
    }
}
