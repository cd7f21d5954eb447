//! 核心错误定义
//!
//! 这里只包含预期内的运行时错误。调用方违反约定（传入错误类型的实体、
//! 读取不存在的组件等）直接 panic，不通过错误值传递。

use crate::layer::TileId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid map specification")]
    InvalidMapSpec,

    #[error("Invalid tile size: {width}x{height}")]
    InvalidTileSize { width: i32, height: i32 },

    #[error("Tileset texture is too small for its tile size")]
    InvalidTilesetExtent,

    #[error("Invalid first tile id: {0}")]
    InvalidFirstTileId(TileId),

    #[error("Tile range starting at {first} ({count} tiles) is unavailable")]
    TileRangeUnavailable { first: TileId, count: i32 },

    #[error("Tileset is already instanced")]
    TilesetAlreadyInstanced,

    #[error("Animation frame index {index} is out of bounds (frame count: {len})")]
    AnimationFrameOutOfBounds { index: usize, len: usize },

    #[error("Failed to load texture {}: {reason}", .path.display())]
    TextureLoad { path: PathBuf, reason: String },

    #[error("Invalid tile index: {0}")]
    InvalidTileIndex(i32),

    #[error("Layer not found")]
    LayerNotFound,

    #[error("Property already exists: {0}")]
    PropertyExists(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Component already defined: {0}")]
    ComponentExists(String),

    #[error("Component not defined: {0}")]
    ComponentNotFound(String),

    #[error("Component already attached: {0}")]
    ComponentAlreadyAttached(String),

    #[error("Component not attached: {0}")]
    ComponentNotAttached(String),

    #[error("Component attribute already exists: {0}")]
    ComponentAttributeExists(String),

    #[error("Component attribute not found: {0}")]
    ComponentAttributeNotFound(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
