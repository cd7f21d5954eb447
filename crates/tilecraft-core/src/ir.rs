//! 中间表示
//!
//! 与磁盘格式无关的纯数据树，是核心与外部文件编解码器之间的边界。
//! 导入时按一对一的方式创建注册表实体。

use crate::layer::{LayerType, ObjectId, ObjectType, TileId};
use crate::map::{TileFormat, TileOrientation};
use crate::math::{Extent2D, Float2, Int2};
use crate::properties::Attribute;
use crate::tile::TileIndex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedAttribute {
    pub name: String,
    pub value: Attribute,
}

impl NamedAttribute {
    pub fn new(name: impl Into<String>, value: Attribute) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// 附加组件实例
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachedComponent {
    pub type_name: String,
    pub attributes: Vec<NamedAttribute>,
}

/// 附加组件定义（属性名及其默认值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub name: String,
    pub attributes: Vec<NamedAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub properties: Vec<NamedAttribute>,
    pub components: Vec<AttachedComponent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub meta: Metadata,
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub position: Float2,
    pub size: Float2,
    pub tag: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub meta: Metadata,
    pub id: i32,
    pub layer_type: LayerType,
    pub opacity: f32,
    pub extent: Extent2D,
    /// 按行排列，仅瓦片图层使用
    pub tiles: Vec<Vec<TileId>>,
    /// 仅对象图层使用
    pub objects: Vec<Object>,
    /// 仅组图层使用
    pub layers: Vec<Layer>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile_index: TileIndex,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub meta: Metadata,
    pub index: TileIndex,
    pub objects: Vec<Object>,
    pub animation: Vec<AnimationFrame>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub meta: Metadata,
    pub tile_size: Int2,
    pub tile_count: i32,
    pub column_count: i32,
    pub image_size: Int2,
    pub image_path: PathBuf,
    /// 只包含带有额外数据的瓦片
    pub tiles: Vec<Tile>,
    pub is_embedded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TilesetRef {
    pub tileset: Tileset,
    pub first_tile_id: TileId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub meta: Metadata,
    pub orientation: TileOrientation,
    pub extent: Extent2D,
    pub tile_size: Int2,
    pub next_layer_id: i32,
    pub next_object_id: ObjectId,
    pub tile_format: TileFormat,
    pub components: Vec<ComponentDefinition>,
    pub tilesets: Vec<TilesetRef>,
    pub layers: Vec<Layer>,
}
