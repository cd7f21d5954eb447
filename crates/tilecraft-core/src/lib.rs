//! Tilecraft 文档核心
//!
//! 瓦片地图编辑器的内存文档模型：地图由图层树（组图层 / 瓦片图层 / 对象图层）、
//! 占用全局瓦片ID区间的瓦片集以及元数据组成，全部存放在一个通用的实体-组件注册表中。
//!
//! # 架构设计
//!
//! 采用 Entity-Component 模式：
//! - `EntityId`: 带代数校验的实体句柄
//! - `Registry`: 每种组件类型一个存储
//! - `Command`: 所有用户可见的修改都是可撤销的命令
//!
//! # 示例
//!
//! ```rust
//! use tilecraft_core::prelude::*;
//!
//! let spec = MapSpec {
//!     orientation: TileOrientation::Orthogonal,
//!     extent: Extent2D::new(10, 10),
//!     tile_size: Int2::new(32, 32),
//! };
//! let mut document = Document::new(&spec).unwrap();
//! let mut history = CommandStack::default();
//!
//! let command = CreateLayerCommand::new(&document, LayerType::Tile);
//! history.push(&mut document, Box::new(command));
//! assert_eq!(count_layers(document.registry(), document.root_layer()), 1);
//!
//! history.undo(&mut document);
//! assert_eq!(count_layers(document.registry(), document.root_layer()), 0);
//! ```

pub mod command;
pub mod commands;
pub mod component;
pub mod document;
pub mod entity;
pub mod error;
pub mod history;
pub mod ir;
pub mod layer;
pub mod map;
pub mod math;
pub mod meta;
pub mod properties;
pub mod registry;
pub mod texture;
pub mod tile;
pub mod tileset;
pub mod viewport;

pub use error::{CoreError, Result};

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::command::{Command, CommandKind};
    pub use crate::commands::{
        AddAnimationFrameCommand, AddPropertyCommand, AddTilesetCommand, AttachComponentCommand,
        ChangePropertyTypeCommand, ConvertTileLayerCommand, CreateComponentAttributeCommand, CreateLayerCommand,
        CreateObjectCommand, DefineComponentCommand, DetachComponentCommand, DuplicateLayerCommand, FloodFillCommand,
        MoveLayerDownCommand, MoveLayerUpCommand, MoveObjectCommand, RemoveAnimationFrameCommand,
        RemoveComponentAttributeCommand, RemoveLayerCommand, RemoveObjectCommand, RemovePropertyCommand,
        RemoveTilesetCommand, RenameCommand, RenameComponentCommand, RenamePropertyCommand, ResetAttachedComponentCommand,
        ResizeMapCommand, SetLayerOpacityCommand, SetLayerTilesCommand, SetLayerVisibilityCommand, SetObjectTagCommand,
        SetObjectVisibilityCommand, SetTileFormatCommand, UndefComponentCommand, UpdateAttachedComponentCommand,
        UpdatePropertyCommand,
    };
    pub use crate::document::{Document, SaveFormat};
    pub use crate::entity::EntityId;
    pub use crate::error::{CoreError, Result};
    pub use crate::history::CommandStack;
    pub use crate::layer::{count_layers, Layer, LayerKind, LayerType, TileId, EMPTY_TILE};
    pub use crate::map::{Map, MapSpec, TileFormat, TileOrientation};
    pub use crate::math::{Extent2D, Float2, Index2D, Int2};
    pub use crate::meta::Meta;
    pub use crate::properties::{Attribute, AttributeType, Color};
    pub use crate::registry::Registry;
    pub use crate::texture::{Renderer, Texture};
    pub use crate::tileset::{TileCache, TilesetSpec};
}
