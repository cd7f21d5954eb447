//! 文档命令
//!
//! 每个命令记录目标文档的 UUID 和撤销所需的状态。创建实体的命令
//! 在重做时重新挂回同一个实体，被丢弃时销毁自己持有的游离实体。

pub mod animation;
pub mod component;
pub mod layer;
pub mod map;
pub mod meta;
pub mod object;
pub mod property;
pub mod tile;
pub mod tileset;

pub use animation::{AddAnimationFrameCommand, RemoveAnimationFrameCommand};
pub use component::{
    AttachComponentCommand, CreateComponentAttributeCommand, DefineComponentCommand, DetachComponentCommand,
    RemoveComponentAttributeCommand, RenameComponentCommand, ResetAttachedComponentCommand, UndefComponentCommand,
    UpdateAttachedComponentCommand,
};
pub use layer::{
    CreateLayerCommand, DuplicateLayerCommand, MoveLayerDownCommand, MoveLayerUpCommand, RemoveLayerCommand,
    SetLayerOpacityCommand, SetLayerVisibilityCommand,
};
pub use map::{ResizeMapCommand, SetTileFormatCommand};
pub use meta::RenameCommand;
pub use object::{
    CreateObjectCommand, MoveObjectCommand, RemoveObjectCommand, SetObjectTagCommand, SetObjectVisibilityCommand,
};
pub use property::{
    AddPropertyCommand, ChangePropertyTypeCommand, RemovePropertyCommand, RenamePropertyCommand,
    UpdatePropertyCommand,
};
pub use tile::{ConvertTileLayerCommand, FloodFillCommand, SetLayerTilesCommand};
pub use tileset::{AddTilesetCommand, RemoveTilesetCommand};

#[cfg(test)]
pub(crate) fn test_document() -> crate::document::Document {
    use crate::map::{MapSpec, TileOrientation};
    use crate::math::{Extent2D, Int2};

    let spec = MapSpec {
        orientation: TileOrientation::Orthogonal,
        extent: Extent2D::new(5, 5),
        tile_size: Int2::new(32, 32),
    };
    crate::document::Document::new(&spec).unwrap()
}
