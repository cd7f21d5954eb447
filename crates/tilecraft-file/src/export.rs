//! 文档遍历
//!
//! 外部编解码器通过实现 [`DocumentVisitor`] 读取文档，而不必了解注册表的布局。
//! 遍历顺序固定为深度优先：
//! 地图 → 每个已附加的瓦片集 → 其瓦片（瓦片 → 内嵌对象）→ 根图层的子图层（前序，
//! 对象图层之后紧跟其中的对象），遇到第一个错误立即停止并返回该错误。

use tilecraft_core::document::Document;
use tilecraft_core::entity::EntityId;
use tilecraft_core::layer::{Layer, LayerKind};
use tilecraft_core::registry::Registry;
use tilecraft_core::tile::Tile;
use tilecraft_core::tileset::Tileset;

/// 文档访问者，每个回调默认什么都不做
pub trait DocumentVisitor {
    type Error;

    fn visit_map(&mut self, _registry: &Registry, _map: EntityId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_tileset(&mut self, _registry: &Registry, _tileset: EntityId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_tile(&mut self, _registry: &Registry, _tile: EntityId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_layer(&mut self, _registry: &Registry, _layer: EntityId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_object(&mut self, _registry: &Registry, _object: EntityId) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// 按固定顺序遍历整个文档
pub fn accept<V: DocumentVisitor>(document: &Document, visitor: &mut V) -> Result<(), V::Error> {
    let registry = document.registry();
    let map = document.map_entity();

    visitor.visit_map(registry, map)?;

    for &tileset in &document.map().attached_tilesets {
        visitor.visit_tileset(registry, tileset)?;

        for &tile in &registry.get::<Tileset>(tileset).tiles {
            visitor.visit_tile(registry, tile)?;

            for &object in &registry.get::<Tile>(tile).objects {
                visitor.visit_object(registry, object)?;
            }
        }
    }

    let mut pending: Vec<EntityId> = match &registry.get::<Layer>(document.root_layer()).kind {
        LayerKind::Group(group) => group.layers.iter().rev().copied().collect(),
        _ => Vec::new(),
    };

    while let Some(layer) = pending.pop() {
        visitor.visit_layer(registry, layer)?;

        match &registry.get::<Layer>(layer).kind {
            LayerKind::Group(group) => pending.extend(group.layers.iter().rev().copied()),
            LayerKind::Object(objects) => {
                for &object in &objects.objects {
                    visitor.visit_object(registry, object)?;
                }
            }
            LayerKind::Tile(_) => {}
        }
    }

    Ok(())
}
