//! 文档 → 中间表示
//!
//! 导出结果再导入会得到等价的文档。瓦片集只导出带有额外数据
//! （元数据、内嵌对象或动画）的瓦片。

use crate::error::FileError;
use crate::format::tile_rows;
use tilecraft_core::document::Document;
use tilecraft_core::entity::EntityId;
use tilecraft_core::ir;
use tilecraft_core::layer::{Layer, LayerKind, Object};
use tilecraft_core::map::{ComponentSet, MapIdCache, TileFormat};
use tilecraft_core::meta::Meta;
use tilecraft_core::properties::AttributeBundle;
use tilecraft_core::registry::Registry;
use tilecraft_core::texture::Texture;
use tilecraft_core::tile::{Animation, Tile};
use tilecraft_core::tileset::{Tileset, TilesetInstance};
use tracing::debug;

fn named_attributes(bundle: &AttributeBundle) -> Vec<ir::NamedAttribute> {
    bundle
        .iter()
        .map(|(name, value)| ir::NamedAttribute::new(name.clone(), value.clone()))
        .collect()
}

fn export_meta(meta: &Meta) -> ir::Metadata {
    ir::Metadata {
        name: meta.name.clone(),
        properties: named_attributes(&meta.properties),
        components: meta
            .components
            .iter()
            .map(|(type_name, bundle)| ir::AttachedComponent {
                type_name: type_name.clone(),
                attributes: named_attributes(bundle),
            })
            .collect(),
    }
}

fn export_object(registry: &Registry, object: EntityId) -> ir::Object {
    let data = registry.get::<Object>(object);
    ir::Object {
        meta: export_meta(registry.get::<Meta>(object)),
        id: data.id,
        object_type: data.object_type,
        position: data.position,
        size: data.size,
        tag: data.tag.clone(),
        visible: data.visible,
    }
}

fn export_tile(registry: &Registry, tile: EntityId) -> Option<ir::Tile> {
    let meta = registry.get::<Meta>(tile);
    let data = registry.get::<Tile>(tile);
    let animation = registry.find::<Animation>(tile);

    if *meta == Meta::default() && data.objects.is_empty() && animation.is_none() {
        return None;
    }

    Some(ir::Tile {
        meta: export_meta(meta),
        index: data.index,
        objects: data.objects.iter().map(|&object| export_object(registry, object)).collect(),
        animation: animation
            .map(|animation| {
                animation
                    .frames
                    .iter()
                    .map(|frame| ir::AnimationFrame {
                        tile_index: frame.tile_index,
                        duration: frame.duration,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn export_tileset(registry: &Registry, tileset: EntityId) -> Result<ir::TilesetRef, FileError> {
    let instance = registry
        .find::<TilesetInstance>(tileset)
        .ok_or(FileError::MissingComponent {
            entity: tileset,
            component: "TilesetInstance",
        })?;

    let data = registry.get::<Tileset>(tileset);
    let texture = registry.get::<Texture>(tileset);

    Ok(ir::TilesetRef {
        first_tile_id: instance.tile_range.first_id,
        tileset: ir::Tileset {
            meta: export_meta(registry.get::<Meta>(tileset)),
            tile_size: data.tile_size,
            tile_count: instance.tile_range.count,
            column_count: data.extent.cols as i32,
            image_size: texture.size,
            image_path: texture.path.clone(),
            tiles: data.tiles.iter().filter_map(|&tile| export_tile(registry, tile)).collect(),
            is_embedded: instance.is_embedded,
        },
    })
}

fn export_layer(registry: &Registry, layer: EntityId) -> Result<ir::Layer, FileError> {
    let data = registry.get::<Layer>(layer);
    let id = data.persistent_id.ok_or(FileError::MissingLayerId(layer))?;

    let mut ir_layer = ir::Layer {
        meta: export_meta(registry.get::<Meta>(layer)),
        id,
        layer_type: data.layer_type(),
        opacity: data.opacity,
        visible: data.visible,
        ..Default::default()
    };

    match &data.kind {
        LayerKind::Group(group) => {
            ir_layer.layers = group
                .layers
                .iter()
                .map(|&child| export_layer(registry, child))
                .collect::<Result<_, _>>()?;
        }
        LayerKind::Tile(tiles) => {
            ir_layer.extent = tiles.extent();
            ir_layer.tiles = tile_rows(tiles);
        }
        LayerKind::Object(objects) => {
            ir_layer.objects = objects
                .objects
                .iter()
                .map(|&object| export_object(registry, object))
                .collect();
        }
    }

    Ok(ir_layer)
}

/// 把文档转换为中间表示
pub fn export_ir(document: &Document) -> Result<ir::Map, FileError> {
    let registry = document.registry();
    let map_entity = document.map_entity();
    let map = document.map();
    let id_cache = registry.get::<MapIdCache>(map_entity);

    let tilesets = map
        .attached_tilesets
        .iter()
        .map(|&tileset| export_tileset(registry, tileset))
        .collect::<Result<Vec<_>, _>>()?;

    let layers = match &registry.get::<Layer>(map.root_layer).kind {
        LayerKind::Group(root) => root
            .layers
            .iter()
            .map(|&layer| export_layer(registry, layer))
            .collect::<Result<Vec<_>, _>>()?,
        _ => Vec::new(),
    };

    let components = registry
        .find::<ComponentSet>(map_entity)
        .map(|set| {
            set.definitions
                .iter()
                .map(|(name, bundle)| ir::ComponentDefinition {
                    name: name.clone(),
                    attributes: named_attributes(bundle),
                })
                .collect()
        })
        .unwrap_or_default();

    debug!(
        "Exported map {} with {} tilesets and {} top-level layers",
        map_entity,
        tilesets.len(),
        layers.len()
    );

    Ok(ir::Map {
        meta: export_meta(registry.get::<Meta>(map_entity)),
        orientation: map.orientation,
        extent: map.extent,
        tile_size: map.tile_size,
        next_layer_id: id_cache.next_layer_id,
        next_object_id: id_cache.next_object_id,
        tile_format: *registry.get::<TileFormat>(map_entity),
        components,
        tilesets,
        layers,
    })
}
