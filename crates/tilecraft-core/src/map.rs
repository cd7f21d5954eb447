//! 地图
//!
//! 地图实体聚合了根组图层、已附加的瓦片集、ID计数器、瓦片编码偏好和视口。

pub use crate::component::ComponentSet;

use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::ir;
use crate::layer::group::detach_layer;
use crate::layer::{
    collect_layers, copy_layer, destroy_layer, find_parent_layer, group_layer, group_layer_mut, insert_layer,
    is_group_layer, is_layer, is_object_layer, is_tile_layer, make_group_layer, make_layer, make_layer_from_ir,
    object_layer, tile_layer_mut, Layer, LayerType, Object, ObjectId, TileId,
};
use crate::math::{Extent2D, Int2};
use crate::meta::Meta;
use crate::registry::Registry;
use crate::texture::Renderer;
use crate::tileset::{
    destroy_tileset, init_tileset_instance, make_tileset, make_tileset_from_ir, Tileset, TileCache,
    TilesetInstance, TilesetSpec,
};
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// 瓦片朝向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileOrientation {
    #[default]
    Orthogonal,
    Isometric,
    Hexagonal,
}

/// 地图创建参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSpec {
    pub orientation: TileOrientation,
    pub extent: Extent2D,
    pub tile_size: Int2,
}

impl MapSpec {
    pub fn is_valid(&self) -> bool {
        !self.extent.is_empty() && self.tile_size.x > 0 && self.tile_size.y > 0
    }
}

/// 瓦片数据编码
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileEncoding {
    #[default]
    PlainText,
    Base64,
}

/// 压缩算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionFormat {
    Zlib,
    Zstd,
}

/// 瓦片编码偏好组件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFormat {
    pub encoding: TileEncoding,
    pub compression: Option<CompressionFormat>,
    pub compression_level: Option<i32>,
}

/// 地图ID计数器组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapIdCache {
    pub next_tile_id: TileId,
    pub next_object_id: ObjectId,
    pub next_layer_id: i32,
}

impl Default for MapIdCache {
    fn default() -> Self {
        Self {
            next_tile_id: 1,
            next_object_id: 1,
            next_layer_id: 1,
        }
    }
}

/// 新图层名称的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSuffixes {
    pub tile_layer: i32,
    pub object_layer: i32,
    pub group_layer: i32,
}

impl Default for LayerSuffixes {
    fn default() -> Self {
        Self {
            tile_layer: 1,
            object_layer: 1,
            group_layer: 1,
        }
    }
}

impl LayerSuffixes {
    /// 生成下一个图层名称并递增对应序号
    pub fn next_name(&mut self, layer_type: LayerType) -> String {
        let (prefix, suffix) = match layer_type {
            LayerType::Tile => ("Tile Layer", &mut self.tile_layer),
            LayerType::Object => ("Object Layer", &mut self.object_layer),
            LayerType::Group => ("Group Layer", &mut self.group_layer),
        };
        let name = format!("{prefix} {suffix}");
        *suffix += 1;
        name
    }
}

/// 地图组件
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    pub orientation: TileOrientation,
    pub extent: Extent2D,
    pub tile_size: Int2,
    pub root_layer: EntityId,
    /// 弱引用，不拥有
    pub active_layer: Option<EntityId>,
    /// 弱引用，不拥有
    pub active_tileset: Option<EntityId>,
    pub attached_tilesets: Vec<EntityId>,
}

pub fn is_map(registry: &Registry, entity: EntityId) -> bool {
    registry.has::<Meta>(entity)
        && registry.has::<Map>(entity)
        && registry.has::<TileFormat>(entity)
        && registry.has::<MapIdCache>(entity)
        && registry.has::<LayerSuffixes>(entity)
        && registry.has::<Viewport>(entity)
}

/// 创建空地图
pub fn make_map(registry: &mut Registry, spec: &MapSpec) -> Result<EntityId> {
    if !spec.is_valid() {
        error!("Tried to create map from invalid map specification: {:?}", spec);
        return Err(CoreError::InvalidMapSpec);
    }

    let root_layer = make_group_layer(registry);
    let map = registry.create();

    registry.attach(map, Meta::default());
    registry.attach(
        map,
        Map {
            orientation: spec.orientation,
            extent: spec.extent,
            tile_size: spec.tile_size,
            root_layer,
            active_layer: None,
            active_tileset: None,
            attached_tilesets: Vec::new(),
        },
    );
    registry.attach(map, TileFormat::default());
    registry.attach(map, MapIdCache::default());
    registry.attach(map, LayerSuffixes::default());
    registry.attach(map, Viewport::default());
    registry.attach(map, ComponentSet::default());

    debug!("Created map {} ({}x{})", map, spec.extent.rows, spec.extent.cols);
    Ok(map)
}

/// 从中间表示创建地图
///
/// 任何一个瓦片集加载失败时，已创建的实体全部销毁并返回该错误。
pub fn make_map_from_ir(
    registry: &mut Registry,
    cache: &mut TileCache,
    renderer: &mut dyn Renderer,
    ir_map: &ir::Map,
) -> Result<EntityId> {
    let spec = MapSpec {
        orientation: ir_map.orientation,
        extent: ir_map.extent,
        tile_size: ir_map.tile_size,
    };
    let map = make_map(registry, &spec)?;

    *registry.get_mut::<Meta>(map) = Meta::from_ir(&ir_map.meta);
    *registry.get_mut::<TileFormat>(map) = ir_map.tile_format;
    registry.get_mut::<ComponentSet>(map).definitions = ir_map
        .components
        .iter()
        .map(|definition| {
            let bundle = definition
                .attributes
                .iter()
                .map(|attribute| (attribute.name.clone(), attribute.value.clone()))
                .collect();
            (definition.name.clone(), bundle)
        })
        .collect();

    let mut next_tile_id = 1;
    for tileset_ref in &ir_map.tilesets {
        let tileset = match make_tileset_from_ir(registry, cache, renderer, tileset_ref) {
            Ok(tileset) => tileset,
            Err(error) => {
                destroy_map(registry, cache, map);
                return Err(error);
            }
        };

        let range = registry.get::<TilesetInstance>(tileset).tile_range;
        next_tile_id = next_tile_id.max(range.end());

        let data = registry.get_mut::<Map>(map);
        data.attached_tilesets.push(tileset);
        if data.active_tileset.is_none() {
            data.active_tileset = Some(tileset);
        }
    }

    let id_cache = registry.get_mut::<MapIdCache>(map);
    id_cache.next_tile_id = next_tile_id;
    id_cache.next_object_id = ir_map.next_object_id;
    id_cache.next_layer_id = ir_map.next_layer_id;

    let root = registry.get::<Map>(map).root_layer;
    for ir_layer in &ir_map.layers {
        let layer = make_layer_from_ir(registry, ir_layer);
        group_layer_mut(registry, root).layers.push(layer);
    }

    debug!(
        "Loaded map {} with {} tilesets and {} top-level layers",
        map,
        ir_map.tilesets.len(),
        ir_map.layers.len()
    );
    Ok(map)
}

/// 销毁地图及其拥有的图层和瓦片集
pub fn destroy_map(registry: &mut Registry, cache: &mut TileCache, map: EntityId) {
    assert!(is_map(registry, map), "entity {map} is not a map");

    let data = registry.get::<Map>(map).clone();
    destroy_layer(registry, data.root_layer);
    for tileset in data.attached_tilesets {
        destroy_tileset(registry, cache, tileset);
    }

    registry.destroy(map);
    debug!("Destroyed map {}", map);
}

/// 创建瓦片集并附加到地图，占用 `next_tile_id` 开始的区间
pub fn add_tileset_to_map(
    registry: &mut Registry,
    cache: &mut TileCache,
    map: EntityId,
    spec: &TilesetSpec,
) -> Result<EntityId> {
    assert!(is_map(registry, map), "entity {map} is not a map");

    let first_id = registry.get::<MapIdCache>(map).next_tile_id;
    let tileset = make_tileset(registry, spec)?;

    if let Err(error) = init_tileset_instance(registry, cache, tileset, first_id) {
        destroy_tileset(registry, cache, tileset);
        return Err(error);
    }

    let tile_count = registry.get::<Tileset>(tileset).tile_count();
    registry.get_mut::<MapIdCache>(map).next_tile_id += tile_count as TileId;

    let data = registry.get_mut::<Map>(map);
    data.attached_tilesets.push(tileset);
    data.active_tileset = Some(tileset);

    debug!("Added tileset {} to map {}", tileset, map);
    Ok(tileset)
}

/// 把瓦片集从地图上移除（不销毁）
///
/// 瓦片集占用的ID区间不会归还。
pub fn remove_tileset_from_map(registry: &mut Registry, map: EntityId, tileset: EntityId) {
    assert!(is_map(registry, map), "entity {map} is not a map");

    let data = registry.get_mut::<Map>(map);
    data.attached_tilesets.retain(|&attached| attached != tileset);

    if data.active_tileset == Some(tileset) {
        data.active_tileset = data.attached_tilesets.first().copied();
    }

    debug!("Removed tileset {} from map {}", tileset, map);
}

/// 创建新图层并追加到地图中
///
/// 新图层获得下一个持久ID和默认名称。
pub fn add_layer_to_map(registry: &mut Registry, map: EntityId, layer_type: LayerType) -> EntityId {
    assert!(is_map(registry, map), "entity {map} is not a map");

    let extent = registry.get::<Map>(map).extent;
    let layer = make_layer(registry, layer_type, extent);

    let id_cache = registry.get_mut::<MapIdCache>(map);
    let persistent_id = id_cache.next_layer_id;
    id_cache.next_layer_id += 1;

    let name = registry.get_mut::<LayerSuffixes>(map).next_name(layer_type);
    registry.get_mut::<Meta>(layer).name = name;
    registry.get_mut::<Layer>(layer).persistent_id = Some(persistent_id);

    append_layer_to_map(registry, map, layer);
    layer
}

/// 把图层追加到活动组图层（活动图层不是组图层时追加到根），并设为活动图层
pub fn append_layer_to_map(registry: &mut Registry, map: EntityId, layer: EntityId) {
    assert!(is_map(registry, map), "entity {map} is not a map");
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let data = registry.get::<Map>(map);
    let parent = data
        .active_layer
        .filter(|&active| is_group_layer(registry, active))
        .unwrap_or(data.root_layer);

    group_layer_mut(registry, parent).layers.push(layer);
    registry.get_mut::<Map>(map).active_layer = Some(layer);
}

/// 把图层从地图中取出（不销毁），返回原父图层和位置
pub fn remove_layer_from_map(registry: &mut Registry, map: EntityId, layer: EntityId) -> Result<(EntityId, usize)> {
    assert!(is_map(registry, map), "entity {map} is not a map");
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let root = registry.get::<Map>(map).root_layer;
    let location = detach_layer(registry, root, layer).ok_or(CoreError::LayerNotFound)?;

    let active = registry.get::<Map>(map).active_layer;
    if let Some(active) = active {
        if active == layer || find_parent_layer(registry, root, active).is_none() {
            registry.get_mut::<Map>(map).active_layer = None;
        }
    }

    Ok(location)
}

/// 复制图层，副本插入到原图层之后并返回
///
/// 副本和其中的每个子图层都获得新的持久ID，拷贝出的对象获得新的对象ID。
/// 顶层副本的名称追加 " (Copy)"。
pub fn duplicate_layer_in_map(registry: &mut Registry, map: EntityId, layer: EntityId) -> Result<EntityId> {
    assert!(is_map(registry, map), "entity {map} is not a map");
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let root = registry.get::<Map>(map).root_layer;
    let parent = find_parent_layer(registry, root, layer).ok_or(CoreError::LayerNotFound)?;
    let index = group_layer(registry, parent)
        .layers
        .iter()
        .position(|&child| child == layer)
        .ok_or(CoreError::LayerNotFound)?;

    let copy = copy_layer(registry, layer);
    registry.get_mut::<Meta>(copy).name.push_str(" (Copy)");

    let mut copied_layers = vec![copy];
    if is_group_layer(registry, copy) {
        copied_layers.extend(collect_layers(registry, copy));
    }

    for copied in copied_layers {
        let id_cache = registry.get_mut::<MapIdCache>(map);
        let persistent_id = id_cache.next_layer_id;
        id_cache.next_layer_id += 1;
        registry.get_mut::<Layer>(copied).persistent_id = Some(persistent_id);

        if is_object_layer(registry, copied) {
            for object in object_layer(registry, copied).objects.clone() {
                let id_cache = registry.get_mut::<MapIdCache>(map);
                let object_id = id_cache.next_object_id;
                id_cache.next_object_id += 1;
                registry.get_mut::<Object>(object).id = object_id;
            }
        }
    }

    insert_layer(registry, parent, index + 1, copy);
    debug!("Duplicated layer {} as {} in map {}", layer, copy, map);

    Ok(copy)
}

/// 调整地图范围，同时调整所有瓦片图层
pub fn resize_map(registry: &mut Registry, map: EntityId, extent: Extent2D) {
    assert!(is_map(registry, map), "entity {map} is not a map");

    let data = registry.get_mut::<Map>(map);
    data.extent = extent;
    let root = data.root_layer;

    for layer in collect_layers(registry, root) {
        if is_tile_layer(registry, layer) {
            tile_layer_mut(registry, layer).resize(extent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{
        add_object_to_layer, count_layers, get_layer_tile, make_object, set_layer_tile, ObjectType, EMPTY_TILE,
    };
    use crate::math::Index2D;
    use crate::texture::{Texture, TextureHandle};
    use std::path::PathBuf;

    fn spec() -> MapSpec {
        MapSpec {
            orientation: TileOrientation::Orthogonal,
            extent: Extent2D::new(10, 10),
            tile_size: Int2::new(50, 50),
        }
    }

    fn tileset_spec(tiles_per_side: i32) -> TilesetSpec {
        TilesetSpec {
            tile_size: Int2::new(16, 16),
            texture: Texture {
                handle: TextureHandle(1),
                size: Int2::new(16 * tiles_per_side, 16 * tiles_per_side),
                path: PathBuf::from("tiles.png"),
            },
        }
    }

    #[test]
    fn test_make_map() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        assert!(is_map(&registry, map));
        let data = registry.get::<Map>(map);
        assert!(is_group_layer(&registry, data.root_layer));
        assert_eq!(data.active_layer, None);
        assert_eq!(data.active_tileset, None);
        assert_eq!(*registry.get::<TileFormat>(map), TileFormat::default());
        assert_eq!(*registry.get::<MapIdCache>(map), MapIdCache::default());
        assert_eq!(registry.get::<Viewport>(map).scale, 1.0);
    }

    #[test]
    fn test_make_map_rejects_invalid_spec() {
        let mut registry = Registry::new();

        let mut bad = spec();
        bad.extent = Extent2D::new(0, 10);
        assert_eq!(make_map(&mut registry, &bad), Err(CoreError::InvalidMapSpec));

        let mut bad = spec();
        bad.tile_size = Int2::new(50, 0);
        assert_eq!(make_map(&mut registry, &bad), Err(CoreError::InvalidMapSpec));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn test_tile_layer_example() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();
        let root = registry.get::<Map>(map).root_layer;

        let layer = add_layer_to_map(&mut registry, map, LayerType::Tile);
        assert_eq!(count_layers(&registry, root), 1);

        set_layer_tile(&mut registry, layer, Index2D::new(0, 0), 7);
        assert_eq!(get_layer_tile(&registry, layer, Index2D::new(0, 0)), Some(7));
        assert_eq!(get_layer_tile(&registry, layer, Index2D::new(9, 9)), Some(EMPTY_TILE));
    }

    #[test]
    fn test_add_layer_assigns_ids_and_names() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        let first = add_layer_to_map(&mut registry, map, LayerType::Tile);
        let second = add_layer_to_map(&mut registry, map, LayerType::Tile);
        let objects = add_layer_to_map(&mut registry, map, LayerType::Object);

        assert_eq!(registry.get::<Meta>(first).name, "Tile Layer 1");
        assert_eq!(registry.get::<Meta>(second).name, "Tile Layer 2");
        assert_eq!(registry.get::<Meta>(objects).name, "Object Layer 1");
        assert_eq!(registry.get::<Layer>(objects).persistent_id, Some(3));
        assert_eq!(registry.get::<MapIdCache>(map).next_layer_id, 4);
        assert_eq!(registry.get::<Map>(map).active_layer, Some(objects));
    }

    #[test]
    fn test_append_layer_into_active_group() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();
        let root = registry.get::<Map>(map).root_layer;

        let group = add_layer_to_map(&mut registry, map, LayerType::Group);
        let child = add_layer_to_map(&mut registry, map, LayerType::Tile);
        let sibling = add_layer_to_map(&mut registry, map, LayerType::Tile);

        assert_eq!(group_layer(&registry, group).layers, vec![child]);
        assert_eq!(group_layer(&registry, root).layers, vec![group, sibling]);
    }

    #[test]
    fn test_remove_layer_from_map() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        let root = registry.get::<Map>(map).root_layer;
        let group = add_layer_to_map(&mut registry, map, LayerType::Group);
        let child = add_layer_to_map(&mut registry, map, LayerType::Tile);

        assert_eq!(remove_layer_from_map(&mut registry, map, group), Ok((root, 0)));
        assert_eq!(registry.get::<Map>(map).active_layer, None);
        assert!(registry.is_valid(child));
        assert_eq!(remove_layer_from_map(&mut registry, map, group), Err(CoreError::LayerNotFound));
    }

    #[test]
    fn test_duplicate_layer() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();
        let root = registry.get::<Map>(map).root_layer;

        let group = add_layer_to_map(&mut registry, map, LayerType::Group);
        let objects = add_layer_to_map(&mut registry, map, LayerType::Object);
        let object = make_object(&mut registry, 1, ObjectType::Rect);
        add_object_to_layer(&mut registry, objects, object);
        registry.get_mut::<MapIdCache>(map).next_object_id = 2;
        registry.get_mut::<Map>(map).active_layer = None;
        let sibling = add_layer_to_map(&mut registry, map, LayerType::Tile);

        let copy = duplicate_layer_in_map(&mut registry, map, group).unwrap();
        assert_eq!(group_layer(&registry, root).layers, vec![group, copy, sibling]);
        assert_eq!(registry.get::<Meta>(copy).name, "Group Layer 1 (Copy)");
        assert_eq!(registry.get::<Layer>(copy).persistent_id, Some(4));

        let copied_objects = group_layer(&registry, copy).layers[0];
        assert_ne!(copied_objects, objects);
        assert_eq!(registry.get::<Meta>(copied_objects).name, "Object Layer 1");
        assert_eq!(registry.get::<Layer>(copied_objects).persistent_id, Some(5));

        let copied_object = object_layer(&registry, copied_objects).objects[0];
        assert_eq!(registry.get::<Object>(copied_object).id, 2);
        assert_eq!(registry.get::<Object>(object).id, 1);

        let id_cache = registry.get::<MapIdCache>(map);
        assert_eq!((id_cache.next_layer_id, id_cache.next_object_id), (6, 3));

        remove_layer_from_map(&mut registry, map, sibling).unwrap();
        assert_eq!(
            duplicate_layer_in_map(&mut registry, map, sibling),
            Err(CoreError::LayerNotFound)
        );
    }

    #[test]
    fn test_add_and_remove_tilesets() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        let first = add_tileset_to_map(&mut registry, &mut cache, map, &tileset_spec(10)).unwrap();
        let second = add_tileset_to_map(&mut registry, &mut cache, map, &tileset_spec(2)).unwrap();

        assert_eq!(registry.get::<TilesetInstance>(first).tile_range.first_id, 1);
        assert_eq!(registry.get::<TilesetInstance>(second).tile_range.first_id, 101);
        assert_eq!(registry.get::<MapIdCache>(map).next_tile_id, 105);
        assert_eq!(registry.get::<Map>(map).active_tileset, Some(second));

        remove_tileset_from_map(&mut registry, map, second);
        assert_eq!(registry.get::<Map>(map).attached_tilesets, vec![first]);
        assert_eq!(registry.get::<Map>(map).active_tileset, Some(first));
        assert_eq!(registry.get::<MapIdCache>(map).next_tile_id, 105);

        remove_tileset_from_map(&mut registry, map, first);
        assert_eq!(registry.get::<Map>(map).active_tileset, None);
    }

    #[test]
    fn test_resize_map() {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        let group = add_layer_to_map(&mut registry, map, LayerType::Group);
        let nested = add_layer_to_map(&mut registry, map, LayerType::Tile);
        set_layer_tile(&mut registry, nested, Index2D::new(2, 2), 5);

        resize_map(&mut registry, map, Extent2D::new(3, 4));
        assert_eq!(registry.get::<Map>(map).extent, Extent2D::new(3, 4));
        assert_eq!(get_layer_tile(&registry, nested, Index2D::new(2, 2)), Some(5));
        assert_eq!(get_layer_tile(&registry, nested, Index2D::new(3, 0)), None);
        assert!(is_group_layer(&registry, group));
    }

    #[test]
    fn test_destroy_map() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();
        let map = make_map(&mut registry, &spec()).unwrap();

        add_layer_to_map(&mut registry, map, LayerType::Group);
        add_layer_to_map(&mut registry, map, LayerType::Object);
        add_tileset_to_map(&mut registry, &mut cache, map, &tileset_spec(3)).unwrap();

        destroy_map(&mut registry, &mut cache, map);
        assert_eq!(registry.entity_count(), 0);
        assert!(cache.is_empty());
    }
}
