//! 瓦片集与全局瓦片ID分配
//!
//! 瓦片集定义一组有序的瓦片实体。放入地图时，瓦片集实例会占用一段
//! 连续的全局瓦片ID区间 `[first, first + count)`，该区间不能与任何
//! 已有实例重叠。[`TileCache`] 记录每个全局瓦片ID所属的瓦片集，
//! 使查找为 O(1)。
//!
//! 瓦片缓存由 [`Document`](crate::document::Document) 持有，
//! 显式传给每个需要读写它的函数。

use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::ir;
use crate::layer::object::make_object_from_ir;
use crate::layer::TileId;
use crate::math::{Extent2D, Float2, Int2};
use crate::meta::Meta;
use crate::registry::Registry;
use crate::texture::{Renderer, Texture};
use crate::tile::{copy_tile, destroy_tile, make_tile, Animation, AnimationFrame, Tile, TileIndex};
use crate::viewport::Viewport;
use std::collections::HashMap;
use tracing::{debug, warn};

/// 瓦片集组件
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    /// 单个瓦片的像素尺寸
    pub tile_size: Int2,
    pub extent: Extent2D,
    /// 每个单元格一个瓦片实体，按本地索引排列
    pub tiles: Vec<EntityId>,
}

impl Tileset {
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

/// 全局瓦片ID区间 `[first_id, first_id + count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRange {
    pub first_id: TileId,
    pub count: i32,
}

impl TileRange {
    pub const fn new(first_id: TileId, count: i32) -> Self {
        Self { first_id, count }
    }

    /// 区间末尾（不含），超出 `TileId` 范围时饱和
    pub const fn end(&self) -> TileId {
        self.first_id.saturating_add(self.count)
    }

    /// 区间末尾（不含），超出 `TileId` 范围时为 `None`
    pub const fn checked_end(&self) -> Option<TileId> {
        self.first_id.checked_add(self.count)
    }

    /// 起始ID至少为 1、非空且末尾不溢出
    pub const fn is_valid(&self) -> bool {
        self.first_id >= 1 && self.count >= 1 && self.checked_end().is_some()
    }

    pub const fn contains(&self, id: TileId) -> bool {
        id >= self.first_id && id < self.end()
    }

    pub const fn overlaps(&self, other: &TileRange) -> bool {
        self.first_id < other.end() && other.first_id < self.end()
    }

    pub fn ids(&self) -> impl Iterator<Item = TileId> {
        self.first_id..self.end()
    }
}

/// 瓦片集实例组件（瓦片集放入地图后附加）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilesetInstance {
    pub tile_range: TileRange,
    /// 是否内嵌在地图文件中
    pub is_embedded: bool,
}

/// 全局瓦片ID → 瓦片集 的查找表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileCache {
    tileset_mapping: HashMap<TileId, EntityId>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为区间内每个ID登记所属瓦片集
    pub fn register(&mut self, range: TileRange, tileset: EntityId) {
        self.tileset_mapping.extend(range.ids().map(|id| (id, tileset)));
    }

    /// 移除区间内属于该瓦片集的条目，返回移除的数量
    pub fn unregister(&mut self, range: TileRange, tileset: EntityId) -> usize {
        let mut removed = 0;
        for id in range.ids() {
            if self.tileset_mapping.get(&id) == Some(&tileset) {
                self.tileset_mapping.remove(&id);
                removed += 1;
            }
        }
        removed
    }

    pub fn find(&self, id: TileId) -> Option<EntityId> {
        self.tileset_mapping.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.tileset_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tileset_mapping.is_empty()
    }
}

/// 瓦片集创建参数
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetSpec {
    pub tile_size: Int2,
    pub texture: Texture,
}

impl TilesetSpec {
    /// 校验参数并计算瓦片集范围
    pub fn extent(&self) -> Result<Extent2D> {
        let tile_size = self.tile_size;
        if tile_size.x <= 0 || tile_size.y <= 0 {
            return Err(CoreError::InvalidTileSize {
                width: tile_size.x,
                height: tile_size.y,
            });
        }

        let rows = (self.texture.size.y / tile_size.y).max(0) as usize;
        let cols = (self.texture.size.x / tile_size.x).max(0) as usize;
        let extent = Extent2D::new(rows, cols);

        if extent.is_empty() {
            return Err(CoreError::InvalidTilesetExtent);
        }
        Ok(extent)
    }
}

pub fn is_tileset(registry: &Registry, entity: EntityId) -> bool {
    registry.has::<Meta>(entity)
        && registry.has::<Tileset>(entity)
        && registry.has::<Texture>(entity)
        && registry.has::<Viewport>(entity)
}

pub fn is_tileset_instance(registry: &Registry, entity: EntityId) -> bool {
    is_tileset(registry, entity) && registry.has::<TilesetInstance>(entity)
}

/// 创建瓦片集，每个单元格一个瓦片实体
pub fn make_tileset(registry: &mut Registry, spec: &TilesetSpec) -> Result<EntityId> {
    let extent = spec.extent().inspect_err(|error| {
        warn!("Rejected tileset specification: {}", error);
    })?;

    let tileset = registry.create();
    let tiles = (0..extent.area())
        .map(|index| make_tile(registry, index as TileIndex))
        .collect();

    let texture_size = Float2::new(spec.texture.size.x as f32, spec.texture.size.y as f32);

    registry.attach(tileset, Meta::default());
    registry.attach(
        tileset,
        Tileset {
            tile_size: spec.tile_size,
            extent,
            tiles,
        },
    );
    registry.attach(tileset, spec.texture.clone());
    registry.attach(tileset, Viewport::with_size(texture_size * 0.5));

    Ok(tileset)
}

/// 把瓦片集实例化，占用从 `first_id` 开始的全局瓦片ID区间
pub fn init_tileset_instance(
    registry: &mut Registry,
    cache: &mut TileCache,
    tileset: EntityId,
    first_id: TileId,
) -> Result<()> {
    assert!(is_tileset(registry, tileset), "entity {tileset} is not a tileset");

    if first_id < 1 {
        warn!("Rejected invalid first tile id {}", first_id);
        return Err(CoreError::InvalidFirstTileId(first_id));
    }

    if registry.has::<TilesetInstance>(tileset) {
        warn!("Tileset {} is already instanced", tileset);
        return Err(CoreError::TilesetAlreadyInstanced);
    }

    let count = i32::try_from(registry.get::<Tileset>(tileset).tile_count()).unwrap_or(i32::MAX);
    let range = TileRange::new(first_id, count);

    if !is_tile_range_available(registry, range) {
        warn!("Tile range [{}, {}) is unavailable", range.first_id, range.end());
        return Err(CoreError::TileRangeUnavailable {
            first: range.first_id,
            count: range.count,
        });
    }

    registry.attach(
        tileset,
        TilesetInstance {
            tile_range: range,
            is_embedded: false,
        },
    );
    cache.register(range, tileset);

    debug!(
        "Tileset {} claimed tile range [{}, {})",
        tileset,
        range.first_id,
        range.end()
    );
    Ok(())
}

/// 检查区间是否可用：区间本身有效，且与任何已有实例都不重叠
pub fn is_tile_range_available(registry: &Registry, range: TileRange) -> bool {
    if !range.is_valid() {
        return false;
    }

    registry
        .each::<(TilesetInstance,)>()
        .all(|(_, (instance,))| !instance.tile_range.overlaps(&range))
}

pub fn has_tile(range: &TileRange, id: TileId) -> bool {
    range.contains(id)
}

/// 销毁瓦片集
///
/// 先移除它在缓存中的区间，再销毁瓦片实体，最后销毁瓦片集本身。
pub fn destroy_tileset(registry: &mut Registry, cache: &mut TileCache, tileset: EntityId) {
    assert!(is_tileset(registry, tileset), "entity {tileset} is not a tileset");

    if let Some(instance) = registry.find::<TilesetInstance>(tileset) {
        cache.unregister(instance.tile_range, tileset);
    }

    let tiles = std::mem::take(&mut registry.get_mut::<Tileset>(tileset).tiles);
    for tile in tiles {
        destroy_tile(registry, tile);
    }

    registry.destroy(tileset);
    debug!("Destroyed tileset {}", tileset);
}

/// 深拷贝瓦片集
///
/// 拷贝不带实例信息，需要重新调用 [`init_tileset_instance`]。
pub fn copy_tileset(registry: &mut Registry, tileset: EntityId) -> EntityId {
    assert!(is_tileset(registry, tileset), "entity {tileset} is not a tileset");

    let meta = registry.get::<Meta>(tileset).clone();
    let source = registry.get::<Tileset>(tileset).clone();
    let texture = registry.get::<Texture>(tileset).clone();
    let viewport = *registry.get::<Viewport>(tileset);

    let tiles = source.tiles.iter().map(|&tile| copy_tile(registry, tile)).collect();

    let copy = registry.create();
    registry.attach(copy, meta);
    registry.attach(copy, Tileset { tiles, ..source });
    registry.attach(copy, texture);
    registry.attach(copy, viewport);
    copy
}

/// 查找全局瓦片ID所属的瓦片集
pub fn find_tileset(cache: &TileCache, id: TileId) -> Option<EntityId> {
    cache.find(id)
}

/// 把全局瓦片ID转换为本地索引
pub fn get_tile_index(registry: &Registry, cache: &TileCache, id: TileId) -> Option<TileIndex> {
    let tileset = find_tileset(cache, id)?;
    let instance = registry.find::<TilesetInstance>(tileset)?;
    Some(id - instance.tile_range.first_id)
}

/// 瓦片当前的外观
///
/// 带动画的瓦片解析为当前帧记录的索引，否则就是自身的索引。
pub fn get_tile_appearance(registry: &Registry, tileset: EntityId, index: TileIndex) -> TileIndex {
    let tiles = &registry.get::<Tileset>(tileset).tiles;
    let tile = usize::try_from(index)
        .ok()
        .and_then(|index| tiles.get(index))
        .unwrap_or_else(|| panic!("tile index {index} is out of bounds for tileset {tileset}"));

    match registry.find::<Animation>(*tile) {
        Some(animation) => animation.current_frame().tile_index,
        None => index,
    }
}

/// 从中间表示创建瓦片集实例
pub fn make_tileset_from_ir(
    registry: &mut Registry,
    cache: &mut TileCache,
    renderer: &mut dyn Renderer,
    tileset_ref: &ir::TilesetRef,
) -> Result<EntityId> {
    let ir_tileset = &tileset_ref.tileset;

    let texture = renderer.load_texture(&ir_tileset.image_path)?;
    let spec = TilesetSpec {
        tile_size: ir_tileset.tile_size,
        texture,
    };

    let tile_count = spec.extent()?.area();
    if let Some(ir_tile) = ir_tileset
        .tiles
        .iter()
        .find(|ir_tile| usize::try_from(ir_tile.index).map_or(true, |index| index >= tile_count))
    {
        return Err(CoreError::InvalidTileIndex(ir_tile.index));
    }

    let tileset = make_tileset(registry, &spec)?;
    if let Err(error) = init_tileset_instance(registry, cache, tileset, tileset_ref.first_tile_id) {
        destroy_tileset(registry, cache, tileset);
        return Err(error);
    }

    registry.get_mut::<TilesetInstance>(tileset).is_embedded = ir_tileset.is_embedded;
    *registry.get_mut::<Meta>(tileset) = Meta::from_ir(&ir_tileset.meta);

    for ir_tile in &ir_tileset.tiles {
        let tile = registry.get::<Tileset>(tileset).tiles[ir_tile.index as usize];
        *registry.get_mut::<Meta>(tile) = Meta::from_ir(&ir_tile.meta);

        let objects: Vec<_> = ir_tile
            .objects
            .iter()
            .map(|ir_object| make_object_from_ir(registry, ir_object))
            .collect();
        registry.get_mut::<Tile>(tile).objects = objects;

        if !ir_tile.animation.is_empty() {
            let frames = ir_tile
                .animation
                .iter()
                .map(|frame| AnimationFrame::new(frame.tile_index, frame.duration))
                .collect();
            registry.attach(tile, Animation::new(frames));
        }
    }

    debug!("Loaded tileset {} from {}", tileset, ir_tileset.image_path.display());
    Ok(tileset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{HeadlessRenderer, TextureHandle};
    use crate::tile::add_animation_frame;
    use std::path::PathBuf;
    use std::time::Duration;

    fn texture(width: i32, height: i32) -> Texture {
        Texture {
            handle: TextureHandle(1),
            size: Int2::new(width, height),
            path: PathBuf::from("tiles.png"),
        }
    }

    /// 10 × 10 个瓦片
    fn spec_100() -> TilesetSpec {
        TilesetSpec {
            tile_size: Int2::new(32, 32),
            texture: texture(320, 320),
        }
    }

    #[test]
    fn test_make_tileset() {
        let mut registry = Registry::new();
        let spec = TilesetSpec {
            tile_size: Int2::new(16, 32),
            texture: texture(64, 128),
        };

        let tileset = make_tileset(&mut registry, &spec).unwrap();
        assert!(is_tileset(&registry, tileset));
        assert!(!is_tileset_instance(&registry, tileset));

        let data = registry.get::<Tileset>(tileset);
        assert_eq!(data.extent, Extent2D::new(4, 4));
        assert_eq!(data.tile_count(), 16);
        for (index, &tile) in data.tiles.iter().enumerate() {
            assert_eq!(registry.get::<Tile>(tile).index, index as TileIndex);
        }

        let viewport = registry.get::<Viewport>(tileset);
        assert_eq!(viewport.size, Float2::new(32.0, 64.0));
        assert_eq!(viewport.scale, 1.0);
    }

    #[test]
    fn test_make_tileset_rejects_bad_specs() {
        let mut registry = Registry::new();

        let zero_tile = TilesetSpec {
            tile_size: Int2::new(0, 32),
            texture: texture(64, 64),
        };
        assert_eq!(
            make_tileset(&mut registry, &zero_tile),
            Err(CoreError::InvalidTileSize { width: 0, height: 32 })
        );

        let small_texture = TilesetSpec {
            tile_size: Int2::new(32, 32),
            texture: texture(16, 64),
        };
        assert_eq!(make_tileset(&mut registry, &small_texture), Err(CoreError::InvalidTilesetExtent));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn test_init_tileset_instance() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        assert_eq!(
            init_tileset_instance(&mut registry, &mut cache, tileset, 0),
            Err(CoreError::InvalidFirstTileId(0))
        );

        init_tileset_instance(&mut registry, &mut cache, tileset, 1).unwrap();
        assert!(is_tileset_instance(&registry, tileset));
        assert_eq!(cache.len(), 100);
        assert_eq!(find_tileset(&cache, 1), Some(tileset));
        assert_eq!(find_tileset(&cache, 100), Some(tileset));
        assert_eq!(find_tileset(&cache, 101), None);

        assert_eq!(
            init_tileset_instance(&mut registry, &mut cache, tileset, 200),
            Err(CoreError::TilesetAlreadyInstanced)
        );
    }

    #[test]
    fn test_tile_range_allocation() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        let first = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, first, 1).unwrap();

        for colliding in [1, 50, 100] {
            let second = make_tileset(&mut registry, &spec_100()).unwrap();
            assert_eq!(
                init_tileset_instance(&mut registry, &mut cache, second, colliding),
                Err(CoreError::TileRangeUnavailable {
                    first: colliding,
                    count: 100
                })
            );
            destroy_tileset(&mut registry, &mut cache, second);
        }

        let second = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, second, 101).unwrap();
        assert_eq!(find_tileset(&cache, 100), Some(first));
        assert_eq!(find_tileset(&cache, 101), Some(second));
    }

    #[test]
    fn test_is_tile_range_available() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        assert!(!is_tile_range_available(&registry, TileRange::new(-1, 10)));
        assert!(!is_tile_range_available(&registry, TileRange::new(0, 100)));
        assert!(is_tile_range_available(&registry, TileRange::new(1, 100)));

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, tileset, 5).unwrap();

        let expectations = [
            (TileRange::new(5, 100), false),
            (TileRange::new(4, 1), true),
            (TileRange::new(105, 1), true),
            (TileRange::new(1, 3), true),
            (TileRange::new(200, 25), true),
            (TileRange::new(1, 5), false),
            (TileRange::new(-1, 7), false),
            (TileRange::new(1, 20), false),
            (TileRange::new(40, 100), false),
            (TileRange::new(6, 10), false),
            (TileRange::new(1, 200), false),
        ];
        for (range, expected) in expectations {
            assert_eq!(is_tile_range_available(&registry, range), expected, "{range:?}");
        }
    }

    #[test]
    fn test_tile_range_overflow() {
        let range = TileRange::new(i32::MAX - 1, 4);
        assert_eq!(range.checked_end(), None);
        assert_eq!(range.end(), i32::MAX);
        assert!(!range.is_valid());
        assert!(TileRange::new(i32::MAX - 4, 4).is_valid());

        let mut registry = Registry::new();
        let mut cache = TileCache::new();
        assert!(!is_tile_range_available(&registry, range));

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        assert_eq!(
            init_tileset_instance(&mut registry, &mut cache, tileset, i32::MAX - 50),
            Err(CoreError::TileRangeUnavailable {
                first: i32::MAX - 50,
                count: 100
            })
        );
        assert!(!is_tileset_instance(&registry, tileset));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tile_range_boundaries() {
        let existing = TileRange::new(10, 5);
        for first in 9..=15 {
            let candidate = TileRange::new(first, 1);
            let expected = (10..15).contains(&first);
            assert_eq!(existing.overlaps(&candidate), expected, "first = {first}");
        }
        assert!(has_tile(&existing, 14));
        assert!(!has_tile(&existing, 15));
    }

    #[test]
    fn test_destroy_tileset_clears_cache() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, tileset, 1).unwrap();
        let tile = registry.get::<Tileset>(tileset).tiles[0];

        destroy_tileset(&mut registry, &mut cache, tileset);
        assert!(cache.is_empty());
        assert!(!registry.is_valid(tileset));
        assert!(!registry.is_valid(tile));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn test_tile_lookup() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, tileset, 11).unwrap();

        assert_eq!(get_tile_index(&registry, &cache, 11), Some(0));
        assert_eq!(get_tile_index(&registry, &cache, 60), Some(49));
        assert_eq!(get_tile_index(&registry, &cache, 10), None);
    }

    #[test]
    fn test_get_tile_appearance() {
        let mut registry = Registry::new();
        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        let tile = registry.get::<Tileset>(tileset).tiles[3];

        assert_eq!(get_tile_appearance(&registry, tileset, 3), 3);

        add_animation_frame(&mut registry, tile, 0, AnimationFrame::new(7, Duration::ZERO)).unwrap();
        add_animation_frame(&mut registry, tile, 1, AnimationFrame::new(8, Duration::ZERO)).unwrap();
        assert_eq!(get_tile_appearance(&registry, tileset, 3), 7);

        registry.get_mut::<Animation>(tile).frame_index = 1;
        assert_eq!(get_tile_appearance(&registry, tileset, 3), 8);
    }

    #[test]
    fn test_copy_tileset() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();

        let tileset = make_tileset(&mut registry, &spec_100()).unwrap();
        init_tileset_instance(&mut registry, &mut cache, tileset, 1).unwrap();
        registry.get_mut::<Meta>(tileset).name = "terrain".to_string();

        let copy = copy_tileset(&mut registry, tileset);
        assert!(is_tileset(&registry, copy));
        assert!(!is_tileset_instance(&registry, copy));
        assert_eq!(registry.get::<Meta>(copy).name, "terrain");

        let original_tiles = &registry.get::<Tileset>(tileset).tiles;
        let copied_tiles = &registry.get::<Tileset>(copy).tiles;
        assert_eq!(copied_tiles.len(), 100);
        assert!(copied_tiles.iter().all(|tile| !original_tiles.contains(tile)));
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_make_tileset_from_ir() {
        let mut registry = Registry::new();
        let mut cache = TileCache::new();
        let mut renderer = HeadlessRenderer::new().with_texture("terrain.png", Int2::new(64, 64));

        let tileset_ref = ir::TilesetRef {
            first_tile_id: 3,
            tileset: ir::Tileset {
                meta: ir::Metadata {
                    name: "terrain".to_string(),
                    ..Default::default()
                },
                tile_size: Int2::new(32, 32),
                tile_count: 4,
                column_count: 2,
                image_size: Int2::new(64, 64),
                image_path: PathBuf::from("terrain.png"),
                tiles: vec![ir::Tile {
                    index: 1,
                    animation: vec![ir::AnimationFrame {
                        tile_index: 2,
                        duration: Duration::from_millis(100),
                    }],
                    ..Default::default()
                }],
                is_embedded: true,
            },
        };

        let tileset = make_tileset_from_ir(&mut registry, &mut cache, &mut renderer, &tileset_ref).unwrap();
        let instance = registry.get::<TilesetInstance>(tileset);
        assert_eq!(instance.tile_range, TileRange::new(3, 4));
        assert!(instance.is_embedded);
        assert_eq!(registry.get::<Meta>(tileset).name, "terrain");
        assert_eq!(get_tile_appearance(&registry, tileset, 1), 2);
        assert_eq!(find_tileset(&cache, 6), Some(tileset));

        let mut bad_ref = tileset_ref.clone();
        bad_ref.tileset.tiles[0].index = 4;
        assert_eq!(
            make_tileset_from_ir(&mut registry, &mut cache, &mut renderer, &bad_ref),
            Err(CoreError::InvalidTileIndex(4))
        );

        let mut overflowing = tileset_ref.clone();
        overflowing.first_tile_id = i32::MAX - 1;
        let entities = registry.entity_count();
        assert_eq!(
            make_tileset_from_ir(&mut registry, &mut cache, &mut renderer, &overflowing),
            Err(CoreError::TileRangeUnavailable {
                first: i32::MAX - 1,
                count: 4
            })
        );
        assert_eq!(registry.entity_count(), entities);
        assert_eq!(cache.len(), 4);

        let mut missing = tileset_ref;
        missing.tileset.image_path = PathBuf::from("missing.png");
        assert!(matches!(
            make_tileset_from_ir(&mut registry, &mut cache, &mut renderer, &missing),
            Err(CoreError::TextureLoad { .. })
        ));
    }
}
