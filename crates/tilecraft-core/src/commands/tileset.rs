//! 瓦片集命令

use crate::command::{check_document, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::layer::TileId;
use crate::map::{add_tileset_to_map, remove_tileset_from_map, Map, MapIdCache};
use crate::tileset::{destroy_tileset, is_tile_range_available, is_tileset, TileRange, TilesetInstance, TilesetSpec};
use std::any::Any;
use uuid::Uuid;

/// 瓦片集相关的地图状态
#[derive(Debug, Clone, Copy, PartialEq)]
struct TilesetState {
    next_tile_id: TileId,
    active_tileset: Option<EntityId>,
}

impl TilesetState {
    fn capture(document: &Document) -> Self {
        let map = document.map_entity();
        Self {
            next_tile_id: document.registry().get::<MapIdCache>(map).next_tile_id,
            active_tileset: document.map().active_tileset,
        }
    }

    fn restore(&self, document: &mut Document) {
        let map = document.map_entity();
        let registry = document.registry_mut();
        registry.get_mut::<MapIdCache>(map).next_tile_id = self.next_tile_id;
        registry.get_mut::<Map>(map).active_tileset = self.active_tileset;
    }
}

/// 从纹理创建瓦片集并附加到地图
///
/// 撤销时瓦片集连同实例信息一起游离，其ID区间从瓦片缓存中移除。
#[derive(Debug)]
pub struct AddTilesetCommand {
    document_id: Uuid,
    spec: TilesetSpec,
    tileset: Option<EntityId>,
    instance: Option<TilesetInstance>,
    before: Option<TilesetState>,
    after: Option<TilesetState>,
    applied: bool,
}

impl AddTilesetCommand {
    /// 校验参数，并确认从 `next_tile_id` 开始的区间可用
    pub fn new(document: &Document, spec: TilesetSpec) -> Result<Self> {
        let extent = spec.extent()?;

        let first_id = document.registry().get::<MapIdCache>(document.map_entity()).next_tile_id;
        let range = TileRange::new(first_id, i32::try_from(extent.area()).unwrap_or(i32::MAX));
        if !is_tile_range_available(document.registry(), range) {
            return Err(CoreError::TileRangeUnavailable {
                first: range.first_id,
                count: range.count,
            });
        }

        Ok(Self {
            document_id: document.uuid(),
            spec,
            tileset: None,
            instance: None,
            before: None,
            after: None,
            applied: false,
        })
    }

    /// 命令创建的瓦片集，第一次执行前为 `None`
    pub fn tileset(&self) -> Option<EntityId> {
        self.tileset
    }
}

impl Command for AddTilesetCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddTileset
    }

    fn text(&self) -> &str {
        "Add Tileset"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        self.before = Some(TilesetState::capture(document));

        let map = document.map_entity();
        match (self.tileset, self.instance.take(), self.after) {
            (Some(tileset), Some(instance), Some(after)) => {
                let (registry, cache) = document.parts_mut();
                registry.attach(tileset, instance);
                registry.get_mut::<Map>(map).attached_tilesets.push(tileset);
                cache.register(instance.tile_range, tileset);
                after.restore(document);
            }
            _ => {
                let (registry, cache) = document.parts_mut();
                let tileset = add_tileset_to_map(registry, cache, map, &self.spec)
                    .unwrap_or_else(|err| panic!("tileset validated at creation was rejected: {err}"));
                self.tileset = Some(tileset);
                self.after = Some(TilesetState::capture(document));
            }
        }

        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let Some(tileset) = self.tileset.filter(|_| self.applied) else {
            return;
        };

        let map = document.map_entity();
        let (registry, cache) = document.parts_mut();
        remove_tileset_from_map(registry, map, tileset);
        if let Some(instance) = registry.detach::<TilesetInstance>(tileset) {
            cache.unregister(instance.tile_range, tileset);
            self.instance = Some(instance);
        }

        if let Some(before) = self.before {
            before.restore(document);
        }
        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if let Some(tileset) = self.tileset.filter(|_| !self.applied) {
            let (registry, cache) = document.parts_mut();
            if registry.is_valid(tileset) {
                destroy_tileset(registry, cache, tileset);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 把瓦片集从地图上移除
///
/// 瓦片集占用的ID区间不归还，只是不再出现在瓦片缓存中。
#[derive(Debug)]
pub struct RemoveTilesetCommand {
    document_id: Uuid,
    tileset: EntityId,
    index: Option<usize>,
    previous_active: Option<EntityId>,
    applied: bool,
}

impl RemoveTilesetCommand {
    pub fn new(document: &Document, tileset: EntityId) -> Self {
        assert!(
            is_tileset(document.registry(), tileset),
            "entity {tileset} is not a tileset"
        );
        assert!(
            document.map().attached_tilesets.contains(&tileset),
            "tileset {tileset} is not attached to the map"
        );
        Self {
            document_id: document.uuid(),
            tileset,
            index: None,
            previous_active: None,
            applied: false,
        }
    }
}

impl Command for RemoveTilesetCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveTileset
    }

    fn text(&self) -> &str {
        "Remove Tileset"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let map = document.map_entity();
        let data = document.map();
        self.previous_active = data.active_tileset;
        self.index = data.attached_tilesets.iter().position(|&attached| attached == self.tileset);

        let (registry, cache) = document.parts_mut();
        remove_tileset_from_map(registry, map, self.tileset);
        if let Some(instance) = registry.find::<TilesetInstance>(self.tileset) {
            cache.unregister(instance.tile_range, self.tileset);
        }

        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let map = document.map_entity();
        let (registry, cache) = document.parts_mut();

        let data = registry.get_mut::<Map>(map);
        let index = self.index.unwrap_or(data.attached_tilesets.len()).min(data.attached_tilesets.len());
        data.attached_tilesets.insert(index, self.tileset);
        data.active_tileset = self.previous_active;

        if let Some(instance) = registry.find::<TilesetInstance>(self.tileset) {
            cache.register(instance.tile_range, self.tileset);
        }

        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if self.applied {
            let (registry, cache) = document.parts_mut();
            if registry.is_valid(self.tileset) {
                destroy_tileset(registry, cache, self.tileset);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
