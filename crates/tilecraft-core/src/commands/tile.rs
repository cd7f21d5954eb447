//! 瓦片编辑命令

use crate::command::{check_document, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::layer::tile::TileStorageKind;
use crate::layer::{is_tile_layer, tile_layer_mut, TileId};
use crate::math::Index2D;
use std::any::Any;
use uuid::Uuid;

/// 一次笔刷或橡皮擦操作写入的瓦片
///
/// 越界的单元格被忽略，撤销时按相反顺序恢复原值。
#[derive(Debug)]
pub struct SetLayerTilesCommand {
    document_id: Uuid,
    layer: EntityId,
    tiles: Vec<(Index2D, TileId)>,
    previous: Vec<(Index2D, TileId)>,
    text: String,
}

impl SetLayerTilesCommand {
    pub fn new(document: &Document, layer: EntityId, tiles: Vec<(Index2D, TileId)>) -> Self {
        assert!(
            is_tile_layer(document.registry(), layer),
            "entity {layer} is not a tile layer"
        );
        Self {
            document_id: document.uuid(),
            layer,
            tiles,
            previous: Vec::new(),
            text: "Set Tiles".to_string(),
        }
    }

    /// 覆盖菜单文本（例如 "Erase Tiles"）
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

impl Command for SetLayerTilesCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerTiles
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let tile_layer = tile_layer_mut(document.registry_mut(), self.layer);
        self.previous.clear();
        for &(index, id) in &self.tiles {
            if let Some(previous) = tile_layer.get(index) {
                self.previous.push((index, previous));
                tile_layer.set(index, id);
            }
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let tile_layer = tile_layer_mut(document.registry_mut(), self.layer);
        for &(index, previous) in self.previous.iter().rev() {
            tile_layer.set(index, previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 洪水填充
#[derive(Debug)]
pub struct FloodFillCommand {
    document_id: Uuid,
    layer: EntityId,
    origin: Index2D,
    replacement: TileId,
    changed: Vec<(Index2D, TileId)>,
}

impl FloodFillCommand {
    pub fn new(document: &Document, layer: EntityId, origin: Index2D, replacement: TileId) -> Self {
        assert!(
            is_tile_layer(document.registry(), layer),
            "entity {layer} is not a tile layer"
        );
        Self {
            document_id: document.uuid(),
            layer,
            origin,
            replacement,
            changed: Vec::new(),
        }
    }
}

impl Command for FloodFillCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::FloodFill
    }

    fn text(&self) -> &str {
        "Flood Fill"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let tile_layer = tile_layer_mut(document.registry_mut(), self.layer);
        self.changed = tile_layer.flood_fill(self.origin, self.replacement);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let tile_layer = tile_layer_mut(document.registry_mut(), self.layer);
        for &(index, previous) in &self.changed {
            tile_layer.set(index, previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 在稠密和稀疏表示之间转换瓦片图层
#[derive(Debug)]
pub struct ConvertTileLayerCommand {
    document_id: Uuid,
    layer: EntityId,
    target: TileStorageKind,
    previous: Option<TileStorageKind>,
}

impl ConvertTileLayerCommand {
    pub fn new(document: &Document, layer: EntityId, target: TileStorageKind) -> Self {
        assert!(
            is_tile_layer(document.registry(), layer),
            "entity {layer} is not a tile layer"
        );
        Self {
            document_id: document.uuid(),
            layer,
            target,
            previous: None,
        }
    }
}

impl Command for ConvertTileLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ConvertTileLayer
    }

    fn text(&self) -> &str {
        match self.target {
            TileStorageKind::Dense => "Convert To Dense Layer",
            TileStorageKind::Sparse => "Convert To Sparse Layer",
        }
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let tile_layer = tile_layer_mut(document.registry_mut(), self.layer);
        self.previous = Some(tile_layer.storage().kind());
        tile_layer.convert_to(self.target);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            tile_layer_mut(document.registry_mut(), self.layer).convert_to(previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
