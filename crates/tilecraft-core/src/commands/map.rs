//! 地图命令

use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::layer::{collect_layers, is_tile_layer, tile_layer, tile_layer_mut, TileLayer};
use crate::map::{resize_map, Map, TileFormat};
use crate::math::Extent2D;
use std::any::Any;
use uuid::Uuid;

/// 调整地图范围
///
/// 第一次执行时保存所有瓦片图层的快照，撤销时原样恢复，
/// 因此缩小后被裁掉的瓦片可以找回。连续的调整合并为一次。
#[derive(Debug)]
pub struct ResizeMapCommand {
    document_id: Uuid,
    extent: Extent2D,
    previous: Option<Extent2D>,
    snapshots: Vec<(EntityId, TileLayer)>,
}

impl ResizeMapCommand {
    pub fn new(document: &Document, extent: Extent2D) -> Result<Self> {
        if extent.is_empty() {
            return Err(CoreError::InvalidMapSpec);
        }

        Ok(Self {
            document_id: document.uuid(),
            extent,
            previous: None,
            snapshots: Vec::new(),
        })
    }
}

impl Command for ResizeMapCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ResizeMap
    }

    fn text(&self) -> &str {
        "Resize Map"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if self.previous.is_none() {
            let registry = document.registry();
            self.previous = Some(document.map().extent);
            self.snapshots = collect_layers(registry, document.root_layer())
                .into_iter()
                .filter(|&layer| is_tile_layer(registry, layer))
                .map(|layer| (layer, tile_layer(registry, layer).clone()))
                .collect();
        }

        let map = document.map_entity();
        resize_map(document.registry_mut(), map, self.extent);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let Some(previous) = self.previous else {
            return;
        };

        let map = document.map_entity();
        let registry = document.registry_mut();
        registry.get_mut::<Map>(map).extent = previous;
        for (layer, snapshot) in &self.snapshots {
            *tile_layer_mut(registry, *layer) = snapshot.clone();
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other) if other.document_id == self.document_id => {
                self.extent = other.extent;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改瓦片数据的编码偏好
#[derive(Debug)]
pub struct SetTileFormatCommand {
    document_id: Uuid,
    format: TileFormat,
    previous: Option<TileFormat>,
}

impl SetTileFormatCommand {
    pub fn new(document: &Document, format: TileFormat) -> Self {
        Self {
            document_id: document.uuid(),
            format,
            previous: None,
        }
    }
}

impl Command for SetTileFormatCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetTileFormat
    }

    fn text(&self) -> &str {
        "Set Tile Format"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let map = document.map_entity();
        let format = document.registry_mut().get_mut::<TileFormat>(map);
        self.previous = Some(std::mem::replace(format, self.format));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            let map = document.map_entity();
            *document.registry_mut().get_mut::<TileFormat>(map) = previous;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
