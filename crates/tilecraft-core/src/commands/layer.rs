//! 图层命令

use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::layer::{
    destroy_layer, find_parent_layer, get_local_layer_index, insert_layer, is_layer, move_layer_down, move_layer_up,
    Layer, LayerType,
};
use crate::map::{add_layer_to_map, duplicate_layer_in_map, remove_layer_from_map, LayerSuffixes, Map, MapIdCache};
use std::any::Any;
use tracing::warn;
use uuid::Uuid;

/// 创建图层前后需要恢复的地图状态
#[derive(Debug, Clone, Copy, PartialEq)]
struct MapState {
    id_cache: MapIdCache,
    suffixes: LayerSuffixes,
    active_layer: Option<EntityId>,
}

impl MapState {
    fn capture(document: &Document) -> Self {
        let registry = document.registry();
        let map = document.map_entity();
        Self {
            id_cache: *registry.get::<MapIdCache>(map),
            suffixes: *registry.get::<LayerSuffixes>(map),
            active_layer: registry.get::<Map>(map).active_layer,
        }
    }

    fn restore(&self, document: &mut Document) {
        let map = document.map_entity();
        let registry = document.registry_mut();
        *registry.get_mut::<MapIdCache>(map) = self.id_cache;
        *registry.get_mut::<LayerSuffixes>(map) = self.suffixes;
        registry.get_mut::<Map>(map).active_layer = self.active_layer;
    }
}

/// 把图层从地图中取出，返回原位置
fn detach_from_map(document: &mut Document, layer: EntityId) -> Option<(EntityId, usize)> {
    let map = document.map_entity();
    match remove_layer_from_map(document.registry_mut(), map, layer) {
        Ok(location) => Some(location),
        Err(error) => {
            warn!("Could not detach layer {}: {}", layer, error);
            None
        }
    }
}

/// 添加新图层
#[derive(Debug)]
pub struct CreateLayerCommand {
    document_id: Uuid,
    layer_type: LayerType,
    layer: Option<EntityId>,
    location: Option<(EntityId, usize)>,
    before: Option<MapState>,
    after: Option<MapState>,
    applied: bool,
}

impl CreateLayerCommand {
    pub fn new(document: &Document, layer_type: LayerType) -> Self {
        Self {
            document_id: document.uuid(),
            layer_type,
            layer: None,
            location: None,
            before: None,
            after: None,
            applied: false,
        }
    }

    /// 命令创建的图层，第一次执行前为 `None`
    pub fn layer(&self) -> Option<EntityId> {
        self.layer
    }
}

impl Command for CreateLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateLayer
    }

    fn text(&self) -> &str {
        "Create Layer"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        self.before = Some(MapState::capture(document));

        match (self.layer, self.location, self.after) {
            (Some(layer), Some((parent, index)), Some(after)) => {
                insert_layer(document.registry_mut(), parent, index, layer);
                after.restore(document);
            }
            _ => {
                let map = document.map_entity();
                let root = document.root_layer();
                let layer = add_layer_to_map(document.registry_mut(), map, self.layer_type);

                let registry = document.registry();
                let parent = find_parent_layer(registry, root, layer).unwrap_or(root);
                let index = get_local_layer_index(registry, root, layer).unwrap_or_default();

                self.layer = Some(layer);
                self.location = Some((parent, index));
                self.after = Some(MapState::capture(document));
            }
        }

        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(layer) = self.layer {
            detach_from_map(document, layer);
        }
        if let Some(before) = self.before {
            before.restore(document);
        }

        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if let Some(layer) = self.layer.filter(|_| !self.applied) {
            if document.registry().is_valid(layer) {
                destroy_layer(document.registry_mut(), layer);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 移除图层
///
/// 图层在撤销前保持游离状态，命令被丢弃时才真正销毁。
#[derive(Debug)]
pub struct RemoveLayerCommand {
    document_id: Uuid,
    layer: EntityId,
    location: Option<(EntityId, usize)>,
    previous_active: Option<EntityId>,
    applied: bool,
}

impl RemoveLayerCommand {
    pub fn new(document: &Document, layer: EntityId) -> Result<Self> {
        let registry = document.registry();
        assert!(is_layer(registry, layer), "entity {layer} is not a layer");

        if find_parent_layer(registry, document.root_layer(), layer).is_none() {
            return Err(CoreError::LayerNotFound);
        }

        Ok(Self {
            document_id: document.uuid(),
            layer,
            location: None,
            previous_active: None,
            applied: false,
        })
    }
}

impl Command for RemoveLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveLayer
    }

    fn text(&self) -> &str {
        "Remove Layer"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        self.previous_active = document.map().active_layer;
        self.location = detach_from_map(document, self.layer);
        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some((parent, index)) = self.location.take() {
            insert_layer(document.registry_mut(), parent, index, self.layer);
        }

        let map = document.map_entity();
        document.registry_mut().get_mut::<Map>(map).active_layer = self.previous_active;
        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if self.applied && document.registry().is_valid(self.layer) {
            destroy_layer(document.registry_mut(), self.layer);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 复制图层，副本放在原图层之后
#[derive(Debug)]
pub struct DuplicateLayerCommand {
    document_id: Uuid,
    source: EntityId,
    copy: Option<EntityId>,
    location: Option<(EntityId, usize)>,
    before: Option<MapState>,
    after: Option<MapState>,
    applied: bool,
}

impl DuplicateLayerCommand {
    pub fn new(document: &Document, layer: EntityId) -> Result<Self> {
        let registry = document.registry();
        assert!(is_layer(registry, layer), "entity {layer} is not a layer");

        if find_parent_layer(registry, document.root_layer(), layer).is_none() {
            return Err(CoreError::LayerNotFound);
        }

        Ok(Self {
            document_id: document.uuid(),
            source: layer,
            copy: None,
            location: None,
            before: None,
            after: None,
            applied: false,
        })
    }

    /// 复制出的图层，第一次执行前为 `None`
    pub fn copy(&self) -> Option<EntityId> {
        self.copy
    }
}

impl Command for DuplicateLayerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DuplicateLayer
    }

    fn text(&self) -> &str {
        "Duplicate Layer"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        self.before = Some(MapState::capture(document));

        match (self.copy, self.location, self.after) {
            (Some(copy), Some((parent, index)), Some(after)) => {
                insert_layer(document.registry_mut(), parent, index, copy);
                after.restore(document);
            }
            _ => {
                let map = document.map_entity();
                let root = document.root_layer();
                let copy = duplicate_layer_in_map(document.registry_mut(), map, self.source)
                    .unwrap_or_else(|err| panic!("layer validated at creation was rejected: {err}"));

                let registry = document.registry();
                let parent = find_parent_layer(registry, root, copy).unwrap_or(root);
                let index = get_local_layer_index(registry, root, copy).unwrap_or_default();

                self.copy = Some(copy);
                self.location = Some((parent, index));
                self.after = Some(MapState::capture(document));
            }
        }

        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(copy) = self.copy {
            detach_from_map(document, copy);
        }
        if let Some(before) = self.before {
            before.restore(document);
        }

        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if let Some(copy) = self.copy.filter(|_| !self.applied) {
            if document.registry().is_valid(copy) {
                destroy_layer(document.registry_mut(), copy);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改图层不透明度，连续修改同一图层时合并
#[derive(Debug)]
pub struct SetLayerOpacityCommand {
    document_id: Uuid,
    layer: EntityId,
    opacity: f32,
    previous: Option<f32>,
}

impl SetLayerOpacityCommand {
    pub fn new(document: &Document, layer: EntityId, opacity: f32) -> Self {
        assert!(is_layer(document.registry(), layer), "entity {layer} is not a layer");
        Self {
            document_id: document.uuid(),
            layer,
            opacity,
            previous: None,
        }
    }
}

impl Command for SetLayerOpacityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerOpacity
    }

    fn text(&self) -> &str {
        "Set Layer Opacity"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let layer = document.registry_mut().get_mut::<Layer>(self.layer);
        if self.previous.is_none() {
            self.previous = Some(layer.opacity);
        }
        layer.set_opacity(self.opacity);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            document.registry_mut().get_mut::<Layer>(self.layer).set_opacity(previous);
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other) if other.document_id == self.document_id && other.layer == self.layer => {
                self.opacity = other.opacity;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct SetLayerVisibilityCommand {
    document_id: Uuid,
    layer: EntityId,
    visible: bool,
    previous: Option<bool>,
}

impl SetLayerVisibilityCommand {
    pub fn new(document: &Document, layer: EntityId, visible: bool) -> Self {
        assert!(is_layer(document.registry(), layer), "entity {layer} is not a layer");
        Self {
            document_id: document.uuid(),
            layer,
            visible,
            previous: None,
        }
    }
}

impl Command for SetLayerVisibilityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetLayerVisibility
    }

    fn text(&self) -> &str {
        if self.visible {
            "Show Layer"
        } else {
            "Hide Layer"
        }
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let layer = document.registry_mut().get_mut::<Layer>(self.layer);
        self.previous = Some(layer.visible);
        layer.visible = self.visible;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            document.registry_mut().get_mut::<Layer>(self.layer).visible = previous;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 与前一个兄弟图层交换位置
#[derive(Debug)]
pub struct MoveLayerUpCommand {
    document_id: Uuid,
    layer: EntityId,
}

impl MoveLayerUpCommand {
    pub fn new(document: &Document, layer: EntityId) -> Self {
        Self {
            document_id: document.uuid(),
            layer,
        }
    }
}

impl Command for MoveLayerUpCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveLayerUp
    }

    fn text(&self) -> &str {
        "Move Layer Up"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let root = document.root_layer();
        move_layer_up(document.registry_mut(), root, self.layer);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let root = document.root_layer();
        move_layer_down(document.registry_mut(), root, self.layer);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 与后一个兄弟图层交换位置
#[derive(Debug)]
pub struct MoveLayerDownCommand {
    document_id: Uuid,
    layer: EntityId,
}

impl MoveLayerDownCommand {
    pub fn new(document: &Document, layer: EntityId) -> Self {
        Self {
            document_id: document.uuid(),
            layer,
        }
    }
}

impl Command for MoveLayerDownCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveLayerDown
    }

    fn text(&self) -> &str {
        "Move Layer Down"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let root = document.root_layer();
        move_layer_down(document.registry_mut(), root, self.layer);
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let root = document.root_layer();
        move_layer_up(document.registry_mut(), root, self.layer);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{test_document, RenameCommand};
    use crate::history::CommandStack;
    use crate::layer::{count_layers, group_layer};
    use crate::meta::Meta;

    #[test]
    fn test_duplicate_layer_undo_redo() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let root = document.root_layer();

        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Group));
        stack.push(&mut document, command);
        let group = document.map().active_layer.unwrap();
        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Tile));
        stack.push(&mut document, command);
        let entities = document.registry().entity_count();

        let command = Box::new(DuplicateLayerCommand::new(&document, group).unwrap());
        stack.push(&mut document, command);
        assert_eq!(stack.undo_text(), Some("Duplicate Layer"));
        assert_eq!(document.registry().entity_count(), entities + 2);

        let copy = group_layer(document.registry(), root).layers[1];
        assert_eq!(document.registry().get::<Meta>(copy).name, "Group Layer 1 (Copy)");
        assert_eq!(count_layers(document.registry(), root), 4);

        stack.undo(&mut document);
        assert_eq!(group_layer(document.registry(), root).layers, vec![group]);
        assert_eq!(document.registry().get::<MapIdCache>(document.map_entity()).next_layer_id, 3);
        assert!(document.registry().is_valid(copy));

        stack.redo(&mut document);
        assert_eq!(group_layer(document.registry(), root).layers, vec![group, copy]);
        assert_eq!(document.registry().get::<MapIdCache>(document.map_entity()).next_layer_id, 5);

        stack.undo(&mut document);
        let command = Box::new(RenameCommand::new(&document, group, "cave"));
        stack.push(&mut document, command);
        assert!(!document.registry().is_valid(copy));
        assert_eq!(document.registry().entity_count(), entities);
    }

    #[test]
    fn test_duplicate_detached_layer_is_rejected() {
        let mut document = test_document();
        let mut stack = CommandStack::default();

        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Tile));
        stack.push(&mut document, command);
        let layer = document.map().active_layer.unwrap();
        let command = Box::new(RemoveLayerCommand::new(&document, layer).unwrap());
        stack.push(&mut document, command);

        assert_eq!(
            DuplicateLayerCommand::new(&document, layer).unwrap_err(),
            CoreError::LayerNotFound
        );
    }

    #[test]
    fn test_create_layer_undo_redo() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let root = document.root_layer();

        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Tile));
        stack.push(&mut document, command);
        let layer = group_layer(document.registry(), root).layers[0];
        assert_eq!(document.registry().get::<Meta>(layer).name, "Tile Layer 1");
        assert_eq!(document.map().active_layer, Some(layer));

        stack.undo(&mut document);
        assert_eq!(count_layers(document.registry(), root), 0);
        assert_eq!(document.map().active_layer, None);
        let map = document.map_entity();
        assert_eq!(document.registry().get::<MapIdCache>(map).next_layer_id, 1);
        assert!(document.registry().is_valid(layer));

        stack.redo(&mut document);
        assert_eq!(group_layer(document.registry(), root).layers, vec![layer]);
        assert_eq!(document.map().active_layer, Some(layer));
        assert_eq!(document.registry().get::<MapIdCache>(map).next_layer_id, 2);
    }

    #[test]
    fn test_create_layer_disposed_after_undo() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let root = document.root_layer();

        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Object));
        stack.push(&mut document, command);
        let layer = group_layer(document.registry(), root).layers[0];
        stack.undo(&mut document);

        let command = Box::new(CreateLayerCommand::new(&document, LayerType::Group));
        stack.push(&mut document, command);
        assert!(!document.registry().is_valid(layer));

        let group = group_layer(document.registry(), root).layers[0];
        assert_eq!(document.registry().get::<Meta>(group).name, "Group Layer 1");
    }

    #[test]
    fn test_remove_layer() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let root = document.root_layer();

        for _ in 0..3 {
            let command = Box::new(CreateLayerCommand::new(&document, LayerType::Tile));
            stack.push(&mut document, command);
        }
        let layers = group_layer(document.registry(), root).layers.clone();

        let command = RemoveLayerCommand::new(&document, layers[1]).unwrap();
        stack.push(&mut document, Box::new(command));
        assert_eq!(group_layer(document.registry(), root).layers, vec![layers[0], layers[2]]);

        stack.undo(&mut document);
        assert_eq!(group_layer(document.registry(), root).layers, layers);
        assert_eq!(document.map().active_layer, Some(layers[2]));

        stack.redo(&mut document);
        assert!(document.registry().is_valid(layers[1]));

        stack.clear(&mut document);
        assert!(!document.registry().is_valid(layers[1]));
    }

    #[test]
    fn test_remove_missing_layer_fails() {
        let mut document = test_document();
        let map = document.map_entity();
        let layer = add_layer_to_map(document.registry_mut(), map, LayerType::Tile);
        remove_layer_from_map(document.registry_mut(), map, layer).unwrap();

        assert_eq!(
            RemoveLayerCommand::new(&document, layer).unwrap_err(),
            CoreError::LayerNotFound
        );
    }

    #[test]
    fn test_set_opacity_merges() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        let layer = add_layer_to_map(document.registry_mut(), map, LayerType::Tile);

        for opacity in [0.8, 0.5, 0.2] {
            let command = Box::new(SetLayerOpacityCommand::new(&document, layer, opacity));
            stack.push(&mut document, command);
        }
        assert_eq!(stack.size(), 1);
        assert_eq!(document.registry().get::<Layer>(layer).opacity, 0.2);

        stack.undo(&mut document);
        assert_eq!(document.registry().get::<Layer>(layer).opacity, 1.0);

        stack.redo(&mut document);
        assert_eq!(document.registry().get::<Layer>(layer).opacity, 0.2);
    }

    #[test]
    fn test_set_opacity_does_not_merge_across_documents() {
        let mut first = test_document();
        let mut second = test_document();
        let first_map = first.map_entity();
        let second_map = second.map_entity();
        let layer = add_layer_to_map(first.registry_mut(), first_map, LayerType::Tile);
        let other_layer = add_layer_to_map(second.registry_mut(), second_map, LayerType::Tile);
        assert_eq!(layer, other_layer);

        let mut command = SetLayerOpacityCommand::new(&first, layer, 0.5);
        let other = SetLayerOpacityCommand::new(&second, layer, 0.1);
        assert!(!command.merge_with(&other));

        let same_document = SetLayerOpacityCommand::new(&first, layer, 0.1);
        assert!(command.merge_with(&same_document));
    }

    #[test]
    fn test_set_visibility() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        let layer = add_layer_to_map(document.registry_mut(), map, LayerType::Tile);

        let command = SetLayerVisibilityCommand::new(&document, layer, false);
        assert_eq!(command.text(), "Hide Layer");
        stack.push(&mut document, Box::new(command));
        assert!(!document.registry().get::<Layer>(layer).visible);

        stack.undo(&mut document);
        assert!(document.registry().get::<Layer>(layer).visible);
    }

    #[test]
    fn test_move_layer() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        let root = document.root_layer();
        let a = add_layer_to_map(document.registry_mut(), map, LayerType::Tile);
        let b = add_layer_to_map(document.registry_mut(), map, LayerType::Tile);

        let command = Box::new(MoveLayerUpCommand::new(&document, b));
        stack.push(&mut document, command);
        assert_eq!(group_layer(document.registry(), root).layers, vec![b, a]);

        let command = Box::new(MoveLayerDownCommand::new(&document, b));
        stack.push(&mut document, command);
        assert_eq!(group_layer(document.registry(), root).layers, vec![a, b]);

        stack.undo(&mut document);
        stack.undo(&mut document);
        assert_eq!(group_layer(document.registry(), root).layers, vec![a, b]);
    }

    #[test]
    #[should_panic]
    fn test_command_rejects_other_document() {
        let document = test_document();
        let mut other = test_document();
        let mut command = CreateLayerCommand::new(&document, LayerType::Tile);
        command.apply(&mut other);
    }
}
