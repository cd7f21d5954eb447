//! 对象命令

use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::layer::{
    add_object_to_layer, is_object, is_object_layer, make_object, object_layer, object_layer_mut, Object, ObjectId,
    ObjectType,
};
use crate::layer::object::destroy_object;
use crate::map::MapIdCache;
use crate::math::Float2;
use std::any::Any;
use uuid::Uuid;

/// 在对象图层中创建对象，使用地图的下一个对象ID
#[derive(Debug)]
pub struct CreateObjectCommand {
    document_id: Uuid,
    layer: EntityId,
    object_type: ObjectType,
    position: Float2,
    size: Float2,
    object: Option<EntityId>,
    previous_next_id: Option<ObjectId>,
    applied: bool,
}

impl CreateObjectCommand {
    pub fn new(document: &Document, layer: EntityId, object_type: ObjectType, position: Float2) -> Self {
        assert!(
            is_object_layer(document.registry(), layer),
            "entity {layer} is not an object layer"
        );
        Self {
            document_id: document.uuid(),
            layer,
            object_type,
            position,
            size: Float2::zeros(),
            object: None,
            previous_next_id: None,
            applied: false,
        }
    }

    pub fn with_size(mut self, size: Float2) -> Self {
        self.size = size;
        self
    }

    /// 命令创建的对象，第一次执行前为 `None`
    pub fn object(&self) -> Option<EntityId> {
        self.object
    }
}

impl Command for CreateObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateObject
    }

    fn text(&self) -> &str {
        "Create Object"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let map = document.map_entity();
        let registry = document.registry_mut();
        let id_cache = registry.get_mut::<MapIdCache>(map);
        let id = id_cache.next_object_id;
        self.previous_next_id = Some(id);
        id_cache.next_object_id += 1;

        let object = match self.object {
            Some(object) => object,
            None => {
                let object = make_object(registry, id, self.object_type);
                let data = registry.get_mut::<Object>(object);
                data.position = self.position;
                data.size = self.size;
                self.object = Some(object);
                object
            }
        };

        add_object_to_layer(registry, self.layer, object);
        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let map = document.map_entity();
        let registry = document.registry_mut();
        if let Some(object) = self.object {
            object_layer_mut(registry, self.layer).objects.retain(|&child| child != object);
        }
        if let Some(previous) = self.previous_next_id {
            registry.get_mut::<MapIdCache>(map).next_object_id = previous;
        }

        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if let Some(object) = self.object.filter(|_| !self.applied) {
            if document.registry().is_valid(object) {
                destroy_object(document.registry_mut(), object);
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemoveObjectCommand {
    document_id: Uuid,
    layer: EntityId,
    object: EntityId,
    index: Option<usize>,
    applied: bool,
}

impl RemoveObjectCommand {
    pub fn new(document: &Document, layer: EntityId, object: EntityId) -> Self {
        assert!(
            object_layer(document.registry(), layer).objects.contains(&object),
            "object {object} is not in layer {layer}"
        );
        Self {
            document_id: document.uuid(),
            layer,
            object,
            index: None,
            applied: false,
        }
    }
}

impl Command for RemoveObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveObject
    }

    fn text(&self) -> &str {
        "Remove Object"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let objects = &mut object_layer_mut(document.registry_mut(), self.layer).objects;
        self.index = objects.iter().position(|&child| child == self.object);
        if let Some(index) = self.index {
            objects.remove(index);
        }
        self.applied = true;
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(index) = self.index.take() {
            let objects = &mut object_layer_mut(document.registry_mut(), self.layer).objects;
            objects.insert(index.min(objects.len()), self.object);
        }
        self.applied = false;
    }

    fn dispose(&mut self, document: &mut Document) {
        if self.applied && document.registry().is_valid(self.object) {
            destroy_object(document.registry_mut(), self.object);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 移动对象，连续移动同一对象时合并
#[derive(Debug)]
pub struct MoveObjectCommand {
    document_id: Uuid,
    object: EntityId,
    position: Float2,
    previous: Option<Float2>,
}

impl MoveObjectCommand {
    pub fn new(document: &Document, object: EntityId, position: Float2) -> Self {
        assert!(is_object(document.registry(), object), "entity {object} is not an object");
        Self {
            document_id: document.uuid(),
            object,
            position,
            previous: None,
        }
    }
}

impl Command for MoveObjectCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::MoveObject
    }

    fn text(&self) -> &str {
        "Move Object"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let data = document.registry_mut().get_mut::<Object>(self.object);
        let previous = std::mem::replace(&mut data.position, self.position);
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            document.registry_mut().get_mut::<Object>(self.object).position = previous;
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other) if other.document_id == self.document_id && other.object == self.object => {
                self.position = other.position;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改对象标签，连续修改同一对象时合并
#[derive(Debug)]
pub struct SetObjectTagCommand {
    document_id: Uuid,
    object: EntityId,
    tag: String,
    previous: Option<String>,
}

impl SetObjectTagCommand {
    pub fn new(document: &Document, object: EntityId, tag: impl Into<String>) -> Self {
        assert!(is_object(document.registry(), object), "entity {object} is not an object");
        Self {
            document_id: document.uuid(),
            object,
            tag: tag.into(),
            previous: None,
        }
    }
}

impl Command for SetObjectTagCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetObjectTag
    }

    fn text(&self) -> &str {
        "Set Object Tag"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let data = document.registry_mut().get_mut::<Object>(self.object);
        let previous = std::mem::replace(&mut data.tag, self.tag.clone());
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = &self.previous {
            document.registry_mut().get_mut::<Object>(self.object).tag = previous.clone();
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other) if other.document_id == self.document_id && other.object == self.object => {
                self.tag = other.tag.clone();
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
pub struct SetObjectVisibilityCommand {
    document_id: Uuid,
    object: EntityId,
    visible: bool,
    previous: Option<bool>,
}

impl SetObjectVisibilityCommand {
    pub fn new(document: &Document, object: EntityId, visible: bool) -> Self {
        assert!(is_object(document.registry(), object), "entity {object} is not an object");
        Self {
            document_id: document.uuid(),
            object,
            visible,
            previous: None,
        }
    }
}

impl Command for SetObjectVisibilityCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetObjectVisibility
    }

    fn text(&self) -> &str {
        if self.visible {
            "Show Object"
        } else {
            "Hide Object"
        }
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let data = document.registry_mut().get_mut::<Object>(self.object);
        self.previous = Some(std::mem::replace(&mut data.visible, self.visible));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous {
            document.registry_mut().get_mut::<Object>(self.object).visible = previous;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
