//! 对象与对象图层

use super::{is_object_layer, make_layer_entity, object_layer, object_layer_mut, LayerKind};
use crate::entity::EntityId;
use crate::ir;
use crate::math::Float2;
use crate::meta::Meta;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// 对象的持久ID
pub type ObjectId = i32;

/// 对象形状
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[default]
    Point,
    Rect,
    Ellipse,
}

/// 对象组件
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub id: ObjectId,
    pub object_type: ObjectType,
    pub position: Float2,
    pub size: Float2,
    /// 自由文本标签
    pub tag: String,
    pub visible: bool,
}

/// 对象图层数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectLayer {
    /// 有序的对象实体
    pub objects: Vec<EntityId>,
}

pub fn is_object(registry: &Registry, entity: EntityId) -> bool {
    registry.has::<Meta>(entity) && registry.has::<Object>(entity)
}

pub fn make_object(registry: &mut Registry, id: ObjectId, object_type: ObjectType) -> EntityId {
    let entity = registry.create();
    registry.attach(entity, Meta::default());
    registry.attach(
        entity,
        Object {
            id,
            object_type,
            position: Float2::zeros(),
            size: Float2::zeros(),
            tag: String::new(),
            visible: true,
        },
    );
    entity
}

pub fn make_object_from_ir(registry: &mut Registry, ir_object: &ir::Object) -> EntityId {
    let entity = make_object(registry, ir_object.id, ir_object.object_type);
    *registry.get_mut::<Meta>(entity) = Meta::from_ir(&ir_object.meta);

    let object = registry.get_mut::<Object>(entity);
    object.position = ir_object.position;
    object.size = ir_object.size;
    object.tag = ir_object.tag.clone();
    object.visible = ir_object.visible;

    entity
}

/// 深拷贝对象实体
pub fn copy_object(registry: &mut Registry, object: EntityId) -> EntityId {
    assert!(is_object(registry, object), "entity {object} is not an object");

    let meta = registry.get::<Meta>(object).clone();
    let data = registry.get::<Object>(object).clone();

    let entity = registry.create();
    registry.attach(entity, meta);
    registry.attach(entity, data);
    entity
}

pub fn destroy_object(registry: &mut Registry, object: EntityId) {
    assert!(is_object(registry, object), "entity {object} is not an object");
    registry.destroy(object);
}

pub fn make_object_layer(registry: &mut Registry) -> EntityId {
    make_layer_entity(registry, LayerKind::Object(ObjectLayer::default()))
}

/// 销毁对象图层及其中的对象
pub fn destroy_object_layer(registry: &mut Registry, layer: EntityId) {
    assert!(is_object_layer(registry, layer), "entity {layer} is not an object layer");

    let objects = std::mem::take(&mut object_layer_mut(registry, layer).objects);
    for object in objects {
        destroy_object(registry, object);
    }

    registry.destroy(layer);
}

/// 把对象追加到对象图层末尾
pub fn add_object_to_layer(registry: &mut Registry, layer: EntityId, object: EntityId) {
    assert!(is_object(registry, object), "entity {object} is not an object");
    object_layer_mut(registry, layer).objects.push(object);
}

/// 按持久ID在对象图层中查找对象
pub fn find_object_in_layer(registry: &Registry, layer: EntityId, id: ObjectId) -> Option<EntityId> {
    assert!(is_object_layer(registry, layer), "entity {layer} is not an object layer");
    object_layer(registry, layer)
        .objects
        .iter()
        .copied()
        .find(|&object| registry.get::<Object>(object).id == id)
}
