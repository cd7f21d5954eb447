//! 图层
//!
//! 每个图层实体带有 [`Meta`] 和 [`Layer`] 两个组件。图层种类由
//! [`LayerKind`] 封闭枚举携带，通过模式匹配分派：
//! - 组图层：有序的子图层列表
//! - 瓦片图层：稠密或稀疏的瓦片矩阵
//! - 对象图层：有序的对象列表
//!
//! 子图层的所有权由父组图层的列表表达，一个图层不会同时出现在两个组里。

pub mod group;
pub mod object;
pub mod tile;

pub use group::{
    can_move_layer_down, can_move_layer_up, collect_layers, count_layers, destroy_group_layer,
    find_parent_layer, get_global_layer_index, get_local_layer_index, insert_layer, make_group_layer,
    move_layer_down, move_layer_up, GroupLayer,
};
pub use object::{
    add_object_to_layer, destroy_object_layer, find_object_in_layer, is_object, make_object, make_object_layer,
    Object, ObjectId, ObjectLayer, ObjectType,
};
pub use tile::{
    convert_to_dense_tile_layer, convert_to_sparse_tile_layer, each_layer_tile, each_layer_tile_in, get_layer_tile,
    make_tile_layer, resize_tile_layer, serialize_tile_layer, set_layer_tile, TileId, TileLayer, TileStorage,
    TileStorageKind, EMPTY_TILE,
};

use crate::entity::EntityId;
use crate::ir;
use crate::math::Extent2D;
use crate::meta::Meta;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use tile::DenseTileMatrix;

/// 图层种类标签
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Group,
    #[default]
    Tile,
    Object,
}

/// 图层种类及其数据
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Group(GroupLayer),
    Tile(TileLayer),
    Object(ObjectLayer),
}

/// 图层组件
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// 存档中使用的持久ID
    pub persistent_id: Option<i32>,

    /// 不透明度，范围 [0, 1]
    pub opacity: f32,

    /// 是否可见
    pub visible: bool,

    pub kind: LayerKind,
}

impl Layer {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            persistent_id: None,
            opacity: 1.0,
            visible: true,
            kind,
        }
    }

    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::Group(_) => LayerType::Group,
            LayerKind::Tile(_) => LayerType::Tile,
            LayerKind::Object(_) => LayerType::Object,
        }
    }

    /// 设置不透明度，自动截断到 [0, 1]
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

pub fn is_layer(registry: &Registry, entity: EntityId) -> bool {
    registry.has::<Meta>(entity) && registry.has::<Layer>(entity)
}

pub fn is_group_layer(registry: &Registry, entity: EntityId) -> bool {
    matches!(registry.find::<Layer>(entity), Some(Layer { kind: LayerKind::Group(_), .. }))
}

pub fn is_tile_layer(registry: &Registry, entity: EntityId) -> bool {
    matches!(registry.find::<Layer>(entity), Some(Layer { kind: LayerKind::Tile(_), .. }))
}

pub fn is_object_layer(registry: &Registry, entity: EntityId) -> bool {
    matches!(registry.find::<Layer>(entity), Some(Layer { kind: LayerKind::Object(_), .. }))
}

/// 获取组图层数据
///
/// # Panics
///
/// 实体不是组图层时 panic。
pub fn group_layer(registry: &Registry, entity: EntityId) -> &GroupLayer {
    match &registry.get::<Layer>(entity).kind {
        LayerKind::Group(group) => group,
        _ => panic!("entity {entity} is not a group layer"),
    }
}

pub fn group_layer_mut(registry: &mut Registry, entity: EntityId) -> &mut GroupLayer {
    match &mut registry.get_mut::<Layer>(entity).kind {
        LayerKind::Group(group) => group,
        _ => panic!("entity {entity} is not a group layer"),
    }
}

/// 获取瓦片图层数据
///
/// # Panics
///
/// 实体不是瓦片图层时 panic。
pub fn tile_layer(registry: &Registry, entity: EntityId) -> &TileLayer {
    match &registry.get::<Layer>(entity).kind {
        LayerKind::Tile(tiles) => tiles,
        _ => panic!("entity {entity} is not a tile layer"),
    }
}

pub fn tile_layer_mut(registry: &mut Registry, entity: EntityId) -> &mut TileLayer {
    match &mut registry.get_mut::<Layer>(entity).kind {
        LayerKind::Tile(tiles) => tiles,
        _ => panic!("entity {entity} is not a tile layer"),
    }
}

/// 获取对象图层数据
///
/// # Panics
///
/// 实体不是对象图层时 panic。
pub fn object_layer(registry: &Registry, entity: EntityId) -> &ObjectLayer {
    match &registry.get::<Layer>(entity).kind {
        LayerKind::Object(objects) => objects,
        _ => panic!("entity {entity} is not an object layer"),
    }
}

pub fn object_layer_mut(registry: &mut Registry, entity: EntityId) -> &mut ObjectLayer {
    match &mut registry.get_mut::<Layer>(entity).kind {
        LayerKind::Object(objects) => objects,
        _ => panic!("entity {entity} is not an object layer"),
    }
}

/// 创建指定种类的空图层，瓦片图层使用给定范围
pub fn make_layer(registry: &mut Registry, layer_type: LayerType, extent: Extent2D) -> EntityId {
    match layer_type {
        LayerType::Group => make_group_layer(registry),
        LayerType::Tile => make_tile_layer(registry, extent),
        LayerType::Object => make_object_layer(registry),
    }
}

pub(crate) fn make_layer_entity(registry: &mut Registry, kind: LayerKind) -> EntityId {
    let entity = registry.create();
    registry.attach(entity, Meta::default());
    registry.attach(entity, Layer::new(kind));
    entity
}

/// 从中间表示递归创建图层
pub fn make_layer_from_ir(registry: &mut Registry, ir_layer: &ir::Layer) -> EntityId {
    let kind = match ir_layer.layer_type {
        LayerType::Group => {
            let layers = ir_layer
                .layers
                .iter()
                .map(|child| make_layer_from_ir(registry, child))
                .collect();
            LayerKind::Group(GroupLayer { layers })
        }
        LayerType::Tile => {
            let matrix = DenseTileMatrix::from_rows(ir_layer.extent, &ir_layer.tiles);
            LayerKind::Tile(TileLayer::new(TileStorage::Dense(matrix)))
        }
        LayerType::Object => {
            let objects = ir_layer
                .objects
                .iter()
                .map(|ir_object| object::make_object_from_ir(registry, ir_object))
                .collect();
            LayerKind::Object(ObjectLayer { objects })
        }
    };

    let entity = make_layer_entity(registry, kind);
    *registry.get_mut::<Meta>(entity) = Meta::from_ir(&ir_layer.meta);

    let layer = registry.get_mut::<Layer>(entity);
    layer.persistent_id = Some(ir_layer.id);
    layer.set_opacity(ir_layer.opacity);
    layer.visible = ir_layer.visible;

    entity
}

enum Pending {
    Visit(EntityId),
    Release(EntityId),
}

/// 销毁图层及其拥有的全部子实体
///
/// 使用显式工作列表做后序遍历：子图层和对象先于其所属图层销毁。
pub fn destroy_layer(registry: &mut Registry, layer: EntityId) {
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let mut pending = vec![Pending::Visit(layer)];
    while let Some(next) = pending.pop() {
        match next {
            Pending::Release(entity) => {
                registry.destroy(entity);
            }
            Pending::Visit(entity) => {
                pending.push(Pending::Release(entity));
                match &registry.get::<Layer>(entity).kind {
                    LayerKind::Group(group) => {
                        pending.extend(group.layers.iter().rev().map(|&child| Pending::Visit(child)));
                    }
                    LayerKind::Object(objects) => {
                        pending.extend(objects.objects.iter().map(|&object| Pending::Release(object)));
                    }
                    LayerKind::Tile(_) => {}
                }
            }
        }
    }
}

/// 只拷贝图层实体本身，子图层和对象列表留空
fn copy_layer_entity(registry: &mut Registry, source: EntityId) -> EntityId {
    let meta = registry.get::<Meta>(source).clone();
    let mut layer = registry.get::<Layer>(source).clone();
    match &mut layer.kind {
        LayerKind::Group(group) => group.layers.clear(),
        LayerKind::Object(objects) => objects.objects.clear(),
        LayerKind::Tile(_) => {}
    }

    let entity = registry.create();
    registry.attach(entity, meta);
    registry.attach(entity, layer);
    entity
}

/// 深拷贝图层，返回新的游离图层
///
/// 子图层和对象都拷贝为新实体，持久ID和对象ID原样保留。
/// 与 [`destroy_layer`] 一样使用显式工作列表，不受层级深度限制。
pub fn copy_layer(registry: &mut Registry, layer: EntityId) -> EntityId {
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let copy = copy_layer_entity(registry, layer);
    let mut pending = vec![(layer, copy)];

    while let Some((source, target)) = pending.pop() {
        let (children, objects) = match &registry.get::<Layer>(source).kind {
            LayerKind::Group(group) => (group.layers.clone(), Vec::new()),
            LayerKind::Object(objects) => (Vec::new(), objects.objects.clone()),
            LayerKind::Tile(_) => continue,
        };

        if is_group_layer(registry, target) {
            let copies: Vec<EntityId> = children
                .iter()
                .map(|&child| copy_layer_entity(registry, child))
                .collect();
            pending.extend(children.into_iter().zip(copies.iter().copied()));
            group_layer_mut(registry, target).layers = copies;
        } else {
            let copies = objects
                .into_iter()
                .map(|object| object::copy_object(registry, object))
                .collect();
            object_layer_mut(registry, target).objects = copies;
        }
    }

    copy
}
