//! 组图层与层级算法
//!
//! 所有函数都以一个根组图层为起点，假定传入的实体是合法的图层，
//! 不合法时直接 panic。

use super::{destroy_layer, group_layer, group_layer_mut, is_group_layer, is_layer, make_layer_entity, LayerKind};
use crate::entity::EntityId;
use crate::registry::Registry;

/// 组图层数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupLayer {
    /// 有序的子图层
    pub layers: Vec<EntityId>,
}

pub fn make_group_layer(registry: &mut Registry) -> EntityId {
    make_layer_entity(registry, LayerKind::Group(GroupLayer::default()))
}

/// 递归销毁组图层及其所有子图层
pub fn destroy_group_layer(registry: &mut Registry, group: EntityId) {
    assert!(is_group_layer(registry, group), "entity {group} is not a group layer");
    destroy_layer(registry, group);
}

/// 查找目标图层的直接父组图层
pub fn find_parent_layer(registry: &Registry, root: EntityId, target: EntityId) -> Option<EntityId> {
    assert!(is_group_layer(registry, root), "entity {root} is not a group layer");

    let mut pending = vec![root];
    while let Some(group) = pending.pop() {
        let children = &group_layer(registry, group).layers;
        if children.contains(&target) {
            return Some(group);
        }

        pending.extend(
            children
                .iter()
                .rev()
                .copied()
                .filter(|&child| is_group_layer(registry, child)),
        );
    }

    None
}

/// 按先序遍历收集根之下的所有图层（不含根）
pub fn collect_layers(registry: &Registry, root: EntityId) -> Vec<EntityId> {
    let mut layers = Vec::new();
    let mut pending: Vec<EntityId> = group_layer(registry, root).layers.iter().rev().copied().collect();

    while let Some(layer) = pending.pop() {
        layers.push(layer);
        if is_group_layer(registry, layer) {
            pending.extend(group_layer(registry, layer).layers.iter().rev().copied());
        }
    }

    layers
}

/// 图层在其父组图层中的位置
pub fn get_local_layer_index(registry: &Registry, root: EntityId, target: EntityId) -> Option<usize> {
    let parent = find_parent_layer(registry, root, target)?;
    group_layer(registry, parent)
        .layers
        .iter()
        .position(|&layer| layer == target)
}

/// 图层在整棵树先序遍历中的排名
pub fn get_global_layer_index(registry: &Registry, root: EntityId, target: EntityId) -> Option<usize> {
    collect_layers(registry, root)
        .iter()
        .position(|&layer| layer == target)
}

/// 根之下的图层总数（不含根）
pub fn count_layers(registry: &Registry, root: EntityId) -> usize {
    collect_layers(registry, root).len()
}

pub fn can_move_layer_up(registry: &Registry, root: EntityId, layer: EntityId) -> bool {
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");
    get_local_layer_index(registry, root, layer).is_some_and(|index| index > 0)
}

pub fn can_move_layer_down(registry: &Registry, root: EntityId, layer: EntityId) -> bool {
    assert!(is_layer(registry, layer), "entity {layer} is not a layer");

    let Some(parent) = find_parent_layer(registry, root, layer) else {
        return false;
    };

    let siblings = &group_layer(registry, parent).layers;
    siblings
        .iter()
        .position(|&sibling| sibling == layer)
        .is_some_and(|index| index + 1 < siblings.len())
}

/// 与前一个兄弟图层交换位置
///
/// # Panics
///
/// 图层已经是第一个时 panic，调用前应先检查 [`can_move_layer_up`]。
pub fn move_layer_up(registry: &mut Registry, root: EntityId, layer: EntityId) {
    assert!(can_move_layer_up(registry, root, layer), "cannot move layer {layer} up");

    let (parent, index) = locate_layer(registry, root, layer);
    group_layer_mut(registry, parent).layers.swap(index, index - 1);
}

/// 与后一个兄弟图层交换位置
///
/// # Panics
///
/// 图层已经是最后一个时 panic，调用前应先检查 [`can_move_layer_down`]。
pub fn move_layer_down(registry: &mut Registry, root: EntityId, layer: EntityId) {
    assert!(can_move_layer_down(registry, root, layer), "cannot move layer {layer} down");

    let (parent, index) = locate_layer(registry, root, layer);
    group_layer_mut(registry, parent).layers.swap(index, index + 1);
}

/// 将图层插入组图层的指定位置（超出末尾时追加）
pub fn insert_layer(registry: &mut Registry, group: EntityId, index: usize, layer: EntityId) {
    let layers = &mut group_layer_mut(registry, group).layers;
    let index = index.min(layers.len());
    layers.insert(index, layer);
}

/// 把图层从其父组图层中取出，返回原父图层和位置
pub(crate) fn detach_layer(registry: &mut Registry, root: EntityId, layer: EntityId) -> Option<(EntityId, usize)> {
    let parent = find_parent_layer(registry, root, layer)?;
    let layers = &mut group_layer_mut(registry, parent).layers;
    let index = layers.iter().position(|&child| child == layer)?;
    layers.remove(index);
    Some((parent, index))
}

fn locate_layer(registry: &Registry, root: EntityId, layer: EntityId) -> (EntityId, usize) {
    let parent = find_parent_layer(registry, root, layer)
        .unwrap_or_else(|| panic!("layer {layer} is not part of the hierarchy"));
    let index = group_layer(registry, parent)
        .layers
        .iter()
        .position(|&child| child == layer)
        .unwrap_or_else(|| panic!("layer {layer} is not part of the hierarchy"));
    (parent, index)
}
