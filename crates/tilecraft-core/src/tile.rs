//! 瓦片与动画
//!
//! 瓦片实体属于某个瓦片集，记录自己在瓦片集中的本地索引，
//! 可以内嵌对象，也可以带有一个可选的 [`Animation`] 组件。
//!
//! 动画是一个纯时间驱动的状态机：每一帧是一个状态，
//! 当前帧持续时间耗尽后前进到下一帧，最后一帧之后回到第 0 帧。

use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::layer::object::{copy_object, destroy_object};
use crate::meta::Meta;
use crate::registry::Registry;
use std::time::{Duration, Instant};

/// 瓦片在瓦片集中的本地索引
pub type TileIndex = i32;

/// 瓦片组件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tile {
    pub index: TileIndex,
    /// 内嵌的对象实体
    pub objects: Vec<EntityId>,
}

/// 动画帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    pub tile_index: TileIndex,
    pub duration: Duration,
}

impl AnimationFrame {
    pub fn new(tile_index: TileIndex, duration: Duration) -> Self {
        Self { tile_index, duration }
    }
}

/// 动画组件
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    /// 非空的帧序列
    pub frames: Vec<AnimationFrame>,
    pub frame_index: usize,
    pub last_update: Instant,
}

impl Animation {
    pub fn new(frames: Vec<AnimationFrame>) -> Self {
        Self {
            frames,
            frame_index: 0,
            last_update: Instant::now(),
        }
    }

    pub fn current_frame(&self) -> &AnimationFrame {
        &self.frames[self.frame_index]
    }

    /// 当前帧持续时间耗尽时前进一帧
    pub fn update(&mut self, now: Instant) {
        if self.frames.is_empty() {
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed >= self.current_frame().duration {
            self.frame_index = (self.frame_index + 1) % self.frames.len();
            self.last_update = now;
        }
    }
}

pub fn is_tile(registry: &Registry, entity: EntityId) -> bool {
    registry.has::<Meta>(entity) && registry.has::<Tile>(entity)
}

pub fn make_tile(registry: &mut Registry, index: TileIndex) -> EntityId {
    let entity = registry.create();
    registry.attach(entity, Meta::default());
    registry.attach(
        entity,
        Tile {
            index,
            objects: Vec::new(),
        },
    );
    entity
}

/// 销毁瓦片及其内嵌对象
pub fn destroy_tile(registry: &mut Registry, tile: EntityId) {
    assert!(is_tile(registry, tile), "entity {tile} is not a tile");

    let objects = std::mem::take(&mut registry.get_mut::<Tile>(tile).objects);
    for object in objects {
        destroy_object(registry, object);
    }

    registry.destroy(tile);
}

/// 深拷贝瓦片，包括内嵌对象和动画
pub fn copy_tile(registry: &mut Registry, tile: EntityId) -> EntityId {
    assert!(is_tile(registry, tile), "entity {tile} is not a tile");

    let meta = registry.get::<Meta>(tile).clone();
    let source = registry.get::<Tile>(tile).clone();
    let animation = registry.find::<Animation>(tile).cloned();

    let objects = source
        .objects
        .iter()
        .map(|&object| copy_object(registry, object))
        .collect();

    let entity = registry.create();
    registry.attach(entity, meta);
    registry.attach(
        entity,
        Tile {
            index: source.index,
            objects,
        },
    );
    if let Some(animation) = animation {
        registry.attach(entity, animation);
    }

    entity
}

/// 在指定位置插入动画帧
///
/// 瓦片还没有动画时会创建 [`Animation`] 组件。`position` 大于帧数时返回错误。
pub fn add_animation_frame(
    registry: &mut Registry,
    tile: EntityId,
    position: usize,
    frame: AnimationFrame,
) -> Result<()> {
    assert!(is_tile(registry, tile), "entity {tile} is not a tile");

    match registry.find_mut::<Animation>(tile) {
        Some(animation) => {
            if position > animation.frames.len() {
                return Err(CoreError::AnimationFrameOutOfBounds {
                    index: position,
                    len: animation.frames.len(),
                });
            }
            animation.frames.insert(position, frame);
        }
        None => {
            if position != 0 {
                return Err(CoreError::AnimationFrameOutOfBounds { index: position, len: 0 });
            }
            registry.attach(tile, Animation::new(vec![frame]));
        }
    }

    Ok(())
}

/// 移除动画帧并返回它
///
/// 当前帧保持不变；移除的正是当前帧时改为显示其后一帧。
/// 移除最后一帧时同时移除 [`Animation`] 组件。
pub fn remove_animation_frame(registry: &mut Registry, tile: EntityId, position: usize) -> Result<AnimationFrame> {
    assert!(is_tile(registry, tile), "entity {tile} is not a tile");

    let animation = registry
        .find_mut::<Animation>(tile)
        .ok_or(CoreError::AnimationFrameOutOfBounds { index: position, len: 0 })?;

    if position >= animation.frames.len() {
        return Err(CoreError::AnimationFrameOutOfBounds {
            index: position,
            len: animation.frames.len(),
        });
    }

    let frame = animation.frames.remove(position);
    if animation.frames.is_empty() {
        registry.detach::<Animation>(tile);
    } else if position < animation.frame_index {
        animation.frame_index -= 1;
    } else if animation.frame_index >= animation.frames.len() {
        animation.frame_index = 0;
    }

    Ok(frame)
}

/// 推进所有动画
pub fn update_animations(registry: &mut Registry, now: Instant) {
    for (_, animation) in registry.each_mut::<Animation>() {
        animation.update(now);
    }
}
