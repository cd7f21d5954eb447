//! 瓦片动画命令
//!
//! 撤销时整体恢复执行前的 [`Animation`] 组件（包括"没有动画"的状态）。

use crate::command::{check_document, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::registry::Registry;
use crate::tile::{add_animation_frame, is_tile, remove_animation_frame, Animation, AnimationFrame};
use std::any::Any;
use uuid::Uuid;

fn frame_count(registry: &Registry, tile: EntityId) -> usize {
    registry.find::<Animation>(tile).map_or(0, |animation| animation.frames.len())
}

fn restore_animation(registry: &mut Registry, tile: EntityId, animation: Option<Animation>) {
    match animation {
        Some(animation) => {
            registry.attach(tile, animation);
        }
        None => {
            registry.detach::<Animation>(tile);
        }
    }
}

#[derive(Debug)]
pub struct AddAnimationFrameCommand {
    document_id: Uuid,
    tile: EntityId,
    position: usize,
    frame: AnimationFrame,
    previous: Option<Option<Animation>>,
}

impl AddAnimationFrameCommand {
    pub fn new(document: &Document, tile: EntityId, position: usize, frame: AnimationFrame) -> Result<Self> {
        let registry = document.registry();
        assert!(is_tile(registry, tile), "entity {tile} is not a tile");

        let len = frame_count(registry, tile);
        if position > len {
            return Err(CoreError::AnimationFrameOutOfBounds { index: position, len });
        }

        Ok(Self {
            document_id: document.uuid(),
            tile,
            position,
            frame,
            previous: None,
        })
    }
}

impl Command for AddAnimationFrameCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddAnimationFrame
    }

    fn text(&self) -> &str {
        "Add Animation Frame"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let registry = document.registry_mut();
        self.previous = Some(registry.find::<Animation>(self.tile).cloned());
        add_animation_frame(registry, self.tile, self.position, self.frame)
            .unwrap_or_else(|err| panic!("animation frame validated at creation was rejected: {err}"));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous.take() {
            restore_animation(document.registry_mut(), self.tile, previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemoveAnimationFrameCommand {
    document_id: Uuid,
    tile: EntityId,
    position: usize,
    previous: Option<Option<Animation>>,
}

impl RemoveAnimationFrameCommand {
    pub fn new(document: &Document, tile: EntityId, position: usize) -> Result<Self> {
        let registry = document.registry();
        assert!(is_tile(registry, tile), "entity {tile} is not a tile");

        let len = frame_count(registry, tile);
        if position >= len {
            return Err(CoreError::AnimationFrameOutOfBounds { index: position, len });
        }

        Ok(Self {
            document_id: document.uuid(),
            tile,
            position,
            previous: None,
        })
    }
}

impl Command for RemoveAnimationFrameCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveAnimationFrame
    }

    fn text(&self) -> &str {
        "Remove Animation Frame"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let registry = document.registry_mut();
        self.previous = Some(registry.find::<Animation>(self.tile).cloned());
        remove_animation_frame(registry, self.tile, self.position)
            .unwrap_or_else(|err| panic!("animation frame validated at creation was rejected: {err}"));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous.take() {
            restore_animation(document.registry_mut(), self.tile, previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_document;
    use crate::history::CommandStack;
    use crate::math::Int2;
    use crate::texture::{Texture, TextureHandle};
    use crate::tileset::{Tileset, TilesetSpec};
    use crate::map::add_tileset_to_map;
    use std::path::PathBuf;
    use std::time::Duration;

    fn tile_document() -> (Document, EntityId) {
        let mut document = test_document();
        let map = document.map_entity();
        let spec = TilesetSpec {
            tile_size: Int2::new(8, 8),
            texture: Texture {
                handle: TextureHandle(1),
                size: Int2::new(16, 16),
                path: PathBuf::from("water.png"),
            },
        };

        let (registry, cache) = document.parts_mut();
        let tileset = add_tileset_to_map(registry, cache, map, &spec).unwrap();
        let tile = registry.get::<Tileset>(tileset).tiles[0];
        (document, tile)
    }

    #[test]
    fn test_add_animation_frames() {
        let (mut document, tile) = tile_document();
        let mut stack = CommandStack::default();
        let frame = AnimationFrame::new(1, Duration::from_millis(100));

        assert!(AddAnimationFrameCommand::new(&document, tile, 1, frame).is_err());

        let command = Box::new(AddAnimationFrameCommand::new(&document, tile, 0, frame).unwrap());
        stack.push(&mut document, command);
        let command = Box::new(AddAnimationFrameCommand::new(&document, tile, 1, frame).unwrap());
        stack.push(&mut document, command);
        assert_eq!(frame_count(document.registry(), tile), 2);

        stack.undo(&mut document);
        assert_eq!(frame_count(document.registry(), tile), 1);

        stack.undo(&mut document);
        assert!(!document.registry().has::<Animation>(tile));

        stack.redo(&mut document);
        stack.redo(&mut document);
        assert_eq!(frame_count(document.registry(), tile), 2);
    }

    #[test]
    fn test_remove_animation_frame() {
        let (mut document, tile) = tile_document();
        let mut stack = CommandStack::default();
        let frame = AnimationFrame::new(2, Duration::from_millis(50));
        add_animation_frame(document.registry_mut(), tile, 0, frame).unwrap();

        assert_eq!(
            RemoveAnimationFrameCommand::new(&document, tile, 1).unwrap_err(),
            CoreError::AnimationFrameOutOfBounds { index: 1, len: 1 }
        );

        let command = Box::new(RemoveAnimationFrameCommand::new(&document, tile, 0).unwrap());
        stack.push(&mut document, command);
        assert!(!document.registry().has::<Animation>(tile));

        stack.undo(&mut document);
        assert_eq!(document.registry().get::<Animation>(tile).frames, vec![frame]);
    }
}
