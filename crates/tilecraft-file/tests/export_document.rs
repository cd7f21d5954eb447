use anyhow::Result;
use std::path::PathBuf;
use tilecraft_core::layer::group_layer;
use tilecraft_core::prelude::*;
use tilecraft_core::texture::{HeadlessRenderer, TextureHandle};
use tilecraft_file::{accept, detect_format, encode_tile_layer, export_ir, DocumentVisitor, FileError, TileData};

/// 统计各类实体数量
#[derive(Default)]
struct Counter {
    tilesets: usize,
    tiles: usize,
    layers: usize,
}

impl DocumentVisitor for Counter {
    type Error = FileError;

    fn visit_tileset(&mut self, _registry: &Registry, _tileset: EntityId) -> Result<(), FileError> {
        self.tilesets += 1;
        Ok(())
    }

    fn visit_tile(&mut self, _registry: &Registry, _tile: EntityId) -> Result<(), FileError> {
        self.tiles += 1;
        Ok(())
    }

    fn visit_layer(&mut self, _registry: &Registry, _layer: EntityId) -> Result<(), FileError> {
        self.layers += 1;
        Ok(())
    }
}

fn edited_document() -> Result<Document> {
    let spec = MapSpec {
        orientation: TileOrientation::Orthogonal,
        extent: Extent2D::new(3, 3),
        tile_size: Int2::new(8, 8),
    };
    let mut document = Document::new(&spec)?;
    let mut history = CommandStack::default();

    let tileset = TilesetSpec {
        tile_size: Int2::new(8, 8),
        texture: Texture {
            handle: TextureHandle(3),
            size: Int2::new(24, 8),
            path: PathBuf::from("dungeon.png"),
        },
    };
    let command = Box::new(AddTilesetCommand::new(&document, tileset)?);
    history.push(&mut document, command);
    let command = Box::new(CreateLayerCommand::new(&document, LayerType::Group));
    history.push(&mut document, command);
    let command = Box::new(CreateLayerCommand::new(&document, LayerType::Tile));
    history.push(&mut document, command);

    let layer = document.map().active_layer.expect("new layer is active");
    let command = Box::new(FloodFillCommand::new(&document, layer, Index2D::new(0, 0), 2));
    history.push(&mut document, command);

    document.set_path("levels/dungeon.tmj");
    Ok(document)
}

#[test]
fn test_export_edited_document() -> Result<()> {
    let document = edited_document()?;

    let mut counter = Counter::default();
    accept(&document, &mut counter)?;
    assert_eq!((counter.tilesets, counter.tiles, counter.layers), (1, 3, 2));

    let ir_map = export_ir(&document)?;
    assert_eq!(ir_map.layers.len(), 1);
    assert_eq!(ir_map.layers[0].layers[0].tiles, vec![vec![2; 3]; 3]);

    let format = detect_format(document.path().expect("path was set"))?;
    assert_eq!(format, SaveFormat::TiledJson);

    let layer = document.map().active_layer.expect("active layer");
    assert_eq!(encode_tile_layer(&document, format, layer), TileData::Rows(vec![vec![2; 3]; 3]));

    let mut renderer = HeadlessRenderer::new().with_texture("dungeon.png", Int2::new(24, 8));
    let reloaded = Document::from_ir(&mut renderer, &ir_map)?;
    assert_eq!(export_ir(&reloaded)?, ir_map);

    Ok(())
}

#[test]
fn test_export_duplicated_layer_with_components() -> Result<()> {
    let mut document = edited_document()?;
    let mut history = CommandStack::default();
    let root = document.root_layer();
    let group = group_layer(document.registry(), root).layers[0];

    let command = Box::new(DefineComponentCommand::new(&document, "biome")?);

    history.push(&mut document, command);
    let command = Box::new(CreateComponentAttributeCommand::new(&document, "biome", "humidity")?);
    history.push(&mut document, command);
    let command = Box::new(AttachComponentCommand::new(&document, group, "biome")?);
    history.push(&mut document, command);
    let command = Box::new(UpdateAttachedComponentCommand::new(&document, group, "biome", "humidity", Attribute::Float(0.8))?);
    history.push(&mut document, command);
    let command = Box::new(DuplicateLayerCommand::new(&document, group)?);
    history.push(&mut document, command);

    let ir_map = export_ir(&document)?;
    assert_eq!(ir_map.components.len(), 1);
    assert_eq!(ir_map.layers.len(), 2);
    assert_eq!(ir_map.next_layer_id, 5);

    let copy = &ir_map.layers[1];
    assert_eq!(copy.meta.name, "Group Layer 1 (Copy)");
    assert_eq!((copy.id, copy.layers[0].id), (3, 4));
    assert_eq!(copy.layers[0].tiles, vec![vec![2; 3]; 3]);
    assert_eq!(copy.meta.components[0].attributes[0].value, Attribute::Float(0.8));

    let mut renderer = HeadlessRenderer::new().with_texture("dungeon.png", Int2::new(24, 8));
    let reloaded = Document::from_ir(&mut renderer, &ir_map)?;
    assert_eq!(export_ir(&reloaded)?, ir_map);

    Ok(())
}
