//! 保存格式选择与瓦片数据编码

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tilecraft_core::document::{Document, SaveFormat};
use tilecraft_core::entity::EntityId;
use tilecraft_core::layer::{is_tile_layer, serialize_tile_layer, Layer, LayerKind, TileId, TileLayer};
use tilecraft_core::map::{TileEncoding, TileFormat};
use tracing::{debug, warn};

/// 根据文件扩展名确定保存格式
pub fn detect_format(path: impl AsRef<Path>) -> Result<SaveFormat, FileError> {
    let path = path.as_ref();
    SaveFormat::from_path(path)
        .ok_or_else(|| FileError::InvalidFormat(format!("Unknown file extension: {}", path.display())))
}

/// 文档的保存目标：路径加格式
///
/// 优先使用文档上显式设置的格式，否则按路径扩展名推断。
pub fn save_target(document: &Document) -> Result<(PathBuf, SaveFormat), FileError> {
    let path = document
        .path()
        .ok_or_else(|| FileError::InvalidFormat("No file path specified".to_string()))?;

    let format = match document.format() {
        Some(format) => format,
        None => detect_format(path)?,
    };

    Ok((path.to_path_buf(), format))
}

/// 编码后的瓦片图层数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileData {
    /// 按行排列的瓦片ID
    Rows(Vec<Vec<TileId>>),
    /// 小端序 i32 序列，由具体格式再做 base64 和压缩
    Binary(Vec<u8>),
}

pub(crate) fn tile_rows(tiles: &TileLayer) -> Vec<Vec<TileId>> {
    let extent = tiles.extent();
    let mut rows = vec![Vec::with_capacity(extent.cols); extent.rows];
    for (index, id) in tiles.tiles() {
        rows[index.row].push(id);
    }
    rows
}

/// 按文档的瓦片编码偏好和保存格式编码一个瓦片图层
///
/// 格式不支持二进制块时退回按行输出。
pub fn encode_tile_layer(document: &Document, format: SaveFormat, layer: EntityId) -> TileData {
    let registry = document.registry();
    assert!(is_tile_layer(registry, layer), "entity {layer} is not a tile layer");

    let tile_format = registry.get::<TileFormat>(document.map_entity());
    if tile_format.encoding == TileEncoding::Base64 {
        if format.supports_binary_tiles() {
            debug!("Encoding tile layer {} as binary for {:?}", layer, format);
            return TileData::Binary(serialize_tile_layer(registry, layer));
        }
        warn!("{:?} does not support binary tile data, writing rows", format);
    }

    match &registry.get::<Layer>(layer).kind {
        LayerKind::Tile(tiles) => TileData::Rows(tile_rows(tiles)),
        _ => TileData::Rows(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecraft_core::layer::{set_layer_tile, LayerType};
    use tilecraft_core::map::{add_layer_to_map, MapSpec, TileOrientation};
    use tilecraft_core::math::{Extent2D, Index2D, Int2};

    fn document() -> (Document, EntityId) {
        let spec = MapSpec {
            orientation: TileOrientation::Orthogonal,
            extent: Extent2D::new(2, 2),
            tile_size: Int2::new(16, 16),
        };
        let mut document = Document::new(&spec).unwrap();
        let map = document.map_entity();
        let registry = document.registry_mut();
        let layer = add_layer_to_map(registry, map, LayerType::Tile);
        set_layer_tile(registry, layer, Index2D::new(0, 1), 7);
        (document, layer)
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("maps/forest.TMJ").unwrap(), SaveFormat::TiledJson);
        assert_eq!(detect_format("maps/forest.yml").unwrap(), SaveFormat::Yaml);
        assert!(matches!(detect_format("maps/forest.png"), Err(FileError::InvalidFormat(_))));
        assert!(detect_format("maps/forest").is_err());
    }

    #[test]
    fn test_save_target() {
        let (mut document, _) = document();
        assert!(save_target(&document).is_err());

        document.set_path("out/level.tmx");
        assert_eq!(save_target(&document).unwrap(), (PathBuf::from("out/level.tmx"), SaveFormat::TiledXml));

        document.set_format(SaveFormat::GodotScene);
        assert_eq!(save_target(&document).unwrap().1, SaveFormat::GodotScene);
    }

    #[test]
    fn test_encode_tile_layer() {
        let (mut document, layer) = document();
        assert_eq!(
            encode_tile_layer(&document, SaveFormat::TiledJson, layer),
            TileData::Rows(vec![vec![0, 7], vec![0, 0]])
        );

        let map = document.map_entity();
        document.registry_mut().get_mut::<TileFormat>(map).encoding = TileEncoding::Base64;

        let binary = encode_tile_layer(&document, SaveFormat::TiledXml, layer);
        assert_eq!(binary, TileData::Binary(serialize_tile_layer(document.registry(), layer)));

        assert_eq!(
            encode_tile_layer(&document, SaveFormat::GodotScene, layer),
            TileData::Rows(vec![vec![0, 7], vec![0, 0]])
        );
    }
}
