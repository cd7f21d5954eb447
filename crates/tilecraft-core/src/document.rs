//! 文档
//!
//! 文档拥有注册表、瓦片缓存和地图实体，是命令操作的对象。
//! 每个文档有一个唯一的 UUID，命令用它确认自己作用在正确的文档上。

use crate::entity::EntityId;
use crate::error::Result;
use crate::ir;
use crate::map::{destroy_map, make_map, make_map_from_ir, Map, MapSpec};
use crate::registry::Registry;
use crate::texture::Renderer;
use crate::tileset::TileCache;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// 存档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaveFormat {
    Yaml,
    TiledJson,
    TiledXml,
    GodotScene,
}

impl SaveFormat {
    /// 根据文件扩展名推断格式（不区分大小写）
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "tmj" | "json" => Some(Self::TiledJson),
            "tmx" | "xml" => Some(Self::TiledXml),
            "tscn" => Some(Self::GodotScene),
            _ => None,
        }
    }

    /// 首选扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::TiledJson => "tmj",
            Self::TiledXml => "tmx",
            Self::GodotScene => "tscn",
        }
    }

    /// 是否能以编码后的二进制块保存瓦片数据
    pub fn supports_binary_tiles(&self) -> bool {
        !matches!(self, Self::GodotScene)
    }
}

/// 地图文档
#[derive(Debug)]
pub struct Document {
    uuid: Uuid,
    registry: Registry,
    tile_cache: TileCache,
    map: EntityId,
    path: Option<PathBuf>,
    format: Option<SaveFormat>,
}

impl Document {
    /// 创建空地图文档
    pub fn new(spec: &MapSpec) -> Result<Self> {
        let mut registry = Registry::new();
        let map = make_map(&mut registry, spec)?;
        Ok(Self::with_parts(registry, TileCache::new(), map))
    }

    /// 从中间表示创建文档
    pub fn from_ir(renderer: &mut dyn Renderer, ir_map: &ir::Map) -> Result<Self> {
        let mut registry = Registry::new();
        let mut tile_cache = TileCache::new();
        let map = make_map_from_ir(&mut registry, &mut tile_cache, renderer, ir_map)?;
        Ok(Self::with_parts(registry, tile_cache, map))
    }

    fn with_parts(registry: Registry, tile_cache: TileCache, map: EntityId) -> Self {
        let uuid = Uuid::new_v4();
        debug!("Created document {}", uuid);
        Self {
            uuid,
            registry,
            tile_cache,
            map,
            path: None,
            format: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tile_cache
    }

    /// 同时借出注册表和瓦片缓存
    pub fn parts_mut(&mut self) -> (&mut Registry, &mut TileCache) {
        (&mut self.registry, &mut self.tile_cache)
    }

    pub fn map_entity(&self) -> EntityId {
        self.map
    }

    pub fn map(&self) -> &Map {
        self.registry.get::<Map>(self.map)
    }

    pub fn root_layer(&self) -> EntityId {
        self.map().root_layer
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn format(&self) -> Option<SaveFormat> {
        self.format
    }

    /// 设置文档路径，尚未选择格式时按扩展名推断
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.format.is_none() {
            self.format = SaveFormat::from_path(&path);
        }
        self.path = Some(path);
    }

    pub fn set_format(&mut self, format: SaveFormat) {
        self.format = Some(format);
    }

    /// 销毁地图及其全部实体，返回空的注册表
    pub fn close(mut self) -> Registry {
        destroy_map(&mut self.registry, &mut self.tile_cache, self.map);
        debug!("Closed document {}", self.uuid);
        self.registry
    }
}
