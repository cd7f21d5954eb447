//! 瓦片图层存储
//!
//! 同一份 (行, 列) → 瓦片ID 映射有两种表示：
//! - 稠密：按行存储的矩阵，尺寸恰好等于范围，O(1) 读写
//! - 稀疏：只保存非空单元格的哈希表，内存与已占用单元格数成正比
//!
//! 两种表示可以无损互相转换。越界读取返回 `None`，越界写入被静默忽略。

use super::{make_layer_entity, tile_layer, tile_layer_mut, LayerKind};
use crate::entity::EntityId;
use crate::math::{Extent2D, Index2D};
use crate::registry::Registry;
use std::collections::{HashMap, HashSet, VecDeque};

/// 全局瓦片ID
pub type TileId = i32;

/// 空瓦片
pub const EMPTY_TILE: TileId = 0;

/// 稠密瓦片矩阵
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseTileMatrix {
    extent: Extent2D,
    rows: Vec<Vec<TileId>>,
}

impl DenseTileMatrix {
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent,
            rows: vec![vec![EMPTY_TILE; extent.cols]; extent.rows],
        }
    }

    /// 由按行排列的瓦片ID构建，多余的部分丢弃，缺失的部分填充空瓦片
    pub fn from_rows(extent: Extent2D, rows: &[Vec<TileId>]) -> Self {
        let mut matrix = Self::new(extent);
        for (row, ids) in matrix.rows.iter_mut().zip(rows) {
            for (cell, &id) in row.iter_mut().zip(ids) {
                *cell = id;
            }
        }
        matrix
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn rows(&self) -> &[Vec<TileId>] {
        &self.rows
    }

    pub fn get(&self, index: Index2D) -> Option<TileId> {
        self.rows.get(index.row)?.get(index.col).copied()
    }

    /// 写入瓦片，越界时返回 `false`
    pub fn set(&mut self, index: Index2D, id: TileId) -> bool {
        match self.rows.get_mut(index.row).and_then(|row| row.get_mut(index.col)) {
            Some(cell) => {
                *cell = id;
                true
            }
            None => false,
        }
    }

    /// 先调整每一行的列数，再调整行数，新单元格填充空瓦片
    pub fn resize(&mut self, extent: Extent2D) {
        for row in &mut self.rows {
            row.resize(extent.cols, EMPTY_TILE);
        }
        self.rows.resize(extent.rows, vec![EMPTY_TILE; extent.cols]);
        self.extent = extent;
    }
}

/// 稀疏瓦片矩阵
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseTileMatrix {
    extent: Extent2D,
    tiles: HashMap<Index2D, TileId>,
}

impl SparseTileMatrix {
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent,
            tiles: HashMap::new(),
        }
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn get(&self, index: Index2D) -> Option<TileId> {
        if !self.extent.contains(index) {
            return None;
        }
        Some(self.tiles.get(&index).copied().unwrap_or(EMPTY_TILE))
    }

    /// 写入瓦片，写入空瓦片会删除该条目；越界时返回 `false`
    pub fn set(&mut self, index: Index2D, id: TileId) -> bool {
        if !self.extent.contains(index) {
            return false;
        }

        if id == EMPTY_TILE {
            self.tiles.remove(&index);
        } else {
            self.tiles.insert(index, id);
        }
        true
    }

    /// 丢弃新范围之外的条目
    pub fn resize(&mut self, extent: Extent2D) {
        self.tiles.retain(|index, _| extent.contains(*index));
        self.extent = extent;
    }

    /// 非空单元格数量
    pub fn occupied(&self) -> usize {
        self.tiles.len()
    }
}

/// 瓦片存储表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileStorageKind {
    Dense,
    Sparse,
}

/// 瓦片存储，任意时刻恰好是两种表示之一
#[derive(Debug, Clone, PartialEq)]
pub enum TileStorage {
    Dense(DenseTileMatrix),
    Sparse(SparseTileMatrix),
}

impl TileStorage {
    pub fn kind(&self) -> TileStorageKind {
        match self {
            TileStorage::Dense(_) => TileStorageKind::Dense,
            TileStorage::Sparse(_) => TileStorageKind::Sparse,
        }
    }

    pub fn extent(&self) -> Extent2D {
        match self {
            TileStorage::Dense(matrix) => matrix.extent(),
            TileStorage::Sparse(matrix) => matrix.extent(),
        }
    }

    pub fn get(&self, index: Index2D) -> Option<TileId> {
        match self {
            TileStorage::Dense(matrix) => matrix.get(index),
            TileStorage::Sparse(matrix) => matrix.get(index),
        }
    }

    pub fn set(&mut self, index: Index2D, id: TileId) -> bool {
        match self {
            TileStorage::Dense(matrix) => matrix.set(index, id),
            TileStorage::Sparse(matrix) => matrix.set(index, id),
        }
    }

    pub fn resize(&mut self, extent: Extent2D) {
        match self {
            TileStorage::Dense(matrix) => matrix.resize(extent),
            TileStorage::Sparse(matrix) => matrix.resize(extent),
        }
    }
}

/// 瓦片图层数据
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    tiles: TileStorage,
}

impl TileLayer {
    pub fn new(tiles: TileStorage) -> Self {
        Self { tiles }
    }

    /// 创建空的稠密瓦片图层
    pub fn dense(extent: Extent2D) -> Self {
        Self::new(TileStorage::Dense(DenseTileMatrix::new(extent)))
    }

    pub fn storage(&self) -> &TileStorage {
        &self.tiles
    }

    pub fn extent(&self) -> Extent2D {
        self.tiles.extent()
    }

    pub fn get(&self, index: Index2D) -> Option<TileId> {
        self.tiles.get(index)
    }

    pub fn set(&mut self, index: Index2D, id: TileId) -> bool {
        self.tiles.set(index, id)
    }

    pub fn resize(&mut self, extent: Extent2D) {
        self.tiles.resize(extent);
    }

    /// 按行优先顺序遍历所有单元格，与存储表示无关
    pub fn tiles(&self) -> impl Iterator<Item = (Index2D, TileId)> + '_ {
        self.tiles_in(Index2D::new(0, 0), Index2D::new(self.extent().rows, self.extent().cols))
    }

    /// 遍历 `[begin, end)` 矩形区域内的单元格，区域会被裁剪到图层范围
    pub fn tiles_in(&self, begin: Index2D, end: Index2D) -> impl Iterator<Item = (Index2D, TileId)> + '_ {
        let extent = self.extent();
        let end_row = end.row.min(extent.rows);
        let end_col = end.col.min(extent.cols);

        (begin.row..end_row)
            .flat_map(move |row| (begin.col..end_col).map(move |col| Index2D::new(row, col)))
            .map(move |index| (index, self.get(index).unwrap_or(EMPTY_TILE)))
    }

    /// 转换为稠密表示，已经是稠密表示时不做任何事
    pub fn convert_to_dense(&mut self) {
        if let TileStorage::Sparse(sparse) = &self.tiles {
            let mut dense = DenseTileMatrix::new(sparse.extent());
            for (index, id) in self.tiles() {
                dense.set(index, id);
            }
            self.tiles = TileStorage::Dense(dense);
        }
    }

    /// 转换为稀疏表示，已经是稀疏表示时不做任何事
    pub fn convert_to_sparse(&mut self) {
        if let TileStorage::Dense(dense) = &self.tiles {
            let mut sparse = SparseTileMatrix::new(dense.extent());
            for (index, id) in self.tiles() {
                sparse.set(index, id);
            }
            self.tiles = TileStorage::Sparse(sparse);
        }
    }

    pub fn convert_to(&mut self, kind: TileStorageKind) {
        match kind {
            TileStorageKind::Dense => self.convert_to_dense(),
            TileStorageKind::Sparse => self.convert_to_sparse(),
        }
    }

    /// 按行优先顺序输出小端字节序的瓦片ID
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.extent().area() * std::mem::size_of::<TileId>());
        for (_, id) in self.tiles() {
            bytes.extend_from_slice(&id.to_le_bytes());
        }
        bytes
    }

    /// 四连通洪水填充
    ///
    /// 把与起点瓦片ID相同的连通区域替换为 `replacement`，
    /// 返回每个被修改单元格及其原值。
    pub fn flood_fill(&mut self, origin: Index2D, replacement: TileId) -> Vec<(Index2D, TileId)> {
        let Some(target) = self.get(origin) else {
            return Vec::new();
        };
        if target == replacement {
            return Vec::new();
        }

        let mut changed = Vec::new();
        let mut visited = HashSet::from([origin]);
        let mut pending = VecDeque::from([origin]);

        while let Some(index) = pending.pop_front() {
            self.set(index, replacement);
            changed.push((index, target));

            for neighbor in index.neighbors() {
                if self.get(neighbor) == Some(target) && visited.insert(neighbor) {
                    pending.push_back(neighbor);
                }
            }
        }

        changed
    }
}

/// 创建稠密瓦片图层
pub fn make_tile_layer(registry: &mut Registry, extent: Extent2D) -> EntityId {
    make_layer_entity(registry, LayerKind::Tile(TileLayer::dense(extent)))
}

pub fn convert_to_dense_tile_layer(registry: &mut Registry, layer: EntityId) {
    tile_layer_mut(registry, layer).convert_to_dense();
}

pub fn convert_to_sparse_tile_layer(registry: &mut Registry, layer: EntityId) {
    tile_layer_mut(registry, layer).convert_to_sparse();
}

pub fn resize_tile_layer(registry: &mut Registry, layer: EntityId, extent: Extent2D) {
    tile_layer_mut(registry, layer).resize(extent);
}

/// 读取瓦片，越界时返回 `None`
pub fn get_layer_tile(registry: &Registry, layer: EntityId, index: Index2D) -> Option<TileId> {
    tile_layer(registry, layer).get(index)
}

/// 写入瓦片，越界写入被忽略
pub fn set_layer_tile(registry: &mut Registry, layer: EntityId, index: Index2D, id: TileId) {
    tile_layer_mut(registry, layer).set(index, id);
}

pub fn each_layer_tile<F>(registry: &Registry, layer: EntityId, mut f: F)
where
    F: FnMut(Index2D, TileId),
{
    for (index, id) in tile_layer(registry, layer).tiles() {
        f(index, id);
    }
}

/// 只遍历 `[begin, end)` 区域内的单元格
pub fn each_layer_tile_in<F>(registry: &Registry, layer: EntityId, begin: Index2D, end: Index2D, mut f: F)
where
    F: FnMut(Index2D, TileId),
{
    for (index, id) in tile_layer(registry, layer).tiles_in(begin, end) {
        f(index, id);
    }
}

pub fn serialize_tile_layer(registry: &Registry, layer: EntityId) -> Vec<u8> {
    tile_layer(registry, layer).serialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layer(kind: TileStorageKind) -> TileLayer {
        let mut layer = TileLayer::dense(Extent2D::new(4, 5));
        layer.set(Index2D::new(0, 0), 1);
        layer.set(Index2D::new(1, 3), 7);
        layer.set(Index2D::new(3, 4), 42);
        layer.convert_to(kind);
        layer
    }

    #[test]
    fn test_make_tile_layer_is_dense() {
        let mut registry = Registry::new();
        let layer = make_tile_layer(&mut registry, Extent2D::new(2, 3));

        let tiles = tile_layer(&registry, layer);
        assert_eq!(tiles.storage().kind(), TileStorageKind::Dense);
        assert_eq!(tiles.extent(), Extent2D::new(2, 3));
        assert!(tiles.tiles().all(|(_, id)| id == EMPTY_TILE));
    }

    #[test]
    fn test_conversion_round_trip() {
        let original = sample_layer(TileStorageKind::Dense);

        let mut layer = original.clone();
        layer.convert_to_sparse();
        assert_eq!(layer.storage().kind(), TileStorageKind::Sparse);
        if let TileStorage::Sparse(sparse) = layer.storage() {
            assert_eq!(sparse.occupied(), 3);
        }
        assert!(layer.tiles().eq(original.tiles()));

        layer.convert_to_dense();
        assert_eq!(layer, original);
    }

    #[test]
    fn test_conversion_is_noop_for_same_kind() {
        let mut layer = sample_layer(TileStorageKind::Sparse);
        let before = layer.clone();
        layer.convert_to_sparse();
        assert_eq!(layer, before);
    }

    #[test]
    fn test_out_of_bounds_access() {
        for kind in [TileStorageKind::Dense, TileStorageKind::Sparse] {
            let mut layer = sample_layer(kind);
            assert_eq!(layer.get(Index2D::new(4, 0)), None);
            assert_eq!(layer.get(Index2D::new(0, 5)), None);
            assert!(!layer.set(Index2D::new(10, 10), 3));
            assert_eq!(layer.get(Index2D::new(2, 2)), Some(EMPTY_TILE));
        }
    }

    #[test]
    fn test_sparse_erases_empty_tiles() {
        let mut sparse = SparseTileMatrix::new(Extent2D::new(2, 2));
        sparse.set(Index2D::new(1, 1), 5);
        assert_eq!(sparse.occupied(), 1);

        sparse.set(Index2D::new(1, 1), EMPTY_TILE);
        assert_eq!(sparse.occupied(), 0);
        assert_eq!(sparse.get(Index2D::new(1, 1)), Some(EMPTY_TILE));
    }

    #[test]
    fn test_resize_preserves_common_cells() {
        for kind in [TileStorageKind::Dense, TileStorageKind::Sparse] {
            let original = sample_layer(kind);

            let mut layer = original.clone();
            layer.resize(Extent2D::new(2, 4));
            assert_eq!(layer.extent(), Extent2D::new(2, 4));
            assert_eq!(layer.get(Index2D::new(0, 0)), Some(1));
            assert_eq!(layer.get(Index2D::new(1, 3)), Some(7));
            assert_eq!(layer.get(Index2D::new(3, 4)), None);

            layer.resize(Extent2D::new(4, 5));
            assert_eq!(layer.get(Index2D::new(0, 0)), Some(1));
            assert_eq!(layer.get(Index2D::new(1, 3)), Some(7));
            assert_eq!(layer.get(Index2D::new(3, 4)), Some(EMPTY_TILE));
        }
    }

    #[test]
    fn test_dense_resize_grows_with_empty_cells() {
        let mut matrix = DenseTileMatrix::from_rows(Extent2D::new(1, 2), &[vec![3, 4]]);
        matrix.resize(Extent2D::new(3, 3));

        assert_eq!(matrix.rows(), &[vec![3, 4, 0], vec![0, 0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn test_serialize_is_row_major_little_endian() {
        let mut layer = TileLayer::dense(Extent2D::new(2, 2));
        layer.set(Index2D::new(0, 1), 1);
        layer.set(Index2D::new(1, 0), 0x0102_0304);

        let expected = [0, 0, 0, 0, 1, 0, 0, 0, 4, 3, 2, 1, 0, 0, 0, 0];
        assert_eq!(layer.serialize(), expected);

        layer.convert_to_sparse();
        assert_eq!(layer.serialize(), expected);
    }

    #[test]
    fn test_tiles_in_region() {
        let layer = sample_layer(TileStorageKind::Sparse);
        let region: Vec<_> = layer.tiles_in(Index2D::new(1, 2), Index2D::new(2, 10)).collect();

        assert_eq!(
            region,
            vec![
                (Index2D::new(1, 2), EMPTY_TILE),
                (Index2D::new(1, 3), 7),
                (Index2D::new(1, 4), EMPTY_TILE),
            ]
        );
    }

    #[test]
    fn test_flood_fill() {
        // 1 1 0
        // 0 1 0
        // 1 0 1
        let rows = [vec![1, 1, 0], vec![0, 1, 0], vec![1, 0, 1]];
        let mut layer = TileLayer::new(TileStorage::Dense(DenseTileMatrix::from_rows(Extent2D::new(3, 3), &rows)));

        let changed = layer.flood_fill(Index2D::new(0, 0), 9);
        assert_eq!(changed.len(), 3);
        assert!(changed.iter().all(|&(_, previous)| previous == 1));

        assert_eq!(layer.get(Index2D::new(0, 0)), Some(9));
        assert_eq!(layer.get(Index2D::new(0, 1)), Some(9));
        assert_eq!(layer.get(Index2D::new(1, 1)), Some(9));
        assert_eq!(layer.get(Index2D::new(2, 0)), Some(1));
        assert_eq!(layer.get(Index2D::new(2, 2)), Some(1));

        assert!(layer.flood_fill(Index2D::new(0, 0), 9).is_empty());
        assert!(layer.flood_fill(Index2D::new(5, 5), 2).is_empty());
    }

    #[test]
    fn test_registry_functions() {
        let mut registry = Registry::new();
        let layer = make_tile_layer(&mut registry, Extent2D::new(10, 10));

        set_layer_tile(&mut registry, layer, Index2D::new(0, 0), 7);
        set_layer_tile(&mut registry, layer, Index2D::new(10, 0), 7);
        assert_eq!(get_layer_tile(&registry, layer, Index2D::new(0, 0)), Some(7));
        assert_eq!(get_layer_tile(&registry, layer, Index2D::new(9, 9)), Some(EMPTY_TILE));

        convert_to_sparse_tile_layer(&mut registry, layer);
        resize_tile_layer(&mut registry, layer, Extent2D::new(5, 5));
        convert_to_dense_tile_layer(&mut registry, layer);
        assert_eq!(get_layer_tile(&registry, layer, Index2D::new(0, 0)), Some(7));

        let mut count = 0;
        each_layer_tile(&registry, layer, |_, _| count += 1);
        assert_eq!(count, 25);
        assert_eq!(serialize_tile_layer(&registry, layer).len(), 100);

        let mut visited = Vec::new();
        each_layer_tile_in(&registry, layer, Index2D::new(0, 0), Index2D::new(1, 2), |index, id| {
            visited.push((index, id));
        });
        assert_eq!(visited, vec![(Index2D::new(0, 0), 7), (Index2D::new(0, 1), EMPTY_TILE)]);
    }
}
