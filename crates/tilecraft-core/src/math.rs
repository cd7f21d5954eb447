//! 数学基础类型
//!
//! 基于 nalgebra 的向量别名，以及瓦片网格使用的范围和索引类型。

use nalgebra as na;
use serde::{Deserialize, Serialize};

/// 2D整数向量（宽、高 / x、y）
pub type Int2 = na::Vector2<i32>;

/// 3D整数向量
pub type Int3 = na::Vector3<i32>;

/// 4D整数向量
pub type Int4 = na::Vector4<i32>;

/// 2D浮点向量
pub type Float2 = na::Vector2<f32>;

/// 3D浮点向量
pub type Float3 = na::Vector3<f32>;

/// 4D浮点向量
pub type Float4 = na::Vector4<f32>;

/// 网格范围（行数 × 列数）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2D {
    pub rows: usize,
    pub cols: usize,
}

impl Extent2D {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// 单元格总数
    pub const fn area(&self) -> usize {
        self.rows * self.cols
    }

    /// 索引是否落在范围内
    pub const fn contains(&self, index: Index2D) -> bool {
        index.row < self.rows && index.col < self.cols
    }

    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// 网格索引
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Index2D {
    pub row: usize,
    pub col: usize,
}

impl Index2D {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// 上下左右四个相邻索引（不越过零边界）
    pub fn neighbors(&self) -> impl Iterator<Item = Index2D> {
        let Index2D { row, col } = *self;
        [
            row.checked_sub(1).map(|row| Index2D::new(row, col)),
            Some(Index2D::new(row + 1, col)),
            col.checked_sub(1).map(|col| Index2D::new(row, col)),
            Some(Index2D::new(row, col + 1)),
        ]
        .into_iter()
        .flatten()
    }
}
