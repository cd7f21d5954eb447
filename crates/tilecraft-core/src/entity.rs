//! 实体标识
//!
//! 采用代数式ID设计：槽位索引 + 代数。实体销毁后槽位的代数递增，
//! 旧ID随之失效，之后通过它进行的任何查询都不会命中。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体唯一标识符
///
/// 本身不携带任何数据，只能由创建它的 [`Registry`](crate::registry::Registry) 解释。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    /// 槽位索引
    index: u32,
    /// 代数（槽位被复用时递增）
    generation: u32,
}

impl EntityId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// 槽位索引
    pub fn index(&self) -> u32 {
        self.index
    }

    /// 代数
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_display() {
        let id = EntityId::new(7, 2);
        assert_eq!(id.to_string(), "7v2");
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 2);
    }

    #[test]
    fn test_entity_ordering() {
        assert!(EntityId::new(1, 0) < EntityId::new(2, 0));
        assert_ne!(EntityId::new(1, 0), EntityId::new(1, 1));
    }
}
