//! 文件边界错误定义

use thiserror::Error;
use tilecraft_core::entity::EntityId;
use tilecraft_core::CoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileError {
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Entity {entity} is missing component {component}")]
    MissingComponent { entity: EntityId, component: &'static str },

    #[error("Layer {0} has no persistent id")]
    MissingLayerId(EntityId),
}
