//! Tilecraft 文件边界
//!
//! 负责文档与外部格式之间的衔接：
//! - 把文档导出为中间表示（导入见 `Document::from_ir`）
//! - 按固定顺序遍历文档的访问者接口
//! - 保存格式识别与瓦片数据编码

pub mod error;
pub mod export;
pub mod format;
pub mod ir_export;

pub use error::FileError;
pub use export::{accept, DocumentVisitor};
pub use format::{detect_format, encode_tile_layer, save_target, TileData};
pub use ir_export::export_ir;
