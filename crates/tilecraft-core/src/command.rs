//! 命令接口
//!
//! 所有用户可见的文档修改都封装为命令。命令可以执行、撤销，
//! 同类命令可以合并（例如连续的重命名），被丢弃时通过 `dispose`
//! 释放自己暂时持有的实体。

use crate::document::Document;
use std::any::Any;
use std::fmt::Debug;
use uuid::Uuid;

/// 命令种类标签，合并前用于快速比较
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateLayer,
    RemoveLayer,
    DuplicateLayer,
    Rename,
    SetLayerOpacity,
    SetLayerVisibility,
    MoveLayerUp,
    MoveLayerDown,
    SetLayerTiles,
    FloodFill,
    ConvertTileLayer,
    ResizeMap,
    SetTileFormat,
    AddTileset,
    RemoveTileset,
    AddProperty,
    RemoveProperty,
    RenameProperty,
    UpdateProperty,
    ChangePropertyType,
    DefineComponent,
    UndefComponent,
    RenameComponent,
    CreateComponentAttribute,
    RemoveComponentAttribute,
    AttachComponent,
    DetachComponent,
    UpdateAttachedComponent,
    ResetAttachedComponent,
    CreateObject,
    RemoveObject,
    MoveObject,
    SetObjectTag,
    SetObjectVisibility,
    AddAnimationFrame,
    RemoveAnimationFrame,
}

/// 可撤销的文档命令
///
/// `apply` 在第一次执行和每次重做时调用，`undo` 恢复 `apply` 之前的状态。
/// 两者都不会失败：可能失败的校验在构造命令时完成。
pub trait Command: Any + Debug {
    fn kind(&self) -> CommandKind;

    /// 撤销/重做菜单中显示的文本
    fn text(&self) -> &str;

    fn apply(&mut self, document: &mut Document);

    fn undo(&mut self, document: &mut Document);

    /// 尝试把 `other` 合并进自己，成功时 `other` 会被丢弃
    fn merge_with(&mut self, _other: &dyn Command) -> bool {
        false
    }

    /// 命令被移出历史时调用
    fn dispose(&mut self, _document: &mut Document) {}

    fn as_any(&self) -> &dyn Any;
}

/// 种类相同时把另一个命令向下转型为具体类型
pub fn downcast_command<T: Command>(other: &dyn Command, kind: CommandKind) -> Option<&T> {
    if other.kind() != kind {
        return None;
    }
    other.as_any().downcast_ref::<T>()
}

/// 确认命令作用在创建它的文档上
///
/// # Panics
///
/// UUID 不一致时 panic。
pub(crate) fn check_document(expected: Uuid, document: &Document) {
    assert_eq!(
        expected,
        document.uuid(),
        "command created for document {expected} was applied to document {}",
        document.uuid()
    );
}
