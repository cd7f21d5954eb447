//! 属性命令
//!
//! 作用于任意带有 [`Meta`] 的实体。名称冲突和缺失在构造命令时由 [`Meta`]
//! 的检查函数验证，执行时通过同一组 [`Meta`] 方法修改属性。

use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::Result;
use crate::meta::Meta;
use crate::properties::{Attribute, AttributeType};
use std::any::Any;
use uuid::Uuid;

fn meta(document: &Document, entity: EntityId) -> &Meta {
    document.registry().get::<Meta>(entity)
}

fn meta_mut(document: &mut Document, entity: EntityId) -> &mut Meta {
    document.registry_mut().get_mut::<Meta>(entity)
}

/// 构造时已验证的属性修改不应失败
fn validated<T>(result: Result<T>) -> T {
    result.unwrap_or_else(|err| panic!("property edit validated at creation was rejected: {err}"))
}

#[derive(Debug)]
pub struct AddPropertyCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    value: Attribute,
}

impl AddPropertyCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>, value: Attribute) -> Result<Self> {
        let name = name.into();
        meta(document, entity).check_free_name(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            value,
        })
    }
}

impl Command for AddPropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AddProperty
    }

    fn text(&self) -> &str {
        "Add Property"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        validated(meta_mut(document, self.entity).add_property(self.name.clone(), self.value.clone()));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        validated(meta_mut(document, self.entity).remove_property(&self.name));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemovePropertyCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    removed: Option<Attribute>,
}

impl RemovePropertyCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        meta(document, entity).check_property(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            removed: None,
        })
    }
}

impl Command for RemovePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveProperty
    }

    fn text(&self) -> &str {
        "Remove Property"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        self.removed = Some(validated(meta_mut(document, self.entity).remove_property(&self.name)));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        if let Some(value) = self.removed.take() {
            validated(meta_mut(document, self.entity).add_property(self.name.clone(), value));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenamePropertyCommand {
    document_id: Uuid,
    entity: EntityId,
    old_name: String,
    new_name: String,
}

impl RenamePropertyCommand {
    pub fn new(
        document: &Document,
        entity: EntityId,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Result<Self> {
        let old_name = old_name.into();
        let new_name = new_name.into();

        let meta = meta(document, entity);
        meta.check_property(&old_name)?;
        meta.check_free_name(&new_name)?;

        Ok(Self {
            document_id: document.uuid(),
            entity,
            old_name,
            new_name,
        })
    }
}

impl Command for RenamePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameProperty
    }

    fn text(&self) -> &str {
        "Rename Property"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        validated(meta_mut(document, self.entity).rename_property(&self.old_name, self.new_name.clone()));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        validated(meta_mut(document, self.entity).rename_property(&self.new_name, self.old_name.clone()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改属性值，连续修改同一属性时合并
#[derive(Debug)]
pub struct UpdatePropertyCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    value: Attribute,
    previous: Option<Attribute>,
}

impl UpdatePropertyCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>, value: Attribute) -> Result<Self> {
        let name = name.into();
        meta(document, entity).check_property(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            value,
            previous: None,
        })
    }
}

impl Command for UpdatePropertyCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateProperty
    }

    fn text(&self) -> &str {
        "Update Property"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let previous = validated(meta_mut(document, self.entity).set_property(&self.name, self.value.clone()));
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = &self.previous {
            validated(meta_mut(document, self.entity).set_property(&self.name, previous.clone()));
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other)
                if other.document_id == self.document_id && other.entity == self.entity && other.name == self.name =>
            {
                self.value = other.value.clone();
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改属性类型，新值为该类型的默认值
#[derive(Debug)]
pub struct ChangePropertyTypeCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    attribute_type: AttributeType,
    previous: Option<Attribute>,
}

impl ChangePropertyTypeCommand {
    pub fn new(
        document: &Document,
        entity: EntityId,
        name: impl Into<String>,
        attribute_type: AttributeType,
    ) -> Result<Self> {
        let name = name.into();
        meta(document, entity).check_property(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            attribute_type,
            previous: None,
        })
    }
}

impl Command for ChangePropertyTypeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ChangePropertyType
    }

    fn text(&self) -> &str {
        "Change Property Type"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let value = Attribute::new(self.attribute_type);
        self.previous = Some(validated(meta_mut(document, self.entity).set_property(&self.name, value)));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = self.previous.take() {
            validated(meta_mut(document, self.entity).set_property(&self.name, previous));
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
    use crate::error::CoreError;
    use crate::history::CommandStack;

    #[test]
    fn test_add_and_remove_property() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();

        let add = AddPropertyCommand::new(&document, map, "speed", Attribute::Float(1.5)).unwrap();
        stack.push(&mut document, Box::new(add));
        assert_eq!(meta(&document, map).property("speed"), Some(&Attribute::Float(1.5)));

        assert_eq!(
            AddPropertyCommand::new(&document, map, "speed", Attribute::Int(1)).unwrap_err(),
            CoreError::PropertyExists("speed".to_string())
        );

        let remove = RemovePropertyCommand::new(&document, map, "speed").unwrap();
        stack.push(&mut document, Box::new(remove));
        assert_eq!(meta(&document, map).property("speed"), None);

        stack.undo(&mut document);
        assert_eq!(meta(&document, map).property("speed"), Some(&Attribute::Float(1.5)));

        stack.undo(&mut document);
        assert!(meta(&document, map).properties.is_empty());
    }

    #[test]
    fn test_rename_property() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        meta_mut(&mut document, map).add_property("a", Attribute::Bool(true)).unwrap();
        meta_mut(&mut document, map).add_property("b", Attribute::Bool(false)).unwrap();

        assert!(RenamePropertyCommand::new(&document, map, "a", "b").is_err());
        assert!(RenamePropertyCommand::new(&document, map, "missing", "c").is_err());

        let command = Box::new(RenamePropertyCommand::new(&document, map, "a", "c").unwrap());
        stack.push(&mut document, command);
        assert_eq!(meta(&document, map).property("c"), Some(&Attribute::Bool(true)));
        assert_eq!(meta(&document, map).property("a"), None);

        stack.undo(&mut document);
        assert_eq!(meta(&document, map).property("a"), Some(&Attribute::Bool(true)));
    }

    #[test]
    fn test_update_property_merges() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        meta_mut(&mut document, map).add_property("hp", Attribute::Int(10)).unwrap();

        for value in [11, 12, 13] {
            let command = UpdatePropertyCommand::new(&document, map, "hp", Attribute::Int(value)).unwrap();
            stack.push(&mut document, Box::new(command));
        }
        assert_eq!(stack.size(), 1);
        assert_eq!(meta(&document, map).property("hp"), Some(&Attribute::Int(13)));

        stack.undo(&mut document);
        assert_eq!(meta(&document, map).property("hp"), Some(&Attribute::Int(10)));
    }

    #[test]
    fn test_change_property_type() {
        let mut document = test_document();
        let mut stack = CommandStack::default();
        let map = document.map_entity();
        meta_mut(&mut document, map).add_property("value", Attribute::Int(42)).unwrap();

        let command = ChangePropertyTypeCommand::new(&document, map, "value", AttributeType::Str).unwrap();
        stack.push(&mut document, Box::new(command));
        assert_eq!(meta(&document, map).property("value"), Some(&Attribute::new(AttributeType::Str)));

        stack.undo(&mut document);
        assert_eq!(meta(&document, map).property("value"), Some(&Attribute::Int(42)));
    }
}
