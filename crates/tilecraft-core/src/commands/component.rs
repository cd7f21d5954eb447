//! 组件命令
//!
//! 定义类命令作用于地图的 [`ComponentSet`]，并同步到所有附加实例；
//! 附加类命令作用于单个实体的 [`Meta`]。

use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::component::{
    add_component_attribute, attach_component, component_set, define_component, detach_component,
    remove_component_attribute, rename_component, reset_component, restore_component, restore_component_attribute,
    set_component_attribute, undef_component, ComponentSet, RemovedAttribute, RemovedComponent,
};
use crate::document::Document;
use crate::entity::EntityId;
use crate::error::Result;
use crate::meta::Meta;
use crate::properties::{Attribute, AttributeBundle};
use std::any::Any;
use uuid::Uuid;

fn components(document: &Document) -> &ComponentSet {
    component_set(document.registry(), document.map_entity())
}

fn meta(document: &Document, entity: EntityId) -> &Meta {
    document.registry().get::<Meta>(entity)
}

/// 构造时已验证的组件修改不应失败
fn validated<T>(result: Result<T>) -> T {
    result.unwrap_or_else(|err| panic!("component edit validated at creation was rejected: {err}"))
}

#[derive(Debug)]
pub struct DefineComponentCommand {
    document_id: Uuid,
    name: String,
}

impl DefineComponentCommand {
    pub fn new(document: &Document, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        components(document).check_free_name(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            name,
        })
    }
}

impl Command for DefineComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DefineComponent
    }

    fn text(&self) -> &str {
        "Define Component"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(define_component(document.registry_mut(), map, self.name.clone()));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(undef_component(document.registry_mut(), map, &self.name));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 删除组件定义，同时从所有实体上移除该组件
#[derive(Debug)]
pub struct UndefComponentCommand {
    document_id: Uuid,
    name: String,
    removed: Option<RemovedComponent>,
}

impl UndefComponentCommand {
    pub fn new(document: &Document, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        components(document).check_defined(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            name,
            removed: None,
        })
    }
}

impl Command for UndefComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UndefComponent
    }

    fn text(&self) -> &str {
        "Remove Component"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        self.removed = Some(validated(undef_component(document.registry_mut(), map, &self.name)));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        if let Some(removed) = self.removed.take() {
            let map = document.map_entity();
            validated(restore_component(document.registry_mut(), map, &self.name, removed));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RenameComponentCommand {
    document_id: Uuid,
    old_name: String,
    new_name: String,
}

impl RenameComponentCommand {
    pub fn new(document: &Document, old_name: impl Into<String>, new_name: impl Into<String>) -> Result<Self> {
        let old_name = old_name.into();
        let new_name = new_name.into();

        let set = components(document);
        set.check_defined(&old_name)?;
        set.check_free_name(&new_name)?;

        Ok(Self {
            document_id: document.uuid(),
            old_name,
            new_name,
        })
    }
}

impl Command for RenameComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RenameComponent
    }

    fn text(&self) -> &str {
        "Rename Component"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(rename_component(document.registry_mut(), map, &self.old_name, self.new_name.clone()));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(rename_component(document.registry_mut(), map, &self.new_name, self.old_name.clone()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 给组件定义添加属性，默认值为空字符串
#[derive(Debug)]
pub struct CreateComponentAttributeCommand {
    document_id: Uuid,
    component: String,
    attribute: String,
}

impl CreateComponentAttributeCommand {
    pub fn new(document: &Document, component: impl Into<String>, attribute: impl Into<String>) -> Result<Self> {
        let component = component.into();
        let attribute = attribute.into();
        components(document).check_free_attribute(&component, &attribute)?;
        Ok(Self {
            document_id: document.uuid(),
            component,
            attribute,
        })
    }
}

impl Command for CreateComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::CreateComponentAttribute
    }

    fn text(&self) -> &str {
        "Create Component Attribute"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(add_component_attribute(
            document.registry_mut(),
            map,
            &self.component,
            self.attribute.clone(),
            Attribute::default(),
        ));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(remove_component_attribute(document.registry_mut(), map, &self.component, &self.attribute));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct RemoveComponentAttributeCommand {
    document_id: Uuid,
    component: String,
    attribute: String,
    removed: Option<RemovedAttribute>,
}

impl RemoveComponentAttributeCommand {
    pub fn new(document: &Document, component: impl Into<String>, attribute: impl Into<String>) -> Result<Self> {
        let component = component.into();
        let attribute = attribute.into();
        components(document).check_attribute(&component, &attribute)?;
        Ok(Self {
            document_id: document.uuid(),
            component,
            attribute,
            removed: None,
        })
    }
}

impl Command for RemoveComponentAttributeCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::RemoveComponentAttribute
    }

    fn text(&self) -> &str {
        "Remove Component Attribute"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        self.removed = Some(validated(remove_component_attribute(
            document.registry_mut(),
            map,
            &self.component,
            &self.attribute,
        )));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        if let Some(removed) = self.removed.take() {
            let map = document.map_entity();
            validated(restore_component_attribute(
                document.registry_mut(),
                map,
                &self.component,
                &self.attribute,
                removed,
            ));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 给实体附加已定义的组件
#[derive(Debug)]
pub struct AttachComponentCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
}

impl AttachComponentCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        components(document).check_defined(&name)?;
        meta(document, entity).check_unattached(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
        })
    }
}

impl Command for AttachComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AttachComponent
    }

    fn text(&self) -> &str {
        "Attach Component"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        validated(attach_component(document.registry_mut(), map, self.entity, &self.name));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        validated(detach_component(document.registry_mut(), self.entity, &self.name));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 从实体上移除组件，撤销时恢复移除前的属性值
#[derive(Debug)]
pub struct DetachComponentCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    removed: Option<AttributeBundle>,
}

impl DetachComponentCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        meta(document, entity).check_component(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            removed: None,
        })
    }
}

impl Command for DetachComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DetachComponent
    }

    fn text(&self) -> &str {
        "Detach Component"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        self.removed = Some(validated(detach_component(document.registry_mut(), self.entity, &self.name)));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        if let Some(bundle) = self.removed.take() {
            document
                .registry_mut()
                .get_mut::<Meta>(self.entity)
                .attach_component(self.name.clone(), bundle);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 修改实体上某个组件的属性值，连续修改同一属性时合并
#[derive(Debug)]
pub struct UpdateAttachedComponentCommand {
    document_id: Uuid,
    entity: EntityId,
    component: String,
    attribute: String,
    value: Attribute,
    previous: Option<Attribute>,
}

impl UpdateAttachedComponentCommand {
    pub fn new(
        document: &Document,
        entity: EntityId,
        component: impl Into<String>,
        attribute: impl Into<String>,
        value: Attribute,
    ) -> Result<Self> {
        let component = component.into();
        let attribute = attribute.into();

        meta(document, entity).check_component(&component)?;
        components(document).check_attribute(&component, &attribute)?;

        Ok(Self {
            document_id: document.uuid(),
            entity,
            component,
            attribute,
            value,
            previous: None,
        })
    }
}

impl Command for UpdateAttachedComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::UpdateAttachedComponent
    }

    fn text(&self) -> &str {
        "Update Component Value"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let previous = validated(set_component_attribute(
            document.registry_mut(),
            self.entity,
            &self.component,
            &self.attribute,
            self.value.clone(),
        ));
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = &self.previous {
            validated(set_component_attribute(
                document.registry_mut(),
                self.entity,
                &self.component,
                &self.attribute,
                previous.clone(),
            ));
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other)
                if other.document_id == self.document_id
                    && other.entity == self.entity
                    && other.component == self.component
                    && other.attribute == self.attribute =>
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

/// 把实体上的组件恢复为定义中的默认值
#[derive(Debug)]
pub struct ResetAttachedComponentCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    previous: Option<AttributeBundle>,
}

impl ResetAttachedComponentCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        components(document).check_defined(&name)?;
        meta(document, entity).check_component(&name)?;
        Ok(Self {
            document_id: document.uuid(),
            entity,
            name,
            previous: None,
        })
    }
}

impl Command for ResetAttachedComponentCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::ResetAttachedComponent
    }

    fn text(&self) -> &str {
        "Reset Component Values"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        let map = document.map_entity();
        self.previous = Some(validated(reset_component(document.registry_mut(), map, self.entity, &self.name)));
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);
        if let Some(previous) = self.previous.take() {
            document
                .registry_mut()
                .get_mut::<Meta>(self.entity)
                .attach_component(self.name.clone(), previous);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
