//! 元数据组件
//!
//! 为任意实体提供名称、属性表和附加组件。

use crate::error::{CoreError, Result};
use crate::ir;
use crate::properties::{Attribute, AttributeBundle};
use std::collections::BTreeMap;

/// 元数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    /// 名称，默认为空
    pub name: String,

    /// 属性表（名称唯一）
    pub properties: BTreeMap<String, Attribute>,

    /// 附加组件（组件名 → 属性值）
    pub components: BTreeMap<String, AttributeBundle>,
}

impl Meta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 从中间表示转换
    pub fn from_ir(metadata: &ir::Metadata) -> Self {
        let properties = metadata
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.value.clone()))
            .collect();

        let components = metadata
            .components
            .iter()
            .map(|component| {
                let bundle = component
                    .attributes
                    .iter()
                    .map(|attribute| (attribute.name.clone(), attribute.value.clone()))
                    .collect();
                (component.type_name.clone(), bundle)
            })
            .collect();

        Self {
            name: metadata.name.clone(),
            properties,
            components,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Attribute> {
        self.properties.get(name)
    }

    /// 属性必须存在
    pub fn check_property(&self, name: &str) -> Result<()> {
        if !self.properties.contains_key(name) {
            return Err(CoreError::PropertyNotFound(name.to_string()));
        }
        Ok(())
    }

    /// 属性名必须未被占用
    pub fn check_free_name(&self, name: &str) -> Result<()> {
        if self.properties.contains_key(name) {
            return Err(CoreError::PropertyExists(name.to_string()));
        }
        Ok(())
    }

    /// 添加属性，同名属性已存在时失败
    pub fn add_property(&mut self, name: impl Into<String>, value: Attribute) -> Result<()> {
        let name = name.into();
        self.check_free_name(&name)?;
        self.properties.insert(name, value);
        Ok(())
    }

    /// 移除属性并返回其值
    pub fn remove_property(&mut self, name: &str) -> Result<Attribute> {
        self.properties
            .remove(name)
            .ok_or_else(|| CoreError::PropertyNotFound(name.to_string()))
    }

    /// 重命名属性，保留原值
    pub fn rename_property(&mut self, old_name: &str, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        self.check_property(old_name)?;
        self.check_free_name(&new_name)?;

        let value = self.remove_property(old_name)?;
        self.properties.insert(new_name, value);
        Ok(())
    }

    /// 更新已有属性，返回旧值
    pub fn set_property(&mut self, name: &str, value: Attribute) -> Result<Attribute> {
        let slot = self
            .properties
            .get_mut(name)
            .ok_or_else(|| CoreError::PropertyNotFound(name.to_string()))?;
        Ok(std::mem::replace(slot, value))
    }

    /// 附加组件，返回被替换的旧值
    pub fn attach_component(&mut self, name: impl Into<String>, bundle: AttributeBundle) -> Option<AttributeBundle> {
        self.components.insert(name.into(), bundle)
    }

    pub fn detach_component(&mut self, name: &str) -> Option<AttributeBundle> {
        self.components.remove(name)
    }

    pub fn component(&self, name: &str) -> Option<&AttributeBundle> {
        self.components.get(name)
    }

    /// 组件必须已附加
    pub fn check_component(&self, name: &str) -> Result<()> {
        if !self.components.contains_key(name) {
            return Err(CoreError::ComponentNotAttached(name.to_string()));
        }
        Ok(())
    }

    /// 组件必须尚未附加
    pub fn check_unattached(&self, name: &str) -> Result<()> {
        if self.components.contains_key(name) {
            return Err(CoreError::ComponentAlreadyAttached(name.to_string()));
        }
        Ok(())
    }
}
