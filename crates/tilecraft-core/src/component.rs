//! 组件定义与附加组件
//!
//! 地图上的 [`ComponentSet`] 保存组件定义（组件名 → 属性默认值）。
//! 任意带有 [`Meta`] 的实体都可以附加已定义的组件，附加时拷贝定义中的默认值。
//! 修改定义（重命名、增删属性、删除定义）会同步到所有已附加的实例。

use crate::entity::EntityId;
use crate::error::{CoreError, Result};
use crate::meta::Meta;
use crate::properties::{Attribute, AttributeBundle};
use crate::registry::Registry;
use std::collections::BTreeMap;
use tracing::debug;

/// 地图已知的附加组件定义
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    pub definitions: BTreeMap<String, AttributeBundle>,
}

impl ComponentSet {
    pub fn definition(&self, name: &str) -> Option<&AttributeBundle> {
        self.definitions.get(name)
    }

    /// 组件必须已定义
    pub fn check_defined(&self, name: &str) -> Result<()> {
        if !self.definitions.contains_key(name) {
            return Err(CoreError::ComponentNotFound(name.to_string()));
        }
        Ok(())
    }

    /// 组件名必须未被占用
    pub fn check_free_name(&self, name: &str) -> Result<()> {
        if self.definitions.contains_key(name) {
            return Err(CoreError::ComponentExists(name.to_string()));
        }
        Ok(())
    }

    /// 组件已定义且带有该属性
    pub fn check_attribute(&self, component: &str, attribute: &str) -> Result<()> {
        self.check_defined(component)?;
        if !self.definitions[component].contains_key(attribute) {
            return Err(CoreError::ComponentAttributeNotFound(attribute.to_string()));
        }
        Ok(())
    }

    /// 组件已定义且属性名未被占用
    pub fn check_free_attribute(&self, component: &str, attribute: &str) -> Result<()> {
        self.check_defined(component)?;
        if self.definitions[component].contains_key(attribute) {
            return Err(CoreError::ComponentAttributeExists(attribute.to_string()));
        }
        Ok(())
    }

    fn definition_mut(&mut self, name: &str) -> Result<&mut AttributeBundle> {
        self.definitions
            .get_mut(name)
            .ok_or_else(|| CoreError::ComponentNotFound(name.to_string()))
    }
}

/// 被删除的组件定义及其所有附加实例
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedComponent {
    pub definition: AttributeBundle,
    pub attached: Vec<(EntityId, AttributeBundle)>,
}

/// 被删除的组件属性：默认值和各附加实例上的值
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedAttribute {
    pub default: Attribute,
    pub attached: Vec<(EntityId, Attribute)>,
}

pub fn component_set(registry: &Registry, map: EntityId) -> &ComponentSet {
    registry.get::<ComponentSet>(map)
}

fn component_set_mut(registry: &mut Registry, map: EntityId) -> &mut ComponentSet {
    registry.get_mut::<ComponentSet>(map)
}

/// 定义一个没有属性的新组件
pub fn define_component(registry: &mut Registry, map: EntityId, name: impl Into<String>) -> Result<()> {
    let name = name.into();
    let set = component_set_mut(registry, map);
    set.check_free_name(&name)?;

    debug!("Defined component '{}' in map {}", name, map);
    set.definitions.insert(name, AttributeBundle::new());
    Ok(())
}

/// 删除组件定义，并从所有实体上移除该组件
pub fn undef_component(registry: &mut Registry, map: EntityId, name: &str) -> Result<RemovedComponent> {
    let definition = component_set_mut(registry, map)
        .definitions
        .remove(name)
        .ok_or_else(|| CoreError::ComponentNotFound(name.to_string()))?;

    let attached: Vec<_> = registry
        .each_mut::<Meta>()
        .filter_map(|(entity, meta)| meta.detach_component(name).map(|bundle| (entity, bundle)))
        .collect();

    debug!("Removed component '{}' from map {} ({} instances)", name, map, attached.len());
    Ok(RemovedComponent { definition, attached })
}

/// 恢复被删除的组件定义及其附加实例
pub fn restore_component(
    registry: &mut Registry,
    map: EntityId,
    name: &str,
    removed: RemovedComponent,
) -> Result<()> {
    let set = component_set_mut(registry, map);
    set.check_free_name(name)?;
    set.definitions.insert(name.to_string(), removed.definition);

    for (entity, bundle) in removed.attached {
        if let Some(meta) = registry.find_mut::<Meta>(entity) {
            meta.attach_component(name, bundle);
        }
    }
    Ok(())
}

/// 重命名组件定义和所有附加实例
pub fn rename_component(
    registry: &mut Registry,
    map: EntityId,
    old_name: &str,
    new_name: impl Into<String>,
) -> Result<()> {
    let new_name = new_name.into();
    let set = component_set_mut(registry, map);
    set.check_defined(old_name)?;
    set.check_free_name(&new_name)?;

    if let Some(definition) = set.definitions.remove(old_name) {
        set.definitions.insert(new_name.clone(), definition);
    }

    for (_, meta) in registry.each_mut::<Meta>() {
        if let Some(bundle) = meta.detach_component(old_name) {
            meta.attach_component(new_name.clone(), bundle);
        }
    }
    Ok(())
}

/// 给组件定义添加属性，已附加的实例获得同样的默认值
pub fn add_component_attribute(
    registry: &mut Registry,
    map: EntityId,
    component: &str,
    attribute: impl Into<String>,
    default: Attribute,
) -> Result<()> {
    let attribute = attribute.into();
    let set = component_set_mut(registry, map);
    set.check_free_attribute(component, &attribute)?;
    set.definition_mut(component)?.insert(attribute.clone(), default.clone());

    for (_, meta) in registry.each_mut::<Meta>() {
        if let Some(bundle) = meta.components.get_mut(component) {
            bundle.insert(attribute.clone(), default.clone());
        }
    }
    Ok(())
}

/// 从组件定义和所有附加实例中移除属性
pub fn remove_component_attribute(
    registry: &mut Registry,
    map: EntityId,
    component: &str,
    attribute: &str,
) -> Result<RemovedAttribute> {
    let default = component_set_mut(registry, map)
        .definition_mut(component)?
        .remove(attribute)
        .ok_or_else(|| CoreError::ComponentAttributeNotFound(attribute.to_string()))?;

    let attached = registry
        .each_mut::<Meta>()
        .filter_map(|(entity, meta)| {
            let value = meta.components.get_mut(component)?.remove(attribute)?;
            Some((entity, value))
        })
        .collect();

    Ok(RemovedAttribute { default, attached })
}

/// 恢复被移除的组件属性
pub fn restore_component_attribute(
    registry: &mut Registry,
    map: EntityId,
    component: &str,
    attribute: &str,
    removed: RemovedAttribute,
) -> Result<()> {
    let set = component_set_mut(registry, map);
    set.check_free_attribute(component, attribute)?;
    set.definition_mut(component)?.insert(attribute.to_string(), removed.default);

    for (entity, value) in removed.attached {
        if let Some(bundle) = registry
            .find_mut::<Meta>(entity)
            .and_then(|meta| meta.components.get_mut(component))
        {
            bundle.insert(attribute.to_string(), value);
        }
    }
    Ok(())
}

/// 给实体附加组件，属性值取定义中的默认值
pub fn attach_component(registry: &mut Registry, map: EntityId, entity: EntityId, name: &str) -> Result<()> {
    let set = component_set(registry, map);
    set.check_defined(name)?;
    let defaults = set.definitions[name].clone();

    let meta = registry.get_mut::<Meta>(entity);
    meta.check_unattached(name)?;
    meta.attach_component(name, defaults);
    Ok(())
}

/// 从实体上移除组件，返回移除前的属性值
pub fn detach_component(registry: &mut Registry, entity: EntityId, name: &str) -> Result<AttributeBundle> {
    registry
        .get_mut::<Meta>(entity)
        .detach_component(name)
        .ok_or_else(|| CoreError::ComponentNotAttached(name.to_string()))
}

/// 修改实体上某个组件的属性值，返回旧值
pub fn set_component_attribute(
    registry: &mut Registry,
    entity: EntityId,
    component: &str,
    attribute: &str,
    value: Attribute,
) -> Result<Attribute> {
    let bundle = registry
        .get_mut::<Meta>(entity)
        .components
        .get_mut(component)
        .ok_or_else(|| CoreError::ComponentNotAttached(component.to_string()))?;
    let slot = bundle
        .get_mut(attribute)
        .ok_or_else(|| CoreError::ComponentAttributeNotFound(attribute.to_string()))?;
    Ok(std::mem::replace(slot, value))
}

/// 把实体上的组件重置为定义中的默认值，返回重置前的值
pub fn reset_component(
    registry: &mut Registry,
    map: EntityId,
    entity: EntityId,
    name: &str,
) -> Result<AttributeBundle> {
    let set = component_set(registry, map);
    set.check_defined(name)?;
    let defaults = set.definitions[name].clone();

    let meta = registry.get_mut::<Meta>(entity);
    meta.check_component(name)?;
    meta.attach_component(name, defaults)
        .ok_or_else(|| CoreError::ComponentNotAttached(name.to_string()))
}
