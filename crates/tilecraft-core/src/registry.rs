//! 实体-组件注册表
//!
//! 所有文档数据都存放在这里。每种组件类型对应一个按槽位索引的存储区，
//! 每个槽位带有代数计数器，用于在 O(1) 时间内识别已销毁的实体。
//!
//! # 示例
//!
//! ```rust
//! use tilecraft_core::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let entity = registry.create();
//! registry.attach(entity, 42_i32);
//!
//! assert_eq!(*registry.get::<i32>(entity), 42);
//! assert!(registry.destroy(entity));
//! assert!(!registry.is_valid(entity));
//! ```

use crate::entity::EntityId;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// 类型擦除后的组件存储
trait AnyStorage {
    fn remove(&mut self, index: u32) -> bool;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// 单一组件类型的存储区，按实体槽位索引
struct Storage<T> {
    values: Vec<Option<T>>,
    len: usize,
}

impl<T> Storage<T> {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            len: 0,
        }
    }

    fn get(&self, index: u32) -> Option<&T> {
        self.values.get(index as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.values.get_mut(index as usize).and_then(Option::as_mut)
    }

    fn insert(&mut self, index: u32, value: T) -> &mut T {
        let index = index as usize;
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }

        let slot = &mut self.values[index];
        if slot.is_none() {
            self.len += 1;
        }

        slot.insert(value)
    }

    fn take(&mut self, index: u32) -> Option<T> {
        let value = self.values.get_mut(index as usize)?.take();
        if value.is_some() {
            self.len -= 1;
        }
        value
    }
}

impl<T: 'static> AnyStorage for Storage<T> {
    fn remove(&mut self, index: u32) -> bool {
        self.take(index).is_some()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// 组件查询
///
/// 为 `(A,)`、`(A, B)`、`(A, B, C)` 实现，配合 [`Registry::each`] 使用。
pub trait Query {
    type Item<'a>;

    /// 取出实体上的全部组件，缺少任何一个时返回 `None`
    fn fetch(registry: &Registry, entity: EntityId) -> Option<Self::Item<'_>>;
}

macro_rules! impl_query {
    ($($component:ident),+) => {
        impl<$($component: 'static),+> Query for ($($component,)+) {
            type Item<'a> = ($(&'a $component,)+);

            fn fetch(registry: &Registry, entity: EntityId) -> Option<Self::Item<'_>> {
                Some(($(registry.find::<$component>(entity)?,)+))
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);

/// 实体-组件注册表
///
/// 单线程使用；同一时刻只允许一个编辑操作访问。
pub struct Registry {
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
    entity_count: usize,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            storages: HashMap::new(),
            entity_count: 0,
        }
    }

    /// 创建新实体
    pub fn create(&mut self) -> EntityId {
        self.entity_count += 1;

        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return EntityId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| panic!("entity slots exhausted"));
        self.slots.push(Slot {
            generation: 0,
            alive: true,
        });
        EntityId::new(index, 0)
    }

    /// 销毁实体及其全部组件
    ///
    /// 实体已失效时返回 `false`。
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        if !self.is_valid(entity) {
            return false;
        }

        for storage in self.storages.values_mut() {
            storage.remove(entity.index());
        }

        let slot = &mut self.slots[entity.index() as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(entity.index());
        self.entity_count -= 1;

        true
    }

    /// 检查实体是否仍然有效
    pub fn is_valid(&self, entity: EntityId) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// 附加组件，已存在时替换
    ///
    /// # Panics
    ///
    /// 实体无效时 panic。
    pub fn attach<T: 'static>(&mut self, entity: EntityId, value: T) -> &mut T {
        assert!(
            self.is_valid(entity),
            "cannot attach {} to invalid entity {}",
            type_name::<T>(),
            entity
        );

        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Storage<T>>()
            .unwrap_or_else(|| panic!("storage type mismatch for {}", type_name::<T>()))
            .insert(entity.index(), value)
    }

    /// 移除组件并返回它
    pub fn detach<T: 'static>(&mut self, entity: EntityId) -> Option<T> {
        if !self.is_valid(entity) {
            return None;
        }
        self.storage_mut::<T>()?.take(entity.index())
    }

    /// 获取组件
    ///
    /// # Panics
    ///
    /// 实体无效或缺少该组件时 panic，这属于调用方的逻辑错误。
    pub fn get<T: 'static>(&self, entity: EntityId) -> &T {
        self.find::<T>(entity)
            .unwrap_or_else(|| panic!("entity {} has no {} component", entity, type_name::<T>()))
    }

    /// 获取组件（可变）
    ///
    /// # Panics
    ///
    /// 同 [`Registry::get`]。
    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> &mut T {
        self.find_mut::<T>(entity)
            .unwrap_or_else(|| panic!("entity {} has no {} component", entity, type_name::<T>()))
    }

    /// 查找组件
    pub fn find<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        if !self.is_valid(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity.index())
    }

    /// 查找组件（可变）
    pub fn find_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.is_valid(entity) {
            return None;
        }
        self.storage_mut::<T>()?.get_mut(entity.index())
    }

    /// 实体是否带有该组件
    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.find::<T>(entity).is_some()
    }

    /// 遍历所有有效实体
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| EntityId::new(index as u32, slot.generation))
    }

    /// 遍历同时带有查询中所有组件的实体
    ///
    /// 每个匹配的实体恰好出现一次，不保证顺序。
    pub fn each<Q: Query + 'static>(&self) -> impl Iterator<Item = (EntityId, Q::Item<'_>)> + '_ {
        self.entities()
            .filter_map(move |entity| Q::fetch(self, entity).map(|item| (entity, item)))
    }

    /// 可变遍历某一类组件
    pub fn each_mut<T: 'static>(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        let slots = &self.slots;
        let values = self
            .storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<Storage<T>>())
            .map(|storage| storage.values.iter_mut())
            .unwrap_or_default();

        values.enumerate().filter_map(move |(index, value)| {
            let value = value.as_mut()?;
            Some((EntityId::new(index as u32, slots[index].generation), value))
        })
    }

    /// 带有某一类组件的实体数量
    pub fn count<T: 'static>(&self) -> usize {
        self.storage::<T>().map_or(0, |storage| storage.len)
    }

    /// 所有组件的总数，即不区分类型的 `count`
    #[doc(alias = "count")]
    pub fn component_count(&self) -> usize {
        self.storages.values().map(|storage| storage.len()).sum()
    }

    /// 有效实体数量
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    fn storage<T: 'static>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any().downcast_ref::<Storage<T>>())
    }

    fn storage_mut<T: 'static>(&mut self) -> Option<&mut Storage<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<Storage<T>>())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entity_count)
            .field("components", &self.component_count())
            .finish()
    }
}
