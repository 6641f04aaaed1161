//! Write transactions on the in-memory source.

use super::state::{check_element, Field, ObjectStore, Slot, StoredObject};
use super::traverse::Writes;
use crate::error::{CoreError, CoreResult};
use crate::object::{ObjectId, Value};
use crate::schema::{ElementType, Property, PropertyKind, Schema};

/// A write transaction.
///
/// Obtained from [`MemorySource::transaction`](super::MemorySource::transaction).
/// Changes become visible, and commit hooks fire, only if the closure
/// returns `Ok`.
pub struct WriteTransaction<'a> {
    schema: &'a Schema,
    store: &'a mut ObjectStore,
    writes: Writes,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(schema: &'a Schema, store: &'a mut ObjectStore) -> Self {
        Self {
            schema,
            store,
            writes: Writes::new(),
        }
    }

    pub(crate) fn into_writes(self) -> Writes {
        self.writes
    }

    /// Creates an object of the given type with empty properties.
    pub fn create(&mut self, type_name: &str) -> CoreResult<ObjectId> {
        self.create_with_id(type_name, ObjectId::new())
    }

    /// Creates an object with a caller-chosen id.
    pub fn create_with_id(&mut self, type_name: &str, id: ObjectId) -> CoreResult<ObjectId> {
        let object_schema = self.schema.object(type_name)?;
        if self.store.contains(id) {
            return Err(CoreError::invalid_operation(format!(
                "object {id} already exists"
            )));
        }
        self.store.insert(id, StoredObject::new(object_schema));
        Ok(id)
    }

    /// Returns true if the object exists.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.store.contains(id)
    }

    /// Reads a scalar or link property.
    pub fn get(&self, id: ObjectId, property: &str) -> CoreResult<Value> {
        let prop = self.property(id, property)?;
        Ok(self
            .store
            .require(id)?
            .value(&prop.storage_name)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Writes a scalar or link property.
    pub fn set(&mut self, id: ObjectId, property: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        let prop = self.property(id, property)?;
        match &prop.kind {
            PropertyKind::Scalar(_) if value.is_null() => {}
            PropertyKind::Scalar(kind) => {
                check_element(&*self.store, &ElementType::Primitive(*kind), &value)?;
            }
            PropertyKind::Link { .. } if value.is_null() => {}
            PropertyKind::Link { target } => {
                check_element(&*self.store, &ElementType::object(target.as_str()), &value)?;
            }
            _ => return Err(wrong_kind(&prop, "a scalar or link")),
        }
        *self.field_mut(id, &prop.storage_name)? = Field::Value(value);
        self.touch(id, &prop.storage_name);
        Ok(())
    }

    /// Deletes an object.
    ///
    /// Links to it become null and it is dropped from every collection.
    /// Collections owned by the object become invalidated.
    pub fn delete(&mut self, id: ObjectId) -> CoreResult<()> {
        let touched = self.store.remove(id)?;
        self.writes.remove(&id);
        for (owner, property) in touched {
            self.touch(owner, &property);
        }
        Ok(())
    }

    /// Appends to a list.
    pub fn list_push(
        &mut self,
        owner: ObjectId,
        property: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        let len = self.collection_len(owner, property)?;
        self.list_insert(owner, property, len, value)
    }

    /// Inserts into a list at `index`.
    pub fn list_insert(
        &mut self,
        owner: ObjectId,
        property: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        let value = value.into();
        let prop = self.list_property(owner, property)?;
        self.check_list_value(&prop, &value)?;
        let row = self.store.next_row();
        let slots = self.slots_mut(owner, &prop)?;
        check_index(index, slots.len() + 1)?;
        slots.insert(index, Slot { row, value });
        self.touch(owner, &prop.storage_name);
        Ok(())
    }

    /// Replaces the list element at `index`.
    ///
    /// The new element gets a fresh row, so observers see the old element
    /// deleted and the new one inserted at the same index. Writing the value
    /// already stored there changes nothing.
    pub fn list_set(
        &mut self,
        owner: ObjectId,
        property: &str,
        index: usize,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        let value = value.into();
        let prop = self.list_property(owner, property)?;
        self.check_list_value(&prop, &value)?;
        let row = self.store.next_row();
        let slots = self.slots_mut(owner, &prop)?;
        check_index(index, slots.len())?;
        if slots[index].value == value {
            return Ok(());
        }
        slots[index] = Slot { row, value };
        self.touch(owner, &prop.storage_name);
        Ok(())
    }

    /// Removes and returns the list element at `index`.
    pub fn list_remove(
        &mut self,
        owner: ObjectId,
        property: &str,
        index: usize,
    ) -> CoreResult<Value> {
        let prop = self.list_property(owner, property)?;
        let slots = self.slots_mut(owner, &prop)?;
        check_index(index, slots.len())?;
        let removed = slots.remove(index);
        self.touch(owner, &prop.storage_name);
        Ok(removed.value)
    }

    /// Moves a list element so that it ends up at `to`.
    pub fn list_move(
        &mut self,
        owner: ObjectId,
        property: &str,
        from: usize,
        to: usize,
    ) -> CoreResult<()> {
        let prop = self.list_property(owner, property)?;
        let slots = self.slots_mut(owner, &prop)?;
        check_index(from, slots.len())?;
        check_index(to, slots.len())?;
        let slot = slots.remove(from);
        slots.insert(to, slot);
        self.touch(owner, &prop.storage_name);
        Ok(())
    }

    /// Removes every element of a list or set.
    pub fn clear(&mut self, owner: ObjectId, property: &str) -> CoreResult<()> {
        let prop = self.property(owner, property)?;
        match self.field_mut(owner, &prop.storage_name)? {
            Field::List(slots) | Field::Set(slots) => slots.clear(),
            Field::Dictionary(pairs) => pairs.clear(),
            Field::Value(_) => return Err(wrong_kind(&prop, "a collection")),
        }
        self.touch(owner, &prop.storage_name);
        Ok(())
    }

    /// Adds to a set. Returns false if the value was already present.
    pub fn set_add(
        &mut self,
        owner: ObjectId,
        property: &str,
        value: impl Into<Value>,
    ) -> CoreResult<bool> {
        let value = value.into();
        let prop = self.property(owner, property)?;
        let PropertyKind::Set(element) = &prop.kind else {
            return Err(wrong_kind(&prop, "a set"));
        };
        check_element(&*self.store, element, &value)?;
        let row = self.store.next_row();
        let slots = self.slots_mut(owner, &prop)?;
        if slots.iter().any(|slot| slot.value == value) {
            return Ok(false);
        }
        slots.push(Slot { row, value });
        self.touch(owner, &prop.storage_name);
        Ok(true)
    }

    /// Removes from a set. Returns false if the value was absent.
    pub fn set_remove(
        &mut self,
        owner: ObjectId,
        property: &str,
        value: &Value,
    ) -> CoreResult<bool> {
        let prop = self.property(owner, property)?;
        if !matches!(prop.kind, PropertyKind::Set(_)) {
            return Err(wrong_kind(&prop, "a set"));
        }
        let slots = self.slots_mut(owner, &prop)?;
        let before = slots.len();
        slots.retain(|slot| slot.value != *value);
        let removed = slots.len() != before;
        if removed {
            self.touch(owner, &prop.storage_name);
        }
        Ok(removed)
    }

    /// Inserts or replaces a dictionary value. Returns the previous value.
    pub fn dict_insert(
        &mut self,
        owner: ObjectId,
        property: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> CoreResult<Option<Value>> {
        let key = key.into();
        let value = value.into();
        let prop = self.property(owner, property)?;
        let PropertyKind::Dictionary(element) = &prop.kind else {
            return Err(wrong_kind(&prop, "a dictionary"));
        };
        if !value.is_null() {
            check_element(&*self.store, element, &value)?;
        }
        let pairs = self.pairs_mut(owner, &prop)?;
        let previous = match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                pairs.push((key, value));
                None
            }
        };
        self.touch(owner, &prop.storage_name);
        Ok(previous)
    }

    /// Removes a dictionary key. Returns the removed value.
    pub fn dict_remove(
        &mut self,
        owner: ObjectId,
        property: &str,
        key: &str,
    ) -> CoreResult<Option<Value>> {
        let prop = self.property(owner, property)?;
        let pairs = self.pairs_mut(owner, &prop)?;
        let removed = pairs
            .iter()
            .position(|(k, _)| k == key)
            .map(|pos| pairs.remove(pos).1);
        if removed.is_some() {
            self.touch(owner, &prop.storage_name);
        }
        Ok(removed)
    }

    fn property(&self, id: ObjectId, name: &str) -> CoreResult<Property> {
        let object = self.store.require(id)?;
        Ok(self.schema.resolve(&object.type_name, name)?.clone())
    }

    fn list_property(&self, owner: ObjectId, name: &str) -> CoreResult<Property> {
        let prop = self.property(owner, name)?;
        match &prop.kind {
            PropertyKind::List(_) => Ok(prop),
            _ => Err(wrong_kind(&prop, "a list")),
        }
    }

    fn check_list_value(&self, prop: &Property, value: &Value) -> CoreResult<()> {
        match &prop.kind {
            PropertyKind::List(element) => check_element(&*self.store, element, value),
            _ => Err(wrong_kind(prop, "a list")),
        }
    }

    fn collection_len(&self, owner: ObjectId, name: &str) -> CoreResult<usize> {
        let prop = self.property(owner, name)?;
        match self.store.require(owner)?.fields.get(&prop.storage_name) {
            Some(Field::List(slots)) | Some(Field::Set(slots)) => Ok(slots.len()),
            Some(Field::Dictionary(pairs)) => Ok(pairs.len()),
            _ => Err(wrong_kind(&prop, "a collection")),
        }
    }

    fn field_mut(&mut self, id: ObjectId, storage_name: &str) -> CoreResult<&mut Field> {
        self.store
            .get_mut(id)?
            .fields
            .get_mut(storage_name)
            .ok_or_else(|| CoreError::source(format!("object {id} has no field '{storage_name}'")))
    }

    fn slots_mut(&mut self, owner: ObjectId, prop: &Property) -> CoreResult<&mut Vec<Slot>> {
        match self.field_mut(owner, &prop.storage_name)? {
            Field::List(slots) | Field::Set(slots) => Ok(slots),
            _ => Err(wrong_kind(prop, "a list or set")),
        }
    }

    fn pairs_mut(
        &mut self,
        owner: ObjectId,
        prop: &Property,
    ) -> CoreResult<&mut Vec<(String, Value)>> {
        match self.field_mut(owner, &prop.storage_name)? {
            Field::Dictionary(pairs) => Ok(pairs),
            _ => Err(wrong_kind(prop, "a dictionary")),
        }
    }

    fn touch(&mut self, id: ObjectId, storage_name: &str) {
        self.writes
            .entry(id)
            .or_default()
            .insert(storage_name.to_string());
    }
}

fn check_index(index: usize, len: usize) -> CoreResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(CoreError::invalid_operation(format!(
            "index {index} out of bounds (length {len})"
        )))
    }
}

fn wrong_kind(prop: &Property, expected: &str) -> CoreError {
    CoreError::invalid_operation(format!("property '{}' is not {expected}", prop.name))
}
