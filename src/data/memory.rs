//! In-memory data store used by tests and the dump binary.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AttrTag, ChangeEvent, DataAccess, ObjectHandle, TsString, Value};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: u64,
    #[serde(default)]
    pub attrs: BTreeMap<u32, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreFile {
    #[serde(default)]
    objects: Vec<ObjectRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: FxHashMap<ObjectHandle, FxHashMap<AttrTag, Value>>,
    changes: Vec<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ObjectRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            let attrs = record
                .attrs
                .into_iter()
                .map(|(tag, value)| (AttrTag(tag), value))
                .collect();
            store.objects.insert(ObjectHandle(record.id), attrs);
        }
        store
    }

    /// Parses `{"objects": [{"id": 1, "attrs": {"10": {"str": "..."}}}]}`.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let file: StoreFile = serde_json::from_str(data)?;
        Ok(Self::from_records(file.objects))
    }

    pub fn insert_object(&mut self, object: ObjectHandle) {
        self.objects.entry(object).or_default();
    }

    /// Stores `value` and records a change for every displayed occurrence.
    pub fn set(&mut self, object: ObjectHandle, tag: AttrTag, value: Value) {
        self.objects.entry(object).or_default().insert(tag, value);
        self.changes.push(ChangeEvent::all(object, tag));
    }

    pub fn set_string(&mut self, object: ObjectHandle, tag: AttrTag, text: &str) {
        self.set(object, tag, Value::Str(TsString::plain(text)));
    }

    pub fn set_int(&mut self, object: ObjectHandle, tag: AttrTag, value: i64) {
        self.set(object, tag, Value::Int(value));
    }

    pub fn set_obj(&mut self, object: ObjectHandle, tag: AttrTag, value: Option<ObjectHandle>) {
        self.set(object, tag, Value::Obj(value));
    }

    pub fn set_seq(&mut self, object: ObjectHandle, tag: AttrTag, items: Vec<ObjectHandle>) {
        self.set(object, tag, Value::Seq(items));
    }

    /// Drops the object without recording a change; whoever deletes an
    /// object is expected to report the attributes that referenced it.
    pub fn remove_object(&mut self, object: ObjectHandle) -> bool {
        self.objects.remove(&object).is_some()
    }

    pub fn take_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl DataAccess for MemoryStore {
    fn contains(&self, object: ObjectHandle) -> bool {
        self.objects.contains_key(&object)
    }

    fn read_attribute(
        &self,
        object: ObjectHandle,
        tag: AttrTag,
        index: Option<usize>,
    ) -> Option<Value> {
        let value = self.objects.get(&object)?.get(&tag)?;
        match (index, value) {
            (None, v) => Some(v.clone()),
            (Some(i), Value::Seq(items)) => items.get(i).map(|o| Value::Obj(Some(*o))),
            (Some(0), v) => Some(v.clone()),
            (Some(_), _) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/data/memory.rs"]
mod tests;
