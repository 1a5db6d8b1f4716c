//! Cell model
//!
//! A nested JSON property store addressed by dotted paths (`exec.jobState`)
//! or segment lists (`["output", "byJob", job_id]`). Every mutation is
//! handed to the update hook, which persists it into the host's cell
//! metadata.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// Path into the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropPath(Vec<String>);

impl PropPath {
    /// Segments of the path
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for PropPath {
    fn from(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<String> for PropPath {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl<const N: usize> From<[&str; N]> for PropPath {
    fn from(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<&[&str]> for PropPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_string()).collect())
    }
}

impl From<Vec<String>> for PropPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Hook invoked with the whole model after each mutation
pub type UpdateHook = Box<dyn Fn(&Value) + Send + Sync>;

/// Path-addressable model persisted through an update hook
pub struct CellModel {
    data: Value,
    on_update: Option<UpdateHook>,
}

impl fmt::Debug for CellModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellModel")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl Default for CellModel {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl CellModel {
    /// Model over existing data; anything but an object starts empty
    #[must_use]
    pub fn new(data: Value) -> Self {
        let data = if data.is_object() {
            data
        } else {
            Value::Object(Map::new())
        };
        Self {
            data,
            on_update: None,
        }
    }

    /// Install the persistence hook
    #[must_use]
    pub fn with_update_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(hook));
        self
    }

    /// Value at `path`
    pub fn get(&self, path: impl Into<PropPath>) -> Option<&Value> {
        let path = path.into();
        let mut node = &self.data;
        for segment in path.segments() {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Value at `path`, or `default` when absent or null
    pub fn get_or(&self, path: impl Into<PropPath>, default: Value) -> Value {
        match self.get(path) {
            Some(Value::Null) | None => default,
            Some(value) => value.clone(),
        }
    }

    /// Value at `path` decoded into `T`
    pub fn get_as<T: DeserializeOwned>(&self, path: impl Into<PropPath>) -> Option<T> {
        self.get(path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// String at `path`
    pub fn get_str(&self, path: impl Into<PropPath>) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Deep copy of the value at `path`
    pub fn copy(&self, path: impl Into<PropPath>) -> Option<Value> {
        self.get(path).cloned()
    }

    /// Store `value` at `path`, creating intermediate objects
    ///
    /// A non-object met along the way is replaced by an object.
    pub fn set(&mut self, path: impl Into<PropPath>, value: Value) {
        let path = path.into();
        let Some((last, parents)) = path.segments().split_last() else {
            self.data = value;
            self.notify();
            return;
        };
        let mut node = &mut self.data;
        for segment in parents {
            node = object_mut(node)
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        object_mut(node).insert(last.clone(), value);
        self.notify();
    }

    /// Remove and return the value at `path`
    pub fn delete(&mut self, path: impl Into<PropPath>) -> Option<Value> {
        let path = path.into();
        let (last, parents) = path.segments().split_last()?;
        let mut node = &mut self.data;
        for segment in parents {
            node = node.as_object_mut()?.get_mut(segment)?;
        }
        let removed = node.as_object_mut()?.remove(last);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Append to the array at `path`, creating it when absent
    pub fn push(&mut self, path: impl Into<PropPath>, value: Value) {
        let path = path.into();
        let mut items = match self.get(path.clone()) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        items.push(value);
        self.set(path, Value::Array(items));
    }

    /// The whole model
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.data
    }

    fn notify(&self) {
        if let Some(hook) = &self.on_update {
            hook(&self.data);
        }
    }
}

fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            object_mut(other)
        }
    }
}
