use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ParamsError, Result};
use crate::path::ParamPath;

/// Ordered tree of named values.
///
/// Keys keep insertion order. Leaves are strings, integers or any other JSON
/// value; inner nodes are objects created on demand by the setters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamList {
    map: Map<String, Value>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a serialized list; the document root must be an object.
    pub fn from_buffer(buf: &[u8]) -> Result<Self> {
        match serde_json::from_slice(buf).map_err(ParamsError::Decode)? {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(ParamsError::NotAMap),
        }
    }

    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.map).map_err(ParamsError::Encode)
    }

    /// Store `value` at `path`, creating intermediate objects.
    pub fn set(&mut self, path: impl Into<ParamPath>, value: impl Into<Value>) -> Result<()> {
        *self.slot_mut(&path.into())? = value.into();
        Ok(())
    }

    pub fn set_string(&mut self, path: impl Into<ParamPath>, value: impl Into<String>) -> Result<()> {
        self.set(path, Value::String(value.into()))
    }

    pub fn set_int(&mut self, path: impl Into<ParamPath>, value: i64) -> Result<()> {
        self.set(path, value)
    }

    pub fn get(&self, path: impl Into<ParamPath>) -> Option<&Value> {
        let path = path.into();
        let (first, rest) = path.segments().split_first()?;
        rest.iter()
            .try_fold(self.map.get(first)?, |value, segment| {
                value.as_object()?.get(segment)
            })
    }

    /// String at `path`, or `""` when missing or not a string.
    pub fn get_string(&self, path: impl Into<ParamPath>) -> String {
        self.get_str(path).unwrap_or_default().to_owned()
    }

    pub fn get_str(&self, path: impl Into<ParamPath>) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_int(&self, path: impl Into<ParamPath>) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    pub fn contains(&self, path: impl Into<ParamPath>) -> bool {
        self.get(path).is_some()
    }

    /// Remove and return the value at `path`.
    pub fn remove(&mut self, path: impl Into<ParamPath>) -> Option<Value> {
        let path = path.into();
        let (last, parents) = path.segments().split_last()?;
        let mut map = &mut self.map;
        for segment in parents {
            map = map.get_mut(segment)?.as_object_mut()?;
        }
        map.shift_remove(last)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    fn slot_mut(&mut self, path: &ParamPath) -> Result<&mut Value> {
        let (last, parents) = path.segments().split_last().ok_or(ParamsError::EmptyPath)?;
        let mut map = &mut self.map;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            map = match entry {
                Value::Object(inner) => inner,
                _ => {
                    return Err(ParamsError::NotAnObject {
                        path: path.prefix(depth + 1),
                    })
                }
            };
        }
        Ok(map.entry(last.clone()).or_insert(Value::Null))
    }
}

impl From<Map<String, Value>> for ParamList {
    fn from(map: Map<String, Value>) -> Self {
        Self { map }
    }
}

impl TryFrom<Value> for ParamList {
    type Error = ParamsError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(ParamsError::NotAMap),
        }
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(&self.map).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}
