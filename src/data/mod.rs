//! 数据存储接口：对象句柄、属性值和变更事件

pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::TextProps;

pub use memory::MemoryStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrTag(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsRun {
    pub text: String,
    /// `None` inherits whatever props are in effect where the string is shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<TextProps>,
}

/// Text with per-run formatting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TsStringRepr")]
pub struct TsString {
    pub runs: Vec<TsRun>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TsStringRepr {
    Plain(String),
    Runs { runs: Vec<TsRun> },
}

impl From<TsStringRepr> for TsString {
    fn from(repr: TsStringRepr) -> Self {
        match repr {
            TsStringRepr::Plain(text) => TsString::plain(&text),
            TsStringRepr::Runs { runs } => TsString { runs },
        }
    }
}

impl TsString {
    pub fn plain(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            runs: vec![TsRun {
                text: text.to_string(),
                props: None,
            }],
        }
    }

    pub fn push(mut self, text: &str, props: Option<TextProps>) -> Self {
        if !text.is_empty() {
            self.runs.push(TsRun {
                text: text.to_string(),
                props,
            });
        }
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Str(TsString),
    Int(i64),
    Obj(Option<ObjectHandle>),
    Seq(Vec<ObjectHandle>),
}

pub trait DataAccess {
    fn contains(&self, object: ObjectHandle) -> bool;

    /// With `index`, a sequence yields its `index`th item as `Value::Obj`;
    /// any other value only answers index 0.
    fn read_attribute(
        &self,
        object: ObjectHandle,
        tag: AttrTag,
        index: Option<usize>,
    ) -> Option<Value>;

    fn read_string(&self, object: ObjectHandle, tag: AttrTag) -> Option<TsString> {
        match self.read_attribute(object, tag, None)? {
            Value::Str(s) => Some(s),
            Value::Int(n) => Some(TsString::plain(&n.to_string())),
            _ => None,
        }
    }

    fn read_int(&self, object: ObjectHandle, tag: AttrTag) -> Option<i64> {
        match self.read_attribute(object, tag, None)? {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Objects referenced by an object or sequence attribute, in order.
    fn read_objects(&self, object: ObjectHandle, tag: AttrTag) -> Vec<ObjectHandle> {
        match self.read_attribute(object, tag, None) {
            Some(Value::Seq(items)) => items,
            Some(Value::Obj(Some(item))) => vec![item],
            _ => Vec::new(),
        }
    }

    fn object_at(&self, object: ObjectHandle, tag: AttrTag, index: usize) -> Option<ObjectHandle> {
        match self.read_attribute(object, tag, Some(index))? {
            Value::Obj(item) => item,
            _ => None,
        }
    }
}

/// One delivered change: `repeat` displayed occurrences starting at the
/// 1-based `occurrence`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub object: ObjectHandle,
    pub tag: AttrTag,
    pub occurrence: u32,
    pub repeat: u32,
}

impl ChangeEvent {
    pub fn new(object: ObjectHandle, tag: AttrTag, occurrence: u32, repeat: u32) -> Self {
        Self {
            object,
            tag,
            occurrence,
            repeat,
        }
    }

    /// Every displayed occurrence of the attribute.
    pub fn all(object: ObjectHandle, tag: AttrTag) -> Self {
        Self::new(object, tag, 1, u32::MAX)
    }
}
