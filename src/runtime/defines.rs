use std::collections::BTreeMap;
use std::fmt;

/// Value of one preprocessor define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineValue {
    Bool(bool),
    Int(i64),
}

impl DefineValue {
    pub fn is_enabled(self) -> bool {
        match self {
            DefineValue::Bool(b) => b,
            DefineValue::Int(_) => true,
        }
    }
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            DefineValue::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for DefineValue {
    fn from(value: bool) -> Self {
        DefineValue::Bool(value)
    }
}

impl From<i64> for DefineValue {
    fn from(value: i64) -> Self {
        DefineValue::Int(value)
    }
}

/// Define set of one material, plus the dirty flags its owner manages.
///
/// A fresh set is dirty so the first `prepare_defines` always runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDefines {
    values: BTreeMap<String, DefineValue>,
    dirty: bool,
    image_processing_dirty: bool,
    changed: bool,
}

impl Default for MaterialDefines {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            dirty: true,
            image_processing_dirty: true,
            changed: false,
        }
    }
}

impl MaterialDefines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_image_processing_dirty(&self) -> bool {
        self.image_processing_dirty
    }

    pub fn mark_as_dirty(&mut self) {
        self.dirty = true;
    }

    /// Also dirties the whole set.
    pub fn mark_image_processing_dirty(&mut self) {
        self.image_processing_dirty = true;
        self.dirty = true;
    }

    pub fn mark_as_processed(&mut self) {
        self.dirty = false;
        self.image_processing_dirty = false;
    }

    /// Sets `name`; with `mark_changed`, a different value flags the set as
    /// changed so the program gets rebuilt.
    pub fn set_value(&mut self, name: &str, value: impl Into<DefineValue>, mark_changed: bool) {
        let value = value.into();
        let previous = self.values.insert(name.to_string(), value);
        if mark_changed && previous != Some(value) {
            self.changed = true;
        }
    }

    /// Returns whether any value changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn get(&self, name: &str) -> Option<DefineValue> {
        self.values.get(name).copied()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(DefineValue::is_enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DefineValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Enabled defines as `#define` lines, sorted by name.
    pub fn to_preamble(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            match value {
                DefineValue::Bool(false) => {}
                DefineValue::Bool(true) => out.push_str(&format!("#define {name}\n")),
                DefineValue::Int(v) => out.push_str(&format!("#define {name} {v}\n")),
            }
        }
        out
    }

    /// Inserts the preamble right after the `#version` line of `source`.
    pub fn inject_into(&self, source: &str) -> String {
        let preamble = self.to_preamble();
        match source.split_once('\n') {
            Some((first, rest)) if first.starts_with("#version") => {
                format!("{first}\n{preamble}{rest}")
            }
            _ => format!("{preamble}{source}"),
        }
    }
}
