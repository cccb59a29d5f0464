use crate::error::CastError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single tagged value carried by an event.
///
/// Untagged on the wire; integer JSON numbers come back as `Int`, anything
/// fractional as `Num`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoiceValue {
    Int(i64),
    Num(f64),
    Str(String),
    Bool(bool),
}

impl VoiceValue {
    pub fn as_f64(&self) -> Result<f64, CastError> {
        match self {
            VoiceValue::Num(n) => Ok(*n),
            VoiceValue::Int(n) => Ok(*n as f64),
            VoiceValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            VoiceValue::Str(s) => s.parse().map_err(|_| CastError {
                wanted: "number",
                found: s.clone(),
            }),
        }
    }

    pub fn as_int(&self) -> Result<i64, CastError> {
        match self {
            VoiceValue::Int(n) => Ok(*n),
            VoiceValue::Num(n) => Ok(*n as i64),
            VoiceValue::Bool(b) => Ok(*b as i64),
            VoiceValue::Str(s) => s.parse().map_err(|_| CastError {
                wanted: "integer",
                found: s.clone(),
            }),
        }
    }

    /// Falsy: `"~"`, `"0"`, `"false"`, the empty string, numeric zero, `false`.
    pub fn is_truthy(&self) -> bool {
        match self {
            VoiceValue::Num(n) => *n != 0.0,
            VoiceValue::Int(n) => *n != 0,
            VoiceValue::Bool(b) => *b,
            VoiceValue::Str(s) => !s.is_empty() && s != "~" && s != "0" && s != "false",
        }
    }
}

impl fmt::Display for VoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceValue::Num(n) => write!(f, "{}", n),
            VoiceValue::Int(n) => write!(f, "{}", n),
            VoiceValue::Str(s) => write!(f, "{}", s),
            VoiceValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for VoiceValue {
    fn from(n: f64) -> Self {
        VoiceValue::Num(n)
    }
}

impl From<i64> for VoiceValue {
    fn from(n: i64) -> Self {
        VoiceValue::Int(n)
    }
}

impl From<&str> for VoiceValue {
    fn from(s: &str) -> Self {
        VoiceValue::Str(s.to_string())
    }
}

impl From<String> for VoiceValue {
    fn from(s: String) -> Self {
        VoiceValue::Str(s)
    }
}

impl From<bool> for VoiceValue {
    fn from(b: bool) -> Self {
        VoiceValue::Bool(b)
    }
}

/// The musical payload attached to an event: a few well-known fields plus an
/// open bag of named control parameters (gain, pan, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<VoiceValue>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub controls: BTreeMap<String, VoiceValue>,
}

impl VoiceData {
    pub fn new() -> Self {
        VoiceData::default()
    }

    pub fn note(note: impl Into<String>) -> Self {
        VoiceData {
            note: Some(note.into()),
            ..VoiceData::default()
        }
    }

    pub fn value(value: impl Into<VoiceValue>) -> Self {
        VoiceData {
            value: Some(value.into()),
            ..VoiceData::default()
        }
    }

    pub fn with_note(&self, note: impl Into<String>) -> Self {
        let mut d = self.clone();
        d.note = Some(note.into());
        d
    }

    pub fn with_value(&self, value: impl Into<VoiceValue>) -> Self {
        let mut d = self.clone();
        d.value = Some(value.into());
        d
    }

    pub fn with_speed(&self, speed: f64) -> Self {
        let mut d = self.clone();
        d.speed = Some(speed);
        d
    }

    pub fn with_control(&self, name: impl Into<String>, value: impl Into<VoiceValue>) -> Self {
        let mut d = self.clone();
        d.controls.insert(name.into(), value.into());
        d
    }

    pub fn control(&self, name: &str) -> Option<&VoiceValue> {
        self.controls.get(name)
    }

    /// The value a combinator should inspect: the `value` slot when present,
    /// else the note as a string.
    pub fn effective_value(&self) -> Option<VoiceValue> {
        if let Some(v) = &self.value {
            return Some(v.clone());
        }
        self.note.as_ref().map(|n| VoiceValue::Str(n.clone()))
    }

    pub fn is_truthy(&self) -> bool {
        match self.effective_value() {
            Some(v) => v.is_truthy(),
            None => false,
        }
    }

    /// Overlay `self` on top of `base`: fields set here win, everything else
    /// falls through to `base`.
    pub fn merge_over(&self, base: &VoiceData) -> VoiceData {
        let mut out = base.clone();
        if self.note.is_some() {
            out.note = self.note.clone();
        }
        if self.value.is_some() {
            out.value = self.value.clone();
        }
        if self.speed.is_some() {
            out.speed = self.speed;
        }
        for (k, v) in &self.controls {
            out.controls.insert(k.clone(), v.clone());
        }
        out
    }
}
