//! Validated inference options (`options` field of generate, chat and embed
//! requests).
//!
//! Each option has a fixed type and range; a set only ever holds values that
//! passed validation, and a failed assignment leaves it untouched.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::session::error::{Error, Result};

/// The recognised option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionName {
    NumKeep,
    Seed,
    NumPredict,
    TopK,
    TopP,
    MinP,
    TypicalP,
    RepeatLastN,
    Temperature,
    RepeatPenalty,
    PresencePenalty,
    FrequencyPenalty,
    PenalizeNewline,
    Numa,
    NumCtx,
    NumBatch,
    NumGpu,
    MainGpu,
    UseMmap,
    NumThread,
}

/// Type and admissible range of an option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    /// Non-negative integer.
    Count,
    /// Float within `[min, max]`.
    Float { min: f64, max: f64 },
    Boolean,
}

impl OptionName {
    pub const ALL: [OptionName; 20] = [
        OptionName::NumKeep,
        OptionName::Seed,
        OptionName::NumPredict,
        OptionName::TopK,
        OptionName::TopP,
        OptionName::MinP,
        OptionName::TypicalP,
        OptionName::RepeatLastN,
        OptionName::Temperature,
        OptionName::RepeatPenalty,
        OptionName::PresencePenalty,
        OptionName::FrequencyPenalty,
        OptionName::PenalizeNewline,
        OptionName::Numa,
        OptionName::NumCtx,
        OptionName::NumBatch,
        OptionName::NumGpu,
        OptionName::MainGpu,
        OptionName::UseMmap,
        OptionName::NumThread,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OptionName::NumKeep => "num_keep",
            OptionName::Seed => "seed",
            OptionName::NumPredict => "num_predict",
            OptionName::TopK => "top_k",
            OptionName::TopP => "top_p",
            OptionName::MinP => "min_p",
            OptionName::TypicalP => "typical_p",
            OptionName::RepeatLastN => "repeat_last_n",
            OptionName::Temperature => "temperature",
            OptionName::RepeatPenalty => "repeat_penalty",
            OptionName::PresencePenalty => "presence_penalty",
            OptionName::FrequencyPenalty => "frequency_penalty",
            OptionName::PenalizeNewline => "penalize_newline",
            OptionName::Numa => "numa",
            OptionName::NumCtx => "num_ctx",
            OptionName::NumBatch => "num_batch",
            OptionName::NumGpu => "num_gpu",
            OptionName::MainGpu => "main_gpu",
            OptionName::UseMmap => "use_mmap",
            OptionName::NumThread => "num_thread",
        }
    }

    pub fn kind(self) -> OptionKind {
        match self {
            OptionName::TopP | OptionName::MinP | OptionName::TypicalP => {
                OptionKind::Float { min: 0.0, max: 1.0 }
            }
            OptionName::Temperature => OptionKind::Float { min: 0.0, max: 2.0 },
            OptionName::RepeatPenalty
            | OptionName::PresencePenalty
            | OptionName::FrequencyPenalty => OptionKind::Float { min: 0.0, max: f64::INFINITY },
            OptionName::PenalizeNewline | OptionName::Numa | OptionName::UseMmap => {
                OptionKind::Boolean
            }
            _ => OptionKind::Count,
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OptionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::validation(format!("unknown option '{s}'")))
    }
}

/// A scalar option value before or after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Integer(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Integer(v.into())
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Integer(v.into())
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<f32> for OptionValue {
    fn from(v: f32) -> Self {
        OptionValue::Float(v.into())
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Boolean(v)
    }
}

impl OptionValue {
    /// Converts a JSON value; `null` means "no value".
    pub fn from_json(name: OptionName, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(OptionValue::Boolean(*b))),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(OptionValue::Integer(i)))
                } else if let Some(f) = n.as_f64() {
                    Ok(Some(OptionValue::Float(f)))
                } else {
                    Err(Error::validation(format!("option '{name}' is out of range")))
                }
            }
            other => Err(Error::validation(format!(
                "option '{name}' must be a number or boolean, got {other}"
            ))),
        }
    }

    fn to_json(self) -> Value {
        match self {
            OptionValue::Integer(i) => Value::Number(i.into()),
            OptionValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            OptionValue::Boolean(b) => Value::Bool(b),
        }
    }

    /// Checks `self` against `name`'s type and range and returns the value in
    /// its canonical representation.
    fn validate(self, name: OptionName) -> Result<Self> {
        match (name.kind(), self) {
            (OptionKind::Count, OptionValue::Integer(i)) if i >= 0 => Ok(self),
            (OptionKind::Count, OptionValue::Float(f))
                if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= i64::MAX as f64 =>
            {
                Ok(OptionValue::Integer(f as i64))
            }
            (OptionKind::Count, _) => Err(Error::validation(format!(
                "option '{name}' must be a non-negative integer"
            ))),
            (OptionKind::Float { min, max }, value) => {
                let f = match value {
                    OptionValue::Integer(i) => i as f64,
                    OptionValue::Float(f) => f,
                    OptionValue::Boolean(_) => {
                        return Err(Error::validation(format!("option '{name}' must be a number")))
                    }
                };
                if f.is_finite() && (min..=max).contains(&f) {
                    Ok(OptionValue::Float(f))
                } else if max.is_infinite() {
                    Err(Error::validation(format!("option '{name}' must be >= {min}")))
                } else {
                    Err(Error::validation(format!(
                        "option '{name}' must be within [{min}, {max}]"
                    )))
                }
            }
            (OptionKind::Boolean, OptionValue::Boolean(_)) => Ok(self),
            (OptionKind::Boolean, _) => {
                Err(Error::validation(format!("option '{name}' must be a boolean")))
            }
        }
    }
}

/// The options currently in force. Absent keys fall back to the server default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct OptionsSet {
    values: BTreeMap<OptionName, OptionValue>,
}

impl OptionsSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores `value`, replacing any previous one.
    pub fn set<V: Into<OptionValue>>(&mut self, name: OptionName, value: V) -> Result<()> {
        let value = value.into().validate(name)?;
        self.values.insert(name, value);
        Ok(())
    }

    /// Stores `value`, or removes `name` when `value` is `None`.
    pub fn assign(&mut self, name: OptionName, value: Option<OptionValue>) -> Result<()> {
        match value {
            Some(v) => self.set(name, v),
            None => {
                self.values.remove(&name);
                Ok(())
            }
        }
    }

    /// Like [`assign`](Self::assign) with the option given by its wire name.
    pub fn assign_by_name(&mut self, name: &str, value: Option<OptionValue>) -> Result<()> {
        self.assign(name.parse()?, value)
    }

    pub fn remove(&mut self, name: OptionName) -> Option<OptionValue> {
        self.values.remove(&name)
    }

    pub fn get(&self, name: OptionName) -> Option<OptionValue> {
        self.values.get(&name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionName, OptionValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// The present options as a JSON object, or `None` when nothing is set so
    /// that requests omit the field entirely.
    pub fn to_wire(&self) -> Option<Map<String, Value>> {
        if self.values.is_empty() {
            return None;
        }
        Some(Map::from(self.clone()))
    }
}

impl From<OptionsSet> for Map<String, Value> {
    fn from(set: OptionsSet) -> Self {
        set.values
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_json()))
            .collect()
    }
}

impl TryFrom<Map<String, Value>> for OptionsSet {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut set = OptionsSet::new();
        for (key, value) in &map {
            let name: OptionName = key.parse()?;
            set.assign(name, OptionValue::from_json(name, value)?)?;
        }
        Ok(set)
    }
}
