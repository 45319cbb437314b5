//! Captured route parameters.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

/// Value stored under one parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    One(String),
    /// The name was captured more than once, in capture order.
    Many(Vec<String>),
}

impl ParamValue {
    /// The most recently captured value.
    pub fn last(&self) -> &str {
        match self {
            ParamValue::One(value) => value,
            ParamValue::Many(values) => values.last().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::One(value) => vec![value.as_str()],
            ParamValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            ParamValue::One(first) => {
                let first = std::mem::take(first);
                *self = ParamValue::Many(vec![first, value]);
            }
            ParamValue::Many(values) => values.push(value),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("route parameter {0:?} is missing")]
    Missing(String),

    #[error("route parameter {name:?} has invalid value {value:?}")]
    Invalid { name: String, value: String },
}

/// Parameters captured along the routing path, keyed by capture name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    values: BTreeMap<String, ParamValue>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Replace whatever is stored under `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), ParamValue::One(value.into()));
    }

    /// Store `value`, accumulating into a list if `name` is already present.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.values.entry(name.into()) {
            Entry::Occupied(mut existing) => existing.get_mut().push(value),
            Entry::Vacant(slot) => {
                slot.insert(ParamValue::One(value));
            }
        }
    }

    /// Fold `other` into `self`; repeated names accumulate.
    pub fn merge(&mut self, other: RouteParams) {
        for (name, value) in other.values {
            match value {
                ParamValue::One(v) => self.add(name, v),
                ParamValue::Many(vs) => {
                    for v in vs {
                        self.add(name.clone(), v);
                    }
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Latest value captured under `name`.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(ParamValue::last)
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.values
            .get(name)
            .map(ParamValue::values)
            .unwrap_or_default()
    }

    /// Parse the latest value under `name`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ParamError> {
        let value = self
            .get_str(name)
            .ok_or_else(|| ParamError::Missing(name.to_string()))?;
        value.parse().map_err(|_| ParamError::Invalid {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
