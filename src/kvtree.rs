// Copyright (c) Redset Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::error::RedsetError;

/// A leaf value in a [`KVTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVValue {
    Str(String),
    Int(i64),
    Tree(KVTree),
}

/// A hierarchical string-keyed configuration tree.
///
/// Backed by a `BTreeMap` rather than a `HashMap` or `serde_json::Map` on
/// purpose: the builder iterates a config's named entries in ascending key
/// order and that order must be identical on every rank (see the Order
/// determinism property). A sorted map gives that for free instead of
/// requiring a separate sort step at every call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KVTree {
    entries: BTreeMap<String, KVValue>,
}

impl KVTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), KVValue::Str(value.into()));
        self
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.entries.insert(key.into(), KVValue::Int(value));
        self
    }

    pub fn set_tree(&mut self, key: impl Into<String>, value: KVTree) -> &mut Self {
        self.entries.insert(key.into(), KVValue::Tree(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&KVValue> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str, default: &str) -> Result<String, RedsetError> {
        match self.entries.get(key) {
            None => Ok(default.to_string()),
            Some(KVValue::Str(s)) => Ok(s.clone()),
            Some(KVValue::Int(i)) => Ok(i.to_string()),
            Some(KVValue::Tree(_)) => Err(RedsetError::ConfigInvalid(format!(
                "key {key:?} is a subtree, expected a scalar"
            ))),
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, RedsetError> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(KVValue::Int(i)) => Ok(*i),
            Some(KVValue::Str(s)) => s
                .parse::<i64>()
                .map_err(|_| RedsetError::ConfigInvalid(format!("key {key:?} is not an integer"))),
            Some(KVValue::Tree(_)) => Err(RedsetError::ConfigInvalid(format!(
                "key {key:?} is a subtree, expected a scalar"
            ))),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, RedsetError> {
        Ok(self.get_int(key, default as i64)? != 0)
    }

    /// Child subtrees in ascending key order, as the builder needs to walk
    /// them to construct a [`crate::RedDescTable`] deterministically.
    pub fn subtrees(&self) -> impl Iterator<Item = (&str, &KVTree)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            KVValue::Tree(t) => Some((k.as_str(), t)),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
