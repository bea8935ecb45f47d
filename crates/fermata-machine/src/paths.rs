// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Data-path selectors for input/output mapping.
//!
//! Paths are the dotted subset used by machine definitions: `$` selects the
//! whole event, `$.a.b` selects nested object fields. Array indexing and
//! filters are not part of the format.

use serde_json::{Map, Value};

use crate::error::MachineError;

/// Parse a path into its field segments. `$` parses to no segments.
pub(crate) fn parse(path: &str) -> Result<Vec<&str>, MachineError> {
    if path == "$" {
        return Ok(Vec::new());
    }

    let rest = path
        .strip_prefix("$.")
        .ok_or_else(|| MachineError::InvalidPath {
            path: path.to_string(),
        })?;

    let segments: Vec<&str> = rest.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(MachineError::InvalidPath {
            path: path.to_string(),
        });
    }

    Ok(segments)
}

/// Select the sub-value named by `path`. Missing fields select `null`.
pub fn select(value: &Value, path: &str) -> Result<Value, MachineError> {
    let mut current = value;
    for segment in parse(path)? {
        current = current.get(segment).unwrap_or(&Value::Null);
    }
    Ok(current.clone())
}

/// Place `replacement` at the location named by `path`, creating
/// intermediate objects as needed. A `$` path replaces the whole target.
pub fn inject(target: &mut Value, path: &str, replacement: Value) -> Result<(), MachineError> {
    let segments = parse(path)?;

    let Some((last, parents)) = segments.split_last() else {
        *target = replacement;
        return Ok(());
    };

    let mut current = target;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current.as_object_mut() {
            Some(object) => object
                .entry(segment.to_string())
                .or_insert(Value::Null),
            None => {
                return Err(MachineError::InvalidPath {
                    path: path.to_string(),
                });
            }
        };
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(object) = current.as_object_mut() {
        object.insert(last.to_string(), replacement);
    }

    Ok(())
}
