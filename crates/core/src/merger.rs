//! Three-way JSON merge used by the manual merge workflow.
//!
//! Objects are merged key by key. A value changed on one side only takes
//! that side; when both sides changed it differently the head value is
//! kept and a [`Conflict`] is reported for a curator to resolve.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field both sides changed in incompatible ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// JSON pointer to the conflicting field.
    pub path: String,
    pub head: Value,
    pub update: Value,
}

/// Merge `head` and `update`, both derived from `root`.
pub fn merge(root: &Value, head: &Value, update: &Value) -> (Value, Vec<Conflict>) {
    let mut conflicts = Vec::new();
    let merged = merge_at("", Some(root), Some(head), Some(update), &mut conflicts)
        .unwrap_or(Value::Null);
    (merged, conflicts)
}

fn merge_at(
    path: &str,
    root: Option<&Value>,
    head: Option<&Value>,
    update: Option<&Value>,
    conflicts: &mut Vec<Conflict>,
) -> Option<Value> {
    if head == update || update == root {
        return head.cloned();
    }
    if head == root {
        return update.cloned();
    }

    if let (Some(Value::Object(h)), Some(Value::Object(u))) = (head, update) {
        let empty = Map::new();
        let r = root.and_then(Value::as_object).unwrap_or(&empty);
        let keys: BTreeSet<&String> = r.keys().chain(h.keys()).chain(u.keys()).collect();

        let mut merged = Map::new();
        for key in keys {
            let child = format!("{path}/{}", escape(key));
            if let Some(value) = merge_at(&child, r.get(key), h.get(key), u.get(key), conflicts) {
                merged.insert(key.clone(), value);
            }
        }
        return Some(Value::Object(merged));
    }

    conflicts.push(Conflict {
        path: if path.is_empty() { "/".into() } else { path.to_string() },
        head: head.cloned().unwrap_or(Value::Null),
        update: update.cloned().unwrap_or(Value::Null),
    });
    head.cloned()
}

/// Escape a key for use as a JSON pointer token.
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
