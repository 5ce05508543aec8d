//! Schema identifier normalization and structural validation.
//!
//! Every payload must carry a `$schema` before it is stored. Short forms
//! (`hep.json`, `literature`) and foreign URLs resolve to the canonical
//! fully qualified identifier `<base_url>/<name>.json`; the payload is then
//! validated with [`jsonschema`] against the registered schema document.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{json, Value};

/// Aliases accepted in place of canonical schema names.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("literature", "hep"),
    ("lit", "hep"),
    ("author", "authors"),
    ("aut", "authors"),
];

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Unknown schema: {0}")]
    Unknown(String),

    #[error("Record does not conform to {schema}: {}", errors.join("; "))]
    Invalid { schema: String, errors: Vec<String> },

    #[error("Failed to compile schema {name}: {message}")]
    Compile { name: String, message: String },

    #[error("Failed to load schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record payload must be a JSON object")]
    NotAnObject,
}

/// Resolves schema identifiers and validates records against them.
pub trait SchemaResolver: Send + Sync {
    /// Canonical fully qualified form of `identifier`.
    fn resolve(&self, identifier: &str) -> Result<String, SchemaError>;

    /// Validate `record` against the schema at canonical identifier `schema`.
    fn validate(&self, schema: &str, record: &Value) -> Result<(), SchemaError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// In-process schema registry backed by compiled `jsonschema` validators.
pub struct SchemaRegistry {
    base_url: String,
    aliases: HashMap<String, String>,
    validators: HashMap<String, jsonschema::Validator>,
}

impl SchemaRegistry {
    /// Empty registry with the default aliases.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, name)| (alias.to_string(), name.to_string()))
                .collect(),
            validators: HashMap::new(),
        }
    }

    /// Registry preloaded with minimal `hep` and `authors` schemas.
    pub fn builtin(base_url: &str) -> Result<Self, SchemaError> {
        let mut registry = Self::new(base_url);
        registry.register("hep", &builtin_hep_schema())?;
        registry.register("authors", &builtin_authors_schema())?;
        Ok(registry)
    }

    /// Load every `<name>.json` file in `dir` as schema `<name>`.
    pub fn load_dir(base_url: &str, dir: &Path) -> Result<Self, SchemaError> {
        let mut registry = Self::new(base_url);
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let schema: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
                registry.register(name, &schema)?;
            }
        }
        Ok(registry)
    }

    /// Compile and register `schema` under `name`.
    pub fn register(&mut self, name: &str, schema: &Value) -> Result<(), SchemaError> {
        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.validators.insert(name.to_string(), validator);
        Ok(())
    }

    /// Register `alias` as another spelling of schema `name`.
    pub fn add_alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_string(), name.to_string());
    }

    /// Bare schema name (`hep`) for any accepted spelling of an identifier.
    fn schema_name(&self, identifier: &str) -> Option<String> {
        let last_segment = identifier.rsplit('/').next().unwrap_or(identifier);
        let stem = last_segment.strip_suffix(".json").unwrap_or(last_segment);
        let name = self.aliases.get(stem).map(String::as_str).unwrap_or(stem);
        self.validators.contains_key(name).then(|| name.to_string())
    }
}

impl SchemaResolver for SchemaRegistry {
    fn resolve(&self, identifier: &str) -> Result<String, SchemaError> {
        let name = self
            .schema_name(identifier.trim())
            .ok_or_else(|| SchemaError::Unknown(identifier.to_string()))?;
        Ok(format!("{}/{name}.json", self.base_url))
    }

    fn validate(&self, schema: &str, record: &Value) -> Result<(), SchemaError> {
        let validator = self
            .schema_name(schema)
            .and_then(|name| self.validators.get(&name))
            .ok_or_else(|| SchemaError::Unknown(schema.to_string()))?;

        let errors: Vec<String> = validator.iter_errors(record).map(|e| e.to_string()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                schema: schema.to_string(),
                errors,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Make sure `record` carries a resolved `$schema` and conforms to it.
///
/// A missing identifier defaults to `<declared_type>.json`, where the
/// declared type is the object's data type or, failing that, its
/// workflow's default. Returns the final canonical identifier.
pub fn normalize_schema(
    record: &mut Value,
    declared_type: &str,
    resolver: &dyn SchemaResolver,
) -> Result<String, SchemaError> {
    let fields = record.as_object_mut().ok_or(SchemaError::NotAnObject)?;

    let current = match fields.get("$schema").and_then(Value::as_str) {
        Some(schema) => {
            tracing::debug!(schema, "Schema already there");
            schema.to_string()
        }
        None => {
            let schema = format!("{declared_type}.json");
            tracing::debug!(schema = %schema, "Schema set from declared type");
            schema
        }
    };

    let resolved = resolver.resolve(&current)?;
    if resolved != current {
        tracing::debug!(from = %current, to = %resolved, "Schema changed");
    }
    fields.insert("$schema".into(), Value::String(resolved.clone()));

    resolver.validate(&resolved, record)?;
    Ok(resolved)
}

fn builtin_hep_schema() -> Value {
    json!({
        "type": "object",
        "required": ["titles"],
        "properties": {
            "$schema": {"type": "string"},
            "control_number": {"type": "integer"},
            "titles": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["title"],
                    "properties": {"title": {"type": "string"}}
                }
            },
            "acquisition_source": {
                "type": "object",
                "properties": {"source": {"type": "string"}}
            },
            "documents": {"type": "array"},
            "figures": {"type": "array"},
            "deleted_records": {"type": "array"}
        }
    })
}

fn builtin_authors_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "$schema": {"type": "string"},
            "control_number": {"type": "integer"},
            "name": {
                "type": "object",
                "required": ["value"],
                "properties": {"value": {"type": "string"}}
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
