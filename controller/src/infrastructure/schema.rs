// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! JSON-schema payload validation.
//!
//! Schemas are loaded once from a configured root directory at boot
//! (boot-fatal on failure) and compiled with the `jsonschema` crate. A
//! violation is reported as a [`ControllerError::Validation`] naming the
//! offending field so clients get a structured error instead of an opaque
//! failure.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;
use tracing::debug;

use crate::error::ControllerError;

pub struct SchemaSet {
    schemas: HashMap<String, Validator>,
}

impl SchemaSet {
    /// Compile every `*.json` schema under `root`, keyed by file stem.
    pub fn load(root: &Path) -> Result<Self> {
        let mut schemas = HashMap::new();
        let entries = std::fs::read_dir(root)
            .with_context(|| format!("error reading schema root {}", root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("error reading schema {}", path.display()))?;
            let schema: Value = serde_json::from_str(&raw)
                .with_context(|| format!("error parsing schema {}", path.display()))?;
            let validator = jsonschema::validator_for(&schema)
                .map_err(|e| anyhow::anyhow!("error compiling schema {}: {e}", path.display()))?;
            debug!(schema = name, "loaded schema");
            schemas.insert(name.to_string(), validator);
        }
        Ok(Self { schemas })
    }

    /// Validate `payload` against the schema named `kind`. Kinds without a
    /// schema pass; the repository is still free to reject the payload.
    pub fn validate(&self, kind: &str, payload: &Value) -> Result<(), ControllerError> {
        let Some(validator) = self.schemas.get(kind) else {
            return Ok(());
        };
        if let Err(error) = validator.validate(payload) {
            let field = offending_field(&error);
            return Err(ControllerError::validation(field, error.to_string()));
        }
        Ok(())
    }
}

/// Best field name for a violation: the missing property for `required`
/// failures, otherwise the dotted instance path.
fn offending_field(error: &jsonschema::ValidationError<'_>) -> String {
    if let ValidationErrorKind::Required { property } = error.kind() {
        if let Some(name) = property.as_str() {
            return name.to_string();
        }
    }
    error
        .instance_path()
        .to_string()
        .trim_start_matches('/')
        .replace('/', ".")
}
