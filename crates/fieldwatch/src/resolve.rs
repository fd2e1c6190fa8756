#![forbid(unsafe_code)]

//! Field resolution.
//!
//! Turns an optional list of requested field names into the concrete,
//! declaration-ordered set of watchable fields for a model. Reverse related
//! fields (many-to-many, one-to-many, reverse-relation descriptors) are
//! excluded when watching all fields and rejected when named explicitly.

use fieldwatch_core::{FieldDescriptor, ModelMeta};

use crate::error::ConnectError;

/// Resolve `requested` against `model`'s declared fields.
///
/// With `None`, every declared non-reverse field is watched. With a name
/// list, each name must exist and be watchable; duplicates collapse and the
/// result keeps declaration order. An empty result is an error either way.
///
/// No side effects.
pub fn resolve(
    model: &'static ModelMeta,
    requested: Option<&[&str]>,
) -> Result<Vec<&'static FieldDescriptor>, ConnectError> {
    let fields: Vec<&'static FieldDescriptor> = match requested {
        None => model
            .fields
            .iter()
            .filter(|f| !f.kind().is_reverse_relation())
            .collect(),
        Some(names) => {
            for name in names {
                let field = model.fields.iter().find(|f| f.name() == *name).ok_or_else(|| {
                    ConnectError::UnknownField {
                        model: model.name,
                        name: (*name).to_string(),
                    }
                })?;
                if field.kind().is_reverse_relation() {
                    return Err(ConnectError::ReverseRelation {
                        model: model.name,
                        name: field.name(),
                    });
                }
            }
            model
                .fields
                .iter()
                .filter(|f| names.contains(&f.name()))
                .collect()
        }
    };

    if fields.is_empty() {
        return Err(ConnectError::EmptyFieldSet { model: model.name });
    }
    Ok(fields)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
