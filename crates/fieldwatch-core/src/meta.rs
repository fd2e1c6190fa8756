#![forbid(unsafe_code)]

//! Static model and field metadata.
//!
//! A [`ModelMeta`] describes one record type: a stable name plus its declared
//! fields in declaration order. Metadata lives in `static` items and is built
//! with `const` constructors, so a model definition is a plain data literal:
//!
//! ```
//! use fieldwatch_core::{FieldDescriptor, ModelMeta, normalize};
//!
//! static ARTICLE: ModelMeta = ModelMeta {
//!     name: "article",
//!     fields: &[
//!         FieldDescriptor::scalar("title"),
//!         FieldDescriptor::scalar("published_at").with_normalizer(normalize::datetime),
//!         FieldDescriptor::many_to_many("tags"),
//!     ],
//! };
//!
//! assert_eq!(ARTICLE.fields.len(), 3);
//! assert!(ARTICLE.field("title").is_some());
//! ```

use crate::normalize::{self, NormalizeError, Normalizer};
use crate::record::Record;
use crate::value::Value;

/// What kind of declared field a descriptor names.
///
/// Relationship-reverse kinds (`ManyToMany`, `OneToMany`, `ReverseRelation`)
/// have no stable scalar value and cannot be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    ManyToMany,
    OneToMany,
    ReverseRelation,
}

impl FieldKind {
    /// Whether this kind is the "many" side of a relationship, with no
    /// independent scalar value to track.
    #[inline]
    #[must_use]
    pub const fn is_reverse_relation(self) -> bool {
        matches!(
            self,
            Self::ManyToMany | Self::OneToMany | Self::ReverseRelation
        )
    }
}

/// One declared field of a record type.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    name: &'static str,
    kind: FieldKind,
    normalize: Normalizer,
}

impl FieldDescriptor {
    /// A plain scalar field with the identity normalizer.
    #[must_use]
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
            normalize: normalize::identity,
        }
    }

    /// A many-to-many relationship field (not watchable).
    #[must_use]
    pub const fn many_to_many(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::ManyToMany,
            normalize: normalize::identity,
        }
    }

    /// A one-to-many relationship field (not watchable).
    #[must_use]
    pub const fn one_to_many(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::OneToMany,
            normalize: normalize::identity,
        }
    }

    /// A reverse-relation descriptor (not watchable).
    #[must_use]
    pub const fn reverse_relation(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::ReverseRelation,
            normalize: normalize::identity,
        }
    }

    /// Attach a canonicalizing normalizer to this field.
    #[must_use]
    pub const fn with_normalizer(mut self, normalize: Normalizer) -> Self {
        self.normalize = normalize;
        self
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Read this field's current raw value from an instance.
    ///
    /// Reads go through [`Record::raw_value`], so relationships are never
    /// traversed.
    #[must_use]
    pub fn value_from_object(&self, instance: &dyn Record) -> Value {
        instance.raw_value(self.name)
    }

    /// Convert a raw representation into the canonical comparable form.
    pub fn normalize(&self, raw: Value) -> Result<Value, NormalizeError> {
        (self.normalize)(raw)
    }
}

/// Static metadata for one record type.
#[derive(Debug)]
pub struct ModelMeta {
    /// Stable model name; registrations and bus subscriptions key on it, so
    /// it must be unique across the host application.
    pub name: &'static str,
    /// Declared fields, in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl ModelMeta {
    /// Look up a declared field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
