//! Field tables used to bind environment values into typed structs.
//!
//! A struct exposes two things through [`EnvBind`]:
//! - a static table of [`EnvField`] descriptors (name, kind, binding key)
//! - a typed mutable view ([`FieldSlot`]) for each annotated field
//!
//! `#[derive(EnvBind)]` generates both at compile time. Implementing the
//! trait by hand is the manual registration path.

use std::fmt;
use std::num::ParseIntError;

/// Primitive kind of a struct field, as understood by the env binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `String`.
    String,
    /// `bool`.
    Bool,
    /// Any primitive integer width.
    Integer,
    /// `Vec<String>`, filled from a comma-separated value.
    StringList,
    /// Anything else; binding a present value fails.
    Unsupported,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => formatter.write_str("string"),
            Self::Bool => formatter.write_str("bool"),
            Self::Integer => formatter.write_str("integer"),
            Self::StringList => formatter.write_str("string list"),
            Self::Unsupported => formatter.write_str("unsupported"),
        }
    }
}

/// Static descriptor for one struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvField {
    /// Rust field name.
    pub name: &'static str,
    /// Environment variable bound to the field, if annotated.
    pub var: Option<&'static str>,
    /// Declared primitive kind.
    pub kind: FieldKind,
}

impl EnvField {
    /// Build a descriptor.
    #[must_use]
    pub const fn new(name: &'static str, var: Option<&'static str>, kind: FieldKind) -> Self {
        Self { name, var, kind }
    }

    /// Binding key, treating an empty annotation as absent.
    #[must_use]
    pub fn binding_key(&self) -> Option<&'static str> {
        self.var.filter(|var| !var.is_empty())
    }
}

/// Integer field that can be assigned from base-10 text.
///
/// Parsing targets the field's own width, so out-of-range input fails
/// instead of truncating.
pub trait IntegerField {
    /// Parse `raw` and assign it on success. The field is untouched on error.
    fn set_parsed(&mut self, raw: &str) -> Result<(), ParseIntError>;
}

macro_rules! impl_integer_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntegerField for $ty {
                fn set_parsed(&mut self, raw: &str) -> Result<(), ParseIntError> {
                    *self = raw.parse::<$ty>()?;
                    Ok(())
                }
            }
        )*
    };
}

impl_integer_field!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize
);

/// Typed mutable view of a single field.
pub enum FieldSlot<'a> {
    /// String field.
    String(&'a mut String),
    /// Boolean field.
    Bool(&'a mut bool),
    /// Integer field of any width.
    Integer(&'a mut dyn IntegerField),
    /// Comma-separated list field.
    StringList(&'a mut Vec<String>),
    /// Field of a kind the binder cannot assign.
    Unsupported,
}

impl FieldSlot<'_> {
    /// Kind of the viewed field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::String(_) => FieldKind::String,
            Self::Bool(_) => FieldKind::Bool,
            Self::Integer(_) => FieldKind::Integer,
            Self::StringList(_) => FieldKind::StringList,
            Self::Unsupported => FieldKind::Unsupported,
        }
    }
}

impl fmt::Debug for FieldSlot<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("FieldSlot")
            .field(&self.kind())
            .finish()
    }
}

/// Struct whose fields can be populated from environment variables.
pub trait EnvBind {
    /// Field descriptors in declaration order.
    fn env_fields() -> &'static [EnvField];

    /// Mutable view of the field at `index` in [`EnvBind::env_fields`].
    ///
    /// Returns `None` when the index has no slot; the binder only asks for
    /// fields that carry a binding key.
    fn env_slot(&mut self, index: usize) -> Option<FieldSlot<'_>>;
}
