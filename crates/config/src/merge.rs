//! Decoding a JSON document on top of an existing value.
//!
//! [`Overlay`] is a deserializer over two layers: the serialized current value
//! (`base`) and the document (`patch`). The target type drives the merge:
//! - structs: document keys are matched against the struct's field names,
//!   exact first, then case-insensitively; fields the document omits keep
//!   their base value and nested structs merge recursively
//! - maps: existing entries are kept, document entries are added or replace
//!   the entry with the exact same key
//! - everything else (enums, sequences, scalars): the document value replaces
//!   the base value

use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, Unexpected,
    VariantAccess, Visitor,
};
use serde::{Deserializer, forward_to_deserialize_any};
use serde_json::{Map, Value};

/// Deserialize `T` from `document` layered over `current`.
pub(crate) fn decode_onto<T>(current: Value, document: Value) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned,
{
    <T as serde::Deserialize>::deserialize(Overlay {
        base: Some(current),
        patch: Some(document),
    })
}

pub(crate) struct Overlay {
    base: Option<Value>,
    patch: Option<Value>,
}

impl Overlay {
    const fn replace(value: Value) -> Self {
        Self {
            base: None,
            patch: Some(value),
        }
    }

    const fn keep(value: Value) -> Self {
        Self {
            base: Some(value),
            patch: None,
        }
    }

    fn into_effective(self) -> Value {
        self.patch.or(self.base).unwrap_or(Value::Null)
    }

    fn is_null(&self) -> bool {
        match &self.patch {
            Some(patch) => patch.is_null(),
            None => self.base.as_ref().is_none_or(Value::is_null),
        }
    }
}

impl<'de> Deserializer<'de> for Overlay {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.into_effective() {
            Value::Null => visitor.visit_unit(),
            Value::Bool(value) => visitor.visit_bool(value),
            Value::Number(number) => number.deserialize_any(visitor),
            Value::String(value) => visitor.visit_string(value),
            Value::Array(items) => {
                let mut seq = SeqDeserializer::<_, serde_json::Error>::new(
                    items.into_iter().map(Self::replace),
                );
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            },
            Value::Object(entries) => visit_entries(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::replace(value))),
                visitor,
            ),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if self.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match (self.base, self.patch) {
            (Some(Value::Object(mut entries)), Some(Value::Object(patch))) => {
                entries.extend(patch);
                visit_entries(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key, Self::replace(value))),
                    visitor,
                )
            },
            (base, patch) => Self { base, patch }.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match (self.base, self.patch) {
            (base, Some(Value::Object(patch))) => {
                let base = match base {
                    Some(Value::Object(base)) => base,
                    _ => Map::new(),
                };
                visit_entries(overlay_fields(base, patch, fields).into_iter(), visitor)
            },
            (Some(Value::Object(base)), None) => visit_entries(
                base.into_iter().map(|(key, value)| (key, Self::keep(value))),
                visitor,
            ),
            (base, patch) => Self { base, patch }.deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.into_effective() {
            Value::String(variant) => {
                let variant: StringDeserializer<serde_json::Error> = variant.into_deserializer();
                visitor.visit_enum(variant)
            },
            Value::Object(entries) => {
                let mut entries = entries.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((variant, value)), None) => visitor.visit_enum(VariantOverlay {
                        variant,
                        value: Self::replace(value),
                    }),
                    _ => Err(de::Error::invalid_value(
                        Unexpected::Map,
                        &"map with a single key",
                    )),
                }
            },
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"string or map",
            )),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct identifier ignored_any
    }
}

impl IntoDeserializer<'_, serde_json::Error> for Overlay {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

struct VariantOverlay {
    variant: String,
    value: Overlay,
}

impl<'de> EnumAccess<'de> for VariantOverlay {
    type Error = serde_json::Error;
    type Variant = Overlay;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, Overlay), Self::Error> {
        let variant: StringDeserializer<serde_json::Error> = self.variant.into_deserializer();
        Ok((seed.deserialize(variant)?, self.value))
    }
}

impl<'de> VariantAccess<'de> for Overlay {
    type Error = serde_json::Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.into_effective() {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"unit variant",
            )),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_any(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_struct("", fields, visitor)
    }
}

fn visit_entries<'de, I, V>(entries: I, visitor: V) -> Result<V::Value, serde_json::Error>
where
    I: Iterator<Item = (String, Overlay)>,
    V: Visitor<'de>,
{
    let mut map = MapDeserializer::<_, serde_json::Error>::new(entries);
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

/// Pair base entries with the document entries addressing the same field.
///
/// Folded matches are applied before exact ones, so an exact key wins when a
/// document spells the same field twice.
fn overlay_fields(
    base: Map<String, Value>,
    patch: Map<String, Value>,
    fields: &[&str],
) -> Vec<(String, Overlay)> {
    let (exact, folded): (Vec<_>, Vec<_>) = patch
        .into_iter()
        .map(|(key, value)| {
            let (field, is_exact) = resolve_field(fields, key);
            (field, value, is_exact)
        })
        .partition(|(_, _, is_exact)| *is_exact);

    let mut patched = Map::new();
    for (field, value, _) in folded.into_iter().chain(exact) {
        patched.insert(field, value);
    }

    let mut entries = Vec::with_capacity(base.len() + patched.len());
    for (key, value) in base {
        let patch = patched.remove(&key);
        entries.push((
            key,
            Overlay {
                base: Some(value),
                patch,
            },
        ));
    }
    entries.extend(
        patched
            .into_iter()
            .map(|(key, value)| (key, Overlay::replace(value))),
    );
    entries
}

/// Field name addressed by a document key, and whether the match was exact.
/// Keys matching no field are passed through unchanged.
fn resolve_field(fields: &[&str], key: String) -> (String, bool) {
    if fields.contains(&key.as_str()) {
        return (key, true);
    }
    match fields.iter().find(|field| keys_match(field, &key)) {
        Some(field) => ((*field).to_owned(), false),
        None => (key, true),
    }
}

fn keys_match(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(value) => Unexpected::Bool(*value),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(value) => Unexpected::Str(value),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}
