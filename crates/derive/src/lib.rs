//! Derive macro for `confmat_shared::EnvBind`.
//!
//! ```ignore
//! #[derive(EnvBind)]
//! #[env(prefix = "APP_")]
//! struct ServerConfig {
//!     #[env(var = "HOST")]
//!     host: String,        // APP_HOST
//!     #[env(var = "PORT")]
//!     port: u16,           // APP_PORT
//!     #[env(var = "ORIGINS")]
//!     origins: Vec<String>, // APP_ORIGINS, comma-separated
//!     timeout_secs: f64,   // no annotation, never bound
//! }
//! ```
//!
//! Field kinds are inferred from the written type: `String`, `bool`, the
//! integer primitives and `Vec<String>`. Any other annotated type is recorded
//! as unsupported and rejected by the binder when its variable is set.
//!
//! Classification is syntactic, so type aliases are not resolved: a field
//! written as `port: Port` with `type Port = u16` is unsupported. Spell the
//! primitive type on annotated fields.

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
};

/// Derive `confmat_shared::EnvBind` from `#[env(...)]` annotations.
///
/// # Container Attributes
/// - `#[env(prefix = "APP_")]` - prepended to every binding key
///
/// # Field Attributes
/// - `#[env(var = "NAME")]` - bind the field to env var `NAME`
///
/// Annotated fields must name their type directly (`u16`, not an alias of
/// it); anything unrecognized binds as unsupported.
#[proc_macro_derive(EnvBind, attributes(env))]
pub fn derive_env_bind(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand_env_bind(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_env_bind(input: &DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let prefix = parse_prefix(&input.attrs)?;
    let Data::Struct(struct_data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "EnvBind can only be derived for structs",
        ));
    };

    let fields: Vec<&syn::Field> = match &struct_data.fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &struct_data.fields,
                "EnvBind requires named fields",
            ));
        },
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    let mut slot_arms = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let var = parse_field_var(&field.attrs)?;
        let kind = field_kind(&field.ty);

        let field_name = LitStr::new(&ident.unraw().to_string(), ident.span());
        let kind_tokens = kind.descriptor_tokens();
        let var_tokens = match var.as_deref() {
            Some(var) => {
                let key = LitStr::new(&format!("{prefix}{var}"), ident.span());
                quote! { ::core::option::Option::Some(#key) }
            },
            None => quote! { ::core::option::Option::None },
        };
        descriptors.push(quote! {
            ::confmat_shared::EnvField::new(#field_name, #var_tokens, #kind_tokens)
        });

        if var.is_some() {
            let slot = kind.slot_tokens(ident);
            slot_arms.push(quote! {
                #index => ::core::option::Option::Some(#slot),
            });
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::confmat_shared::EnvBind for #name #ty_generics #where_clause {
            fn env_fields() -> &'static [::confmat_shared::EnvField] {
                const FIELDS: &[::confmat_shared::EnvField] = &[#(#descriptors),*];
                FIELDS
            }

            fn env_slot(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<::confmat_shared::FieldSlot<'_>> {
                match index {
                    #(#slot_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

fn parse_prefix(attrs: &[Attribute]) -> Result<String, syn::Error> {
    let mut prefix: Option<String> = None;
    for attr in attrs {
        if !attr.path().is_ident("env") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("prefix") {
                let value: LitStr = meta.value()?.parse()?;
                if prefix.is_some() {
                    return Err(meta.error("duplicate env(prefix = ...)"));
                }
                prefix = Some(value.value());
                return Ok(());
            }
            Err(meta.error("unsupported env attribute on container"))
        })?;
    }
    Ok(prefix.unwrap_or_default())
}

/// Returns the annotated variable name; an empty annotation counts as absent.
fn parse_field_var(attrs: &[Attribute]) -> Result<Option<String>, syn::Error> {
    let mut var: Option<String> = None;
    for attr in attrs {
        if !attr.path().is_ident("env") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("var") {
                let value: LitStr = meta.value()?.parse()?;
                if var.is_some() {
                    return Err(meta.error("duplicate env(var = ...)"));
                }
                var = Some(value.value());
                return Ok(());
            }
            Err(meta.error("unsupported env attribute on field"))
        })?;
    }
    Ok(var.filter(|var| !var.is_empty()))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Kind {
    String,
    Bool,
    Integer,
    StringList,
    Unsupported,
}

impl Kind {
    fn descriptor_tokens(self) -> proc_macro2::TokenStream {
        match self {
            Self::String => quote! { ::confmat_shared::FieldKind::String },
            Self::Bool => quote! { ::confmat_shared::FieldKind::Bool },
            Self::Integer => quote! { ::confmat_shared::FieldKind::Integer },
            Self::StringList => quote! { ::confmat_shared::FieldKind::StringList },
            Self::Unsupported => quote! { ::confmat_shared::FieldKind::Unsupported },
        }
    }

    fn slot_tokens(self, ident: &Ident) -> proc_macro2::TokenStream {
        match self {
            Self::String => quote! { ::confmat_shared::FieldSlot::String(&mut self.#ident) },
            Self::Bool => quote! { ::confmat_shared::FieldSlot::Bool(&mut self.#ident) },
            Self::Integer => quote! { ::confmat_shared::FieldSlot::Integer(&mut self.#ident) },
            Self::StringList => {
                quote! { ::confmat_shared::FieldSlot::StringList(&mut self.#ident) }
            },
            Self::Unsupported => quote! { ::confmat_shared::FieldSlot::Unsupported },
        }
    }
}

fn field_kind(ty: &Type) -> Kind {
    match ty {
        Type::Group(group) => field_kind(&group.elem),
        Type::Paren(paren) => field_kind(&paren.elem),
        Type::Path(type_path) if type_path.qself.is_none() => {
            let Some(segment) = type_path.path.segments.last() else {
                return Kind::Unsupported;
            };
            let ident = segment.ident.to_string();
            match ident.as_str() {
                "String" if segment.arguments.is_none() => Kind::String,
                "bool" => Kind::Bool,
                "u8" | "u16" | "u32" | "u64" | "u128" | "usize" | "i8" | "i16" | "i32"
                | "i64" | "i128" | "isize" => Kind::Integer,
                "Vec" if vec_of_string(&segment.arguments) => Kind::StringList,
                _ => Kind::Unsupported,
            }
        },
        _ => Kind::Unsupported,
    }
}

fn vec_of_string(arguments: &PathArguments) -> bool {
    let PathArguments::AngleBracketed(args) = arguments else {
        return false;
    };
    let mut type_args = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    });
    match (type_args.next(), type_args.next()) {
        (Some(inner), None) => field_kind(inner) == Kind::String,
        _ => false,
    }
}
