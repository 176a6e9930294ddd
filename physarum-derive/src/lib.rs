//! Derive macros for the physarum parameter table.
//!
//! The simulation is driven by a fixed-size parameter vector whose slots are
//! named by a fieldless enum. `#[derive(ParamTable)]` turns that enum into the
//! static lookup tables the rest of the crate relies on, so slot order,
//! ranges, grouping and interpolation law live next to the variant they
//! describe.
//!
//! # Usage
//!
//! The macro is re-exported from the main `physarum` crate:
//!
//! ```ignore
//! use physarum::prelude::*;
//!
//! #[derive(ParamTable, Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! pub enum ParamId {
//!     /// Distance at which the probes sample the trail.
//!     #[param(name = "sensorDistanceBase", label = "Sensor Distance Base",
//!             group = Sensing, min = 0.0, max = 100.0, step = 0.1)]
//!     SensorDistanceBase,
//!     // ...
//! }
//! ```
//!
//! # Attribute keys
//!
//! - `name = "..."` - camelCase name, also registered as an alias (required)
//! - `label = "..."` - human readable label for control panels (required)
//! - `group = Ident` - a `ParamGroup` variant (required)
//! - `min`, `max`, `step` - range expressions, cast to `f32` (required)
//! - `default = expr` - value used by legacy imports (defaults to `min`)
//! - `limit = expr` - largest value a stored vector may hold (defaults to `max`)
//! - `law = Ident` - an `InterpLaw` variant (defaults to `Linear`)
//! - `legacy = "..."` - extra alias, may be repeated
//! - `switch` - the slot is an on/off toggle rather than a slider
//!
//! Doc comments on a variant become its description.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, ExprLit, Fields, Ident, Lit, LitStr, Meta};

/// Parsed `#[param(...)]` attribute of one variant.
struct ParamAttr {
    name: Option<LitStr>,
    label: Option<LitStr>,
    group: Option<Ident>,
    min: Option<Expr>,
    max: Option<Expr>,
    step: Option<Expr>,
    default: Option<Expr>,
    limit: Option<Expr>,
    law: Option<Ident>,
    legacy: Vec<LitStr>,
    switch: bool,
    description: Vec<String>,
}

impl ParamAttr {
    fn parse(variant: &syn::Variant) -> syn::Result<Self> {
        let mut out = ParamAttr {
            name: None,
            label: None,
            group: None,
            min: None,
            max: None,
            step: None,
            default: None,
            limit: None,
            law: None,
            legacy: Vec::new(),
            switch: false,
            description: Vec::new(),
        };

        for attr in &variant.attrs {
            if attr.path().is_ident("doc") {
                if let Meta::NameValue(nv) = &attr.meta {
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = &nv.value {
                        let line = s.value().trim().to_string();
                        if !line.is_empty() {
                            out.description.push(line);
                        }
                    }
                }
                continue;
            }

            if !attr.path().is_ident("param") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    out.name = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("label") {
                    out.label = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("group") {
                    out.group = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("min") {
                    out.min = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("max") {
                    out.max = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("step") {
                    out.step = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("default") {
                    out.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("limit") {
                    out.limit = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("law") {
                    out.law = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("legacy") {
                    out.legacy.push(meta.value()?.parse()?);
                } else if meta.path.is_ident("switch") {
                    out.switch = true;
                } else {
                    return Err(meta.error("unsupported param key"));
                }
                Ok(())
            })?;
        }

        let span = variant.ident.span();
        if out.name.is_none() {
            return Err(syn::Error::new(span, "param attribute requires `name`"));
        }
        if out.label.is_none() {
            return Err(syn::Error::new(span, "param attribute requires `label`"));
        }
        if out.group.is_none() {
            return Err(syn::Error::new(span, "param attribute requires `group`"));
        }
        if out.min.is_none() || out.max.is_none() || out.step.is_none() {
            return Err(syn::Error::new(span, "param attribute requires `min`, `max` and `step`"));
        }

        Ok(out)
    }
}

/// Derive macro for the parameter slot enum.
///
/// Variants are assigned slot indices in declaration order starting from 0.
///
/// # Generated Items
///
/// For an enum `ParamId`:
///
/// - `ParamId::COUNT` and `ParamId::ALL` - number of slots and every slot in order
/// - `ParamId::index()` / `ParamId::from_index()` - slot index conversion
/// - `ParamId::name()` - camelCase name
/// - `ParamId::legacy_names()` - additional aliases from `legacy = "..."`
/// - `ParamId::spec()` - a `physarum::params::ParamSpec` with range and metadata
///
/// # Panics
///
/// The macro panics at compile time if it is applied to a struct or if any
/// variant carries fields. Missing attribute keys are reported as compile
/// errors on the offending variant.
#[proc_macro_derive(ParamTable, attributes(param))]
pub fn derive_param_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => panic!("ParamTable derive only supports enums"),
    };

    for variant in variants.iter() {
        if !matches!(variant.fields, Fields::Unit) {
            panic!(
                "ParamTable enum variants must be unit variants (no fields). \
                 Found fields on variant '{}'",
                variant.ident
            );
        }
    }

    let mut attrs = Vec::with_capacity(variants.len());
    for variant in variants.iter() {
        match ParamAttr::parse(variant) {
            Ok(attr) => attrs.push(attr),
            Err(e) => return TokenStream::from(e.to_compile_error()),
        }
    }

    let count = variants.len();
    let idents: Vec<_> = variants.iter().map(|v| &v.ident).collect();

    let index_arms = idents.iter().enumerate().map(|(i, ident)| {
        quote! { #name::#ident => #i }
    });

    let from_index_arms = idents.iter().enumerate().map(|(i, ident)| {
        quote! { #i => Some(#name::#ident) }
    });

    let name_arms = idents.iter().zip(&attrs).map(|(ident, attr)| {
        let camel = attr.name.as_ref();
        quote! { #name::#ident => #camel }
    });

    let legacy_arms = idents.iter().zip(&attrs).map(|(ident, attr)| {
        let legacy = &attr.legacy;
        quote! { #name::#ident => &[#(#legacy),*] }
    });

    let spec_arms = idents.iter().zip(&attrs).map(|(ident, attr)| {
        let label = attr.label.as_ref();
        let description = attr.description.join(" ");
        let group = attr.group.as_ref();
        let min = attr.min.as_ref();
        let max = attr.max.as_ref();
        let step = attr.step.as_ref();
        let default = attr.default.as_ref().or(attr.min.as_ref());
        let limit = attr.limit.as_ref().or(attr.max.as_ref());
        let law = attr
            .law
            .clone()
            .unwrap_or_else(|| Ident::new("Linear", proc_macro2::Span::call_site()));
        let input_kind = if attr.switch {
            quote! { physarum::params::ParamInput::Switch }
        } else {
            quote! { physarum::params::ParamInput::Slider }
        };

        quote! {
            #name::#ident => physarum::params::ParamSpec {
                id: #name::#ident,
                label: #label,
                description: #description,
                group: physarum::params::ParamGroup::#group,
                min: (#min) as f32,
                max: (#max) as f32,
                step: (#step) as f32,
                default: (#default) as f32,
                limit: (#limit) as f32,
                law: physarum::params::InterpLaw::#law,
                input: #input_kind,
            }
        }
    });

    let expanded = quote! {
        impl #name {
            /// Number of slots in the parameter vector.
            pub const COUNT: usize = #count;

            /// Every slot, in index order.
            pub const ALL: [#name; #count] = [#(#name::#idents),*];

            /// Slot index of this parameter.
            pub const fn index(self) -> usize {
                match self {
                    #(#index_arms),*
                }
            }

            /// Parameter stored at `index`, if any.
            pub const fn from_index(index: usize) -> Option<Self> {
                match index {
                    #(#from_index_arms,)*
                    _ => None,
                }
            }

            /// camelCase name of this parameter.
            pub const fn name(self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }

            /// Additional names this parameter answers to.
            pub const fn legacy_names(self) -> &'static [&'static str] {
                match self {
                    #(#legacy_arms),*
                }
            }

            /// Range, grouping and interpolation metadata for this parameter.
            pub fn spec(self) -> physarum::params::ParamSpec {
                match self {
                    #(#spec_arms),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
