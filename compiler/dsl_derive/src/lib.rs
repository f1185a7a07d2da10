//! Provides a derive macro that implements recursive visit and fold
//! operations for IR structs and enumerations.
//!
//! The macro assumes the conventions of the IR node set:
//!
//! 1. for each node type `TypeName` there exist trait methods named
//!    `visit_type_name` (on `Visitor`) and `fold_type_name` (on `Fold`)
//! 2. struct fields use at most one container (`Box`, `Option`, `Vec`)
//! 3. enum variants are unit variants or carry a single unnamed item
//!
//! Fields and variants that are not IR nodes (identifiers kept as plain
//! strings, numeric payloads, spans) must be excluded with the attribute
//! `#[traverse(skip)]`.
//!
//! For a type satisfying the conventions the macro generates two
//! inherent methods:
//!
//! ```ignore
//! pub fn traverse_visit<V: Visitor<E> + ?Sized, E>(&self, v: &mut V) -> Result<V::Value, E>
//! pub fn traverse_fold<F: Fold<E> + ?Sized, E>(self, f: &mut F) -> Result<Self, E>
//! ```

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DataEnum, DeriveInput, Fields, FieldsNamed,
    GenericArgument, Ident, PathArguments, Type,
};

/// How a field or variant wraps its node type.
enum Shape {
    Plain,
    Boxed,
    Optional,
    Sequence,
}

#[proc_macro_derive(Traverse, attributes(traverse))]
pub fn traverse_macro_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    let name = &ast.ident;

    let expanded = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => expand_struct(name, fields),
            _ => panic!("#[derive(Traverse)] requires structs with named fields"),
        },
        Data::Enum(data) => expand_enum(name, data),
        Data::Union(_) => panic!("#[derive(Traverse)] does not support unions"),
    };

    expanded.into()
}

fn expand_struct(name: &Ident, fields: &FieldsNamed) -> TokenStream2 {
    let mut visit_steps = Vec::new();
    let mut fold_inits = Vec::new();

    for field in &fields.named {
        let field_name = field.ident.as_ref().expect("named field");

        if is_skipped(&field.attrs) {
            fold_inits.push(quote! { #field_name: self.#field_name });
            continue;
        }

        let (node_ty, shape) = unwrap_type(&field.ty);
        let visit_method = method_ident("visit", &node_ty);
        let fold_method = method_ident("fold", &node_ty);

        match shape {
            Shape::Plain => {
                visit_steps.push(quote! { v.#visit_method(&self.#field_name)?; });
                fold_inits.push(quote! { #field_name: f.#fold_method(self.#field_name)? });
            }
            Shape::Boxed => {
                visit_steps.push(quote! { v.#visit_method(self.#field_name.as_ref())?; });
                fold_inits.push(quote! {
                    #field_name: Box::new(f.#fold_method(*self.#field_name)?)
                });
            }
            Shape::Optional => {
                visit_steps.push(quote! {
                    if let Some(value) = self.#field_name.as_ref() {
                        v.#visit_method(value)?;
                    }
                });
                fold_inits.push(quote! {
                    #field_name: self.#field_name.map(|x| f.#fold_method(x)).transpose()?
                });
            }
            Shape::Sequence => {
                visit_steps.push(quote! {
                    for item in self.#field_name.iter() {
                        v.#visit_method(item)?;
                    }
                });
                fold_inits.push(quote! {
                    #field_name: self
                        .#field_name
                        .into_iter()
                        .map(|x| f.#fold_method(x))
                        .collect::<Result<Vec<_>, E>>()?
                });
            }
        }
    }

    quote! {
        impl #name {
            pub fn traverse_visit<V: Visitor<E> + ?Sized, E>(
                &self,
                v: &mut V,
            ) -> Result<V::Value, E> {
                #(#visit_steps)*
                Ok(V::Value::default())
            }

            pub fn traverse_fold<F: Fold<E> + ?Sized, E>(
                self,
                f: &mut F,
            ) -> Result<#name, E> {
                Ok(#name {
                    #(#fold_inits,)*
                })
            }
        }
    }
}

fn expand_enum(name: &Ident, data: &DataEnum) -> TokenStream2 {
    let mut visit_arms = Vec::new();
    let mut fold_arms = Vec::new();

    for variant in &data.variants {
        let variant_name = &variant.ident;

        if is_skipped(&variant.attrs) || matches!(variant.fields, Fields::Unit) {
            match &variant.fields {
                Fields::Unit => {
                    visit_arms.push(quote! { #name::#variant_name => Ok(V::Value::default()) });
                    fold_arms.push(quote! { #name::#variant_name => Ok(#name::#variant_name) });
                }
                Fields::Unnamed(_) => {
                    visit_arms
                        .push(quote! { #name::#variant_name(..) => Ok(V::Value::default()) });
                    fold_arms
                        .push(quote! { #name::#variant_name(node) => Ok(#name::#variant_name(node)) });
                }
                Fields::Named(_) => panic!("Traverse enum variants must carry a single item"),
            }
            continue;
        }

        let field = match &variant.fields {
            Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => &unnamed.unnamed[0],
            _ => panic!("Traverse enum variants must carry a single unnamed item"),
        };

        let (node_ty, shape) = unwrap_type(&field.ty);
        let visit_method = method_ident("visit", &node_ty);
        let fold_method = method_ident("fold", &node_ty);

        match shape {
            Shape::Plain => {
                visit_arms.push(quote! { #name::#variant_name(node) => v.#visit_method(node) });
                fold_arms.push(quote! {
                    #name::#variant_name(node) => Ok(#name::#variant_name(f.#fold_method(node)?))
                });
            }
            Shape::Boxed => {
                visit_arms
                    .push(quote! { #name::#variant_name(node) => v.#visit_method(node.as_ref()) });
                fold_arms.push(quote! {
                    #name::#variant_name(node) => {
                        Ok(#name::#variant_name(Box::new(f.#fold_method(*node)?)))
                    }
                });
            }
            Shape::Optional => panic!("Traverse enum variants with Option are not supported"),
            Shape::Sequence => {
                visit_arms.push(quote! {
                    #name::#variant_name(nodes) => {
                        for node in nodes.iter() {
                            v.#visit_method(node)?;
                        }
                        Ok(V::Value::default())
                    }
                });
                fold_arms.push(quote! {
                    #name::#variant_name(nodes) => {
                        let folded = nodes
                            .into_iter()
                            .map(|x| f.#fold_method(x))
                            .collect::<Result<Vec<_>, E>>()?;
                        Ok(#name::#variant_name(folded))
                    }
                });
            }
        }
    }

    quote! {
        impl #name {
            pub fn traverse_visit<V: Visitor<E> + ?Sized, E>(
                &self,
                v: &mut V,
            ) -> Result<V::Value, E> {
                match self {
                    #(#visit_arms,)*
                }
            }

            pub fn traverse_fold<F: Fold<E> + ?Sized, E>(
                self,
                f: &mut F,
            ) -> Result<#name, E> {
                match self {
                    #(#fold_arms,)*
                }
            }
        }
    }
}

/// Returns true when the field or variant carries `#[traverse(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("traverse") {
            return false;
        }
        let mut skipped = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skipped = true;
            }
            Ok(())
        });
        skipped
    })
}

/// Strips one level of `Box`/`Option`/`Vec` and returns the node type
/// identifier together with the container shape.
fn unwrap_type(ty: &Type) -> (Ident, Shape) {
    let path = match ty {
        Type::Path(type_path) => &type_path.path,
        _ => panic!("Traverse fields must be plain type paths"),
    };
    let segment = path.segments.last().expect("type path segment");
    let outer = segment.ident.to_string();

    let shape = match outer.as_str() {
        "Box" => Shape::Boxed,
        "Option" => Shape::Optional,
        "Vec" => Shape::Sequence,
        _ => return (segment.ident.clone(), Shape::Plain),
    };

    let inner = match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(Type::Path(inner)) => {
                inner.path.segments.last().map(|s| s.ident.clone())
            }
            _ => None,
        }),
        _ => None,
    };

    (
        inner.unwrap_or_else(|| panic!("Traverse cannot determine element type of {}", outer)),
        shape,
    )
}

/// Produces `visit_type_name` / `fold_type_name` from a type identifier.
fn method_ident(prefix: &str, ty: &Ident) -> Ident {
    let method = format!("{}_{}", prefix, ty.to_string().to_case(Case::Snake));
    Ident::new(&method, ty.span())
}
