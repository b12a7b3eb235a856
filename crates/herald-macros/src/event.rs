//! `#[derive(Event)]` implementation.
//!
//! # Struct-level attribute `#[event(...)]`
//!
//! | Key | Example | Required | Description |
//! |-----|---------|----------|-------------|
//! | `name` | `"order.created"` | No | Event name (default: the type name) |
//!
//! # Field-level attribute `#[event(...)]`
//!
//! | Key | Description |
//! |-----|-------------|
//! | `parent` | Marks the embedded parent event; at most one per struct |
//!
//! A parent field makes `Event::parent` return a clone of it and adds
//! `Deref`/`DerefMut` to the parent type, so parent fields read as if they
//! were declared on the child.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, Type, spanned::Spanned};

/// Parsed struct-level `#[event(...)]`.
#[derive(Default)]
struct EventAttrs {
    name: Option<LitStr>,
}

pub fn derive_event(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = parse_event_attrs(&input.attrs)?;

    let parent = match &input.data {
        Data::Struct(data) => find_parent_field(&data.fields)?,
        Data::Enum(_) => None,
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Event cannot be derived for unions",
            ));
        }
    };

    Ok(generate(input, attrs, parent))
}

fn parse_event_attrs(attrs: &[Attribute]) -> syn::Result<EventAttrs> {
    let mut result = EventAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported event attribute, expected `name = \"...\"`"))
            }
        })?;
    }

    Ok(result)
}

fn is_parent_field(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut parent = false;

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                parent = true;
                Ok(())
            } else {
                Err(meta.error("unsupported field attribute, expected `parent`"))
            }
        })?;
    }

    Ok(parent)
}

/// Returns the accessor and type of the `#[event(parent)]` field, if any.
fn find_parent_field(fields: &Fields) -> syn::Result<Option<(TokenStream, Type)>> {
    let mut found: Option<(TokenStream, Type)> = None;

    for (index, field) in fields.iter().enumerate() {
        if !is_parent_field(&field.attrs)? {
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new(
                field.span(),
                "only one field can be marked #[event(parent)]",
            ));
        }
        let accessor = match &field.ident {
            Some(ident) => quote!(#ident),
            None => {
                let index = syn::Index::from(index);
                quote!(#index)
            }
        };
        found = Some((accessor, field.ty.clone()));
    }

    Ok(found)
}

fn generate(
    input: &DeriveInput,
    attrs: EventAttrs,
    parent: Option<(TokenStream, Type)>,
) -> TokenStream {
    let name: &Ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let event_name = attrs
        .name
        .unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));

    let (parent_impl, deref_impls) = match parent {
        Some((field, parent_ty)) => (
            quote! {
                fn parent(&self) -> ::std::option::Option<::herald_core::BoxedEvent> {
                    ::std::option::Option::Some(::herald_core::BoxedEvent::new(
                        <#parent_ty as ::std::clone::Clone>::clone(&self.#field),
                    ))
                }
            },
            quote! {
                impl #impl_generics ::std::ops::Deref for #name #ty_generics #where_clause {
                    type Target = #parent_ty;

                    #[inline]
                    fn deref(&self) -> &Self::Target {
                        &self.#field
                    }
                }

                impl #impl_generics ::std::ops::DerefMut for #name #ty_generics #where_clause {
                    #[inline]
                    fn deref_mut(&mut self) -> &mut Self::Target {
                        &mut self.#field
                    }
                }
            },
        ),
        None => (quote! {}, quote! {}),
    };

    quote! {
        impl #impl_generics ::herald_core::Event for #name #ty_generics #where_clause {
            fn event_name(&self) -> &'static str {
                #event_name
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync> {
                self
            }

            #parent_impl
        }

        #deref_impls
    }
}
