//! `#[register_handler(...)]` implementation.
//!
//! Leaves the decorated struct unchanged, implements `DeclaresHandlers` for it
//! and appends a `#[::herald_framework::linkme::distributed_slice]` static that
//! adds the handler to `HANDLER_CATALOG`.
//!
//! | Argument | Example | Description |
//! |----------|---------|-------------|
//! | event type | `OrderCreated` | An event the handler implements `EventHandler` for |
//! | `name` | `name = "notify"` | Catalog name (default: the type name) |
//! | `constructible` | `constructible` | Build with `Default` when the container has no registration |

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Ident, ItemStruct, LitStr, Token, Type, parse_macro_input};

/// One comma-separated argument.
enum HandlerArg {
    Event(Type),
    Name(LitStr),
    Constructible,
}

impl Parse for HandlerArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(Ident) && input.peek2(Token![=]) {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if key == "name" {
                return Ok(Self::Name(input.parse()?));
            }
            return Err(syn::Error::new(
                key.span(),
                format!("unknown argument `{key}`, expected `name`"),
            ));
        }

        let ty: Type = input.parse()?;
        match &ty {
            Type::Path(path) if path.qself.is_none() && path.path.is_ident("constructible") => {
                Ok(Self::Constructible)
            }
            _ => Ok(Self::Event(ty)),
        }
    }
}

struct HandlerArgs {
    events: Vec<Type>,
    name: Option<LitStr>,
    constructible: bool,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = HandlerArgs {
            events: Vec::new(),
            name: None,
            constructible: false,
        };
        for arg in Punctuated::<HandlerArg, Token![,]>::parse_terminated(input)? {
            match arg {
                HandlerArg::Event(ty) => args.events.push(ty),
                HandlerArg::Name(name) => args.name = Some(name),
                HandlerArg::Constructible => args.constructible = true,
            }
        }
        Ok(args)
    }
}

pub fn register_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as HandlerArgs);
    let item = parse_macro_input!(item as ItemStruct);

    if !item.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &item.generics,
            "#[register_handler] does not support generic handler types",
        )
        .into_compile_error()
        .into();
    }
    if args.events.is_empty() {
        return syn::Error::new(
            Span::call_site(),
            "#[register_handler] needs at least one event type",
        )
        .into_compile_error()
        .into();
    }

    let ident = &item.ident;
    let name = args
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let events = &args.events;
    let constructible = args.constructible.then(|| quote!(.constructible()));
    let static_name = Ident::new(
        &format!("_HERALD_HANDLER_{}", ident.to_string().to_uppercase()),
        Span::call_site(),
    );

    quote! {
        #item

        impl ::herald_framework::DeclaresHandlers for #ident {
            fn handler_type() -> ::herald_framework::HandlerType {
                ::herald_framework::HandlerType::new::<Self>()
                    #( .handles::<#events>() )*
                    .named(#name)
                    #constructible
                    .build()
            }
        }

        #[::herald_framework::linkme::distributed_slice(::herald_framework::HANDLER_CATALOG)]
        #[linkme(crate = ::herald_framework::linkme)]
        static #static_name: ::herald_framework::HandlerDescriptor =
            ::herald_framework::HandlerDescriptor {
                name: #name,
                create: <#ident as ::herald_framework::DeclaresHandlers>::handler_type,
            };
    }
    .into()
}
