use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    // Extract #[record(collection = "...", requires = "...")] from
    // struct-level attributes
    let RecordOptions { collection, requires } = extract_options(&input);
    let requires = match requires {
        Some(capability) => quote! {
            ::core::option::Option::Some(tracknest::Capability::#capability)
        },
        None => quote! { ::core::option::Option::None },
    };

    // The field marked with #[record(id)], or the one named "id"
    let id_field = match extract_id_field(&input) {
        Ok(field) => field,
        Err(err) => return err.to_compile_error().into(),
    };
    let id_ident = &id_field.ident;
    let id_ty = &id_field.ty;

    let expanded = quote! {
        impl tracknest::Record for #name {
            type Id = #id_ty;

            const COLLECTION: &'static str = #collection;

            const REQUIRES: ::core::option::Option<tracknest::Capability> = #requires;

            fn id(&self) -> &Self::Id {
                &self.#id_ident
            }

            fn set_id(&mut self, id: Self::Id) {
                self.#id_ident = id;
            }
        }
    };

    TokenStream::from(expanded)
}

struct RecordOptions {
    collection: String,
    requires: Option<Ident>,
}

fn extract_options(input: &DeriveInput) -> RecordOptions {
    let mut collection = None;
    let mut requires = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("collection") {
                let value: LitStr = meta.value()?.parse()?;
                collection = Some(value.value());
            } else if meta.path.is_ident("requires") {
                let value: LitStr = meta.value()?.parse()?;
                requires = Some(Ident::new(&value.value(), value.span()));
            }
            Ok(())
        });
    }

    // Default: snake_case struct name + "s"
    let collection = collection.unwrap_or_else(|| format!("{}s", to_snake_case(&input.ident.to_string())));
    RecordOptions { collection, requires }
}

fn extract_id_field(input: &DeriveInput) -> syn::Result<Field> {
    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record derive: only structs with named fields are supported",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record derive: only structs are supported",
            ))
        }
    };

    for field in &fields.named {
        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            let mut is_id = false;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                }
                Ok(())
            })?;
            if is_id {
                return Ok(field.clone());
            }
        }
    }

    fields
        .named
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == "id"))
        .cloned()
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &input.ident,
                "Record derive: no field marked with #[record(id)] and no field named `id`",
            )
        })
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
