use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Field, Item, ItemStruct, Token, parse_macro_input};

/// #[aggregate] 宏实现
/// - 若缺失则追加字段 `meta: AggregateMeta` 并置于字段最前
/// - 补齐聚合所需的派生
/// - 自动实现 `::cms_domain::entity::Entity`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let attr: proc_macro2::TokenStream = attr.into();
        return syn::Error::new(attr.span(), "#[aggregate] takes no arguments")
            .to_compile_error()
            .into();
    }

    let input = parse_macro_input!(item as Item);

    let mut st: ItemStruct = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[aggregate] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    // meta 放在最前，其余字段保持原有相对顺序
    let existing_meta = fields_named
        .named
        .iter()
        .find(|f| f.ident.as_ref().is_some_and(|i| i == "meta"))
        .cloned();

    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();
    match existing_meta {
        Some(f) => new_named.push(f),
        None => new_named.push(syn::parse_quote! {
            pub meta: ::cms_domain::aggregate::AggregateMeta
        }),
    }
    for f in fields_named.named.clone() {
        if !f.ident.as_ref().is_some_and(|i| i == "meta") {
            new_named.push(f);
        }
    }
    fields_named.named = new_named;

    apply_derives(
        &mut st.attrs,
        vec![
            syn::parse_quote!(Debug),
            syn::parse_quote!(Clone),
            syn::parse_quote!(Default),
            syn::parse_quote!(PartialEq),
            syn::parse_quote!(::serde::Serialize),
            syn::parse_quote!(::serde::Deserialize),
        ],
    );

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let expanded = quote! {
        #st

        impl #impl_generics ::cms_domain::entity::Entity for #ident #ty_generics #where_clause {
            fn new(uuid: ::cms_domain::entity::AggregateId) -> Self {
                Self {
                    meta: ::cms_domain::aggregate::AggregateMeta::new(uuid),
                    ..::std::default::Default::default()
                }
            }

            fn meta(&self) -> &::cms_domain::aggregate::AggregateMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut ::cms_domain::aggregate::AggregateMeta {
                &mut self.meta
            }
        }
    };

    TokenStream::from(expanded)
}
