use crate::derive_utils::apply_derives;
use crate::utils::{AttrKvList, expect_str_lit, to_snake_case};
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, LitStr, parse::Parser};

/// #[payload] 宏实现
/// - 必填参数：`prefix = "..."`
/// - 补齐派生：`Debug, Clone, PartialEq, Serialize, Deserialize`
/// - 实现 `::cms_domain::command::EventKind`，含事件类型到变体名的反查
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let prefix = match parse_prefix(attr) {
        Ok(p) => p,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut input = syn::parse_macro_input!(item as Item);
    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(other.span(), "#[payload] can only be used on enum types")
                .to_compile_error()
                .into();
        }
    };

    let mut arms = Vec::with_capacity(enum_item.variants.len());
    let mut lookups = Vec::with_capacity(enum_item.variants.len());
    for v in &mut enum_item.variants {
        let mut override_lit: Option<LitStr> = None;
        let mut retained = Vec::with_capacity(v.attrs.len());

        for attr in &v.attrs {
            if !attr.path().is_ident("payload") {
                retained.push(attr.clone());
                continue;
            }
            let pairs = match attr.parse_args_with(AttrKvList::parse_terminated) {
                Ok(p) => p,
                Err(e) => return e.to_compile_error().into(),
            };
            for kv in pairs {
                if kv.key != "event_type" {
                    return syn::Error::new(kv.key.span(), "unknown key, expected 'event_type'")
                        .to_compile_error()
                        .into();
                }
                if override_lit.is_some() {
                    return syn::Error::new(kv.key.span(), "duplicate 'event_type' for variant")
                        .to_compile_error()
                        .into();
                }
                match expect_str_lit(&kv) {
                    Ok(lit) => override_lit = Some(lit),
                    Err(e) => return e.to_compile_error().into(),
                }
            }
        }
        v.attrs = retained;

        let v_ident = &v.ident;
        let lit = override_lit.unwrap_or_else(|| {
            let name = format!("{}.{}", prefix.value(), to_snake_case(&v_ident.to_string()));
            LitStr::new(&name, v_ident.span())
        });
        let variant = LitStr::new(&v_ident.to_string(), v_ident.span());
        arms.push(quote! { Self::#v_ident { .. } => #lit });
        lookups.push(quote! { #lit => ::core::option::Option::Some(#variant) });
    }

    apply_derives(
        &mut enum_item.attrs,
        vec![
            syn::parse_quote!(Debug),
            syn::parse_quote!(Clone),
            syn::parse_quote!(PartialEq),
            syn::parse_quote!(::serde::Serialize),
            syn::parse_quote!(::serde::Deserialize),
        ],
    );

    let enum_ident = enum_item.ident.clone();
    let generics = enum_item.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let out = quote! {
        #input

        impl #impl_generics ::cms_domain::command::EventKind for #enum_ident #ty_generics #where_clause {
            fn event_type(&self) -> &'static str {
                match self { #( #arms, )* }
            }

            fn variant_of(event_type: &str) -> ::core::option::Option<&'static str> {
                match event_type {
                    #( #lookups, )*
                    _ => ::core::option::Option::None,
                }
            }
        }
    };

    TokenStream::from(out)
}

fn parse_prefix(attr: TokenStream) -> syn::Result<LitStr> {
    let span = proc_macro2::Span::call_site();
    let pairs = AttrKvList::parse_terminated.parse(attr)?;
    let mut prefix = None;
    for kv in pairs {
        if kv.key != "prefix" {
            return Err(syn::Error::new(kv.key.span(), "unknown key, expected 'prefix'"));
        }
        prefix = Some(expect_str_lit(&kv)?);
    }
    prefix.ok_or_else(|| syn::Error::new(span, "#[payload] requires prefix = \"...\""))
}
