use syn::punctuated::Punctuated;
use syn::{Expr, Ident, Token, parse::Parse, parse::ParseStream};

/// 形如 `key = value` 的属性参数
pub(crate) struct AttrKv {
    pub(crate) key: Ident,
    pub(crate) value: Expr,
}

impl Parse for AttrKv {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let key: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        Ok(Self { key, value })
    }
}

pub(crate) type AttrKvList = Punctuated<AttrKv, Token![,]>;

/// 取字符串字面量，否则报错
pub(crate) fn expect_str_lit(kv: &AttrKv) -> syn::Result<syn::LitStr> {
    match &kv.value {
        Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(lit.clone()),
        other => Err(syn::Error::new_spanned(
            other,
            format!("expected string literal for '{}'", kv.key),
        )),
    }
}

/// `AddElement` -> `add_element`
pub(crate) fn to_snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
