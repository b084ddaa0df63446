//! CMS 领域层过程宏
//!
//! - `#[aggregate]`：为聚合结构体注入簿记字段 `meta` 并实现 `Entity`；
//! - `#[payload]`：为命令载荷枚举生成稳定的事件类型名（`EventKind`）。
//!
mod aggregate;
mod derive_utils;
mod payload;
mod utils;

use proc_macro::TokenStream;

/// 聚合宏
/// - 追加字段：`meta: ::cms_domain::aggregate::AggregateMeta`（若缺失）并置于字段最前
/// - 补齐派生：`Debug, Clone, Default, PartialEq, Serialize, Deserialize`
/// - 自动实现 `::cms_domain::entity::Entity`（`new/meta/meta_mut`）
#[proc_macro_attribute]
pub fn aggregate(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate::expand(attr, item)
}

/// 命令载荷宏
///
/// 仅支持枚举。为每个变体生成事件类型名 `{prefix}.{snake_case(变体名)}`，
/// 变体可通过 `#[payload(event_type = "...")]` 覆写。
///
/// ```ignore
/// #[payload(prefix = "page")]
/// enum PageCommand {
///     Create { title: String },
///     #[payload(event_type = "page.legacy_lock")]
///     Lock,
/// }
/// ```
#[proc_macro_attribute]
pub fn payload(attr: TokenStream, item: TokenStream) -> TokenStream {
    payload::expand(attr, item)
}
