use cms_domain::domain_event::EventMetadata;

/// 应用层上下文（Application Context）
///
/// 承载一次命令调用的事件元数据（`EventMetadata`）：关联追踪 `correlation_id`、
/// 因果链 `causation_id` 与来源地址，原样写入派生出的事件。
///
/// ```rust
/// use cms_application::context::AppContext;
/// use cms_domain::domain_event::EventMetadata;
///
/// let ctx = AppContext {
///     metadata: EventMetadata::builder()
///         .correlation_id("cor-123")
///         .ip_address("10.0.0.1")
///         .build(),
/// };
/// assert_eq!(ctx.metadata.correlation_id(), Some("cor-123"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub metadata: EventMetadata,
}
