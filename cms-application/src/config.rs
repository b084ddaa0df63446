use bon::Builder;
use cms_domain::persist::SnapshotPolicy;

/// 命令总线配置
#[derive(Debug, Clone, Default, Builder)]
pub struct CommandBusConfig {
    /// 提交后按版本自动生成快照
    #[builder(default)]
    pub snapshot_policy: SnapshotPolicy,
    /// 监听器失败时返回错误；默认只记录日志
    #[builder(default)]
    pub strict_listeners: bool,
}
