use cms_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    #[error("listener {listener} failed on {event_type}: {reason}")]
    Listener {
        listener: String,
        event_type: String,
        reason: String,
    },
}

impl AppError {
    /// 面向展示层的消息码（400/409），其余错误为 `None`
    pub fn code(&self) -> Option<u16> {
        match self {
            AppError::Domain(err) => err.code(),
            _ => None,
        }
    }

    /// 追加时的版本竞争，调用方可重新读取后重试
    pub fn is_store_conflict(&self) -> bool {
        matches!(self, AppError::Domain(err) if err.is_store_conflict())
    }
}

pub type AppResult<T> = Result<T, AppError>;
