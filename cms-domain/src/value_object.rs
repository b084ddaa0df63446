//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!
use crate::error::Rejection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 同级移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// 栅格断点
///
/// 列宽保存在元素数据的 `width{后缀}` 键下：
///
/// ```
/// use cms_domain::value_object::Breakpoint;
///
/// assert_eq!(Breakpoint::Md.data_key(), "widthMd");
/// assert_eq!(Breakpoint::Xs.suffix(), "Xs");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 5] = [Self::Xs, Self::Sm, Self::Md, Self::Lg, Self::Xl];

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Xs => "Xs",
            Self::Sm => "Sm",
            Self::Md => "Md",
            Self::Lg => "Lg",
            Self::Xl => "Xl",
        }
    }

    pub fn data_key(self) -> String {
        format!("width{}", self.suffix())
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// 栅格列宽（1..=12）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnWidth(pub u8);

impl ColumnWidth {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 12;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl ValueObject for ColumnWidth {
    type Error = Rejection;

    fn validate(&self) -> Result<(), Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&self.0) {
            Ok(())
        } else {
            Err(Rejection::bad_request(format!(
                "column width must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                self.0
            )))
        }
    }
}

impl fmt::Display for ColumnWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
