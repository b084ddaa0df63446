use super::require_text;
use crate::aggregate::Aggregate;
use crate::command::{Command, Payload};
use crate::domain_event::Event;
use crate::entity::Entity;
use crate::error::Rejection;
use cms_macros::{aggregate, payload};
use std::collections::BTreeSet;
use uuid::Uuid;

/// 后台用户。密码以哈希形式传入，领域层不做哈希计算
#[aggregate]
pub struct UserAggregate {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<Uuid>,
    pub websites: BTreeSet<i64>,
    pub avatar_url: Option<String>,
    pub secret: Option<String>,
    pub reset_token: Option<String>,
    pub deleted: bool,
}

#[payload(prefix = "user")]
pub enum UserCommand {
    Create {
        username: String,
        email: String,
        password_hash: String,
        roles: BTreeSet<Uuid>,
        websites: BTreeSet<i64>,
    },
    Edit {
        email: String,
        roles: BTreeSet<Uuid>,
        websites: BTreeSet<i64>,
        avatar_url: Option<String>,
    },
    ChangePassword {
        password_hash: String,
    },
    /// 双因素认证密钥
    GenerateSecret {
        secret: String,
    },
    RequestPasswordReset {
        reset_token: String,
    },
    Delete,
}

impl Payload for UserCommand {
    // 历史中不记录凭据
    fn message(&self) -> String {
        match self {
            Self::Create { username, .. } => format!("User \"{username}\" created"),
            Self::Edit { .. } => "User edited".to_string(),
            Self::ChangePassword { .. } => "Password changed".to_string(),
            Self::GenerateSecret { .. } => "Two-factor secret generated".to_string(),
            Self::RequestPasswordReset { .. } => "Password reset requested".to_string(),
            Self::Delete => "User deleted".to_string(),
        }
    }
}

fn require_email(email: &str) -> Result<(), Rejection> {
    require_text(email, "email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(Rejection::bad_request(format!("{email} is not a valid email"))),
    }
}

impl Aggregate for UserAggregate {
    const TYPE: &'static str = "user";
    type Command = UserCommand;

    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
        if self.deleted {
            return Err(Rejection::bad_request("user has been deleted"));
        }

        match &command.payload {
            UserCommand::Create {
                username,
                email,
                password_hash,
                ..
            } => {
                if self.exists() {
                    return Err(Rejection::conflict("user already exists"));
                }
                require_text(username, "username")?;
                require_email(email)?;
                require_text(password_hash, "password")
            }
            _ if !self.exists() => Err(Rejection::bad_request("You must choose an existing user")),
            UserCommand::Edit { email, .. } => require_email(email),
            UserCommand::ChangePassword { password_hash } => require_text(password_hash, "password"),
            UserCommand::GenerateSecret { secret } => require_text(secret, "secret"),
            UserCommand::RequestPasswordReset { reset_token } => {
                require_text(reset_token, "reset token")
            }
            UserCommand::Delete => Ok(()),
        }
    }

    fn execute(&mut self, event: &Event<Self::Command>) {
        match &event.payload {
            UserCommand::Create {
                username,
                email,
                password_hash,
                roles,
                websites,
            } => {
                self.username = username.clone();
                self.email = email.clone();
                self.password_hash = password_hash.clone();
                self.roles = roles.clone();
                self.websites = websites.clone();
            }
            UserCommand::Edit {
                email,
                roles,
                websites,
                avatar_url,
            } => {
                self.email = email.clone();
                self.roles = roles.clone();
                self.websites = websites.clone();
                self.avatar_url = avatar_url.clone();
            }
            UserCommand::ChangePassword { password_hash } => {
                self.password_hash = password_hash.clone();
                self.reset_token = None;
            }
            UserCommand::GenerateSecret { secret } => self.secret = Some(secret.clone()),
            UserCommand::RequestPasswordReset { reset_token } => {
                self.reset_token = Some(reset_token.clone());
            }
            UserCommand::Delete => {
                self.deleted = true;
                self.reset_token = None;
            }
        }
    }
}
