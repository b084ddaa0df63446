use super::require_text;
use crate::aggregate::Aggregate;
use crate::command::{Command, Payload};
use crate::domain_event::Event;
use crate::entity::Entity;
use crate::error::Rejection;
use cms_macros::{aggregate, payload};

/// 文件：替换二进制只更新路径等元信息，历史保留每一次替换
#[aggregate]
pub struct File {
    pub title: String,
    pub path: String,
    pub mime_type: String,
    pub size: u64,
    pub language: String,
    pub website: Option<i64>,
    pub deleted: bool,
}

#[payload(prefix = "file")]
pub enum FileCommand {
    Create {
        title: String,
        path: String,
        mime_type: String,
        size: u64,
        language: String,
        website: Option<i64>,
    },
    Rename {
        title: String,
    },
    Replace {
        path: String,
        mime_type: String,
        size: u64,
    },
    Delete,
}

impl Payload for FileCommand {
    fn message(&self) -> String {
        match self {
            Self::Create { title, .. } => format!("File \"{title}\" uploaded"),
            Self::Rename { title } => format!("File renamed to \"{title}\""),
            Self::Replace { path, .. } => format!("File replaced by {path}"),
            Self::Delete => "File deleted".to_string(),
        }
    }
}

impl Aggregate for File {
    const TYPE: &'static str = "file";
    type Command = FileCommand;

    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
        if self.deleted {
            return Err(Rejection::bad_request("file has been deleted"));
        }

        match &command.payload {
            FileCommand::Create { title, path, .. } => {
                if self.exists() {
                    return Err(Rejection::conflict("file already exists"));
                }
                require_text(title, "title")?;
                require_text(path, "path")
            }
            _ if !self.exists() => Err(Rejection::bad_request("You must choose an existing file")),
            FileCommand::Rename { title } => require_text(title, "title"),
            FileCommand::Replace { path, .. } => {
                require_text(path, "path")?;
                if *path == self.path {
                    return Err(Rejection::conflict("file already points to this path"));
                }
                Ok(())
            }
            FileCommand::Delete => Ok(()),
        }
    }

    fn execute(&mut self, event: &Event<Self::Command>) {
        match &event.payload {
            FileCommand::Create {
                title,
                path,
                mime_type,
                size,
                language,
                website,
            } => {
                self.title = title.clone();
                self.path = path.clone();
                self.mime_type = mime_type.clone();
                self.size = *size;
                self.language = language.clone();
                self.website = *website;
            }
            FileCommand::Rename { title } => self.title = title.clone(),
            FileCommand::Replace {
                path,
                mime_type,
                size,
            } => {
                self.path = path.clone();
                self.mime_type = mime_type.clone();
                self.size = *size;
            }
            FileCommand::Delete => self.deleted = true,
        }
    }
}
