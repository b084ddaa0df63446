use super::require_text;
use crate::aggregate::Aggregate;
use crate::command::{Command, Payload};
use crate::domain_event::Event;
use crate::entity::Entity;
use crate::error::Rejection;
use cms_macros::{aggregate, payload};
use std::collections::BTreeSet;

/// 角色：权限字符串只做记录，授权策略不在领域层
#[aggregate]
pub struct Role {
    pub title: String,
    pub permissions: BTreeSet<String>,
}

#[payload(prefix = "role")]
pub enum RoleCommand {
    Create {
        title: String,
        permissions: BTreeSet<String>,
    },
    Edit {
        title: String,
        permissions: BTreeSet<String>,
    },
}

impl Payload for RoleCommand {
    fn message(&self) -> String {
        match self {
            Self::Create { title, .. } => format!("Role \"{title}\" created"),
            Self::Edit { title, .. } => format!("Role \"{title}\" edited"),
        }
    }
}

impl Aggregate for Role {
    const TYPE: &'static str = "role";
    type Command = RoleCommand;

    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
        match &command.payload {
            RoleCommand::Create { title, .. } => {
                if self.exists() {
                    return Err(Rejection::conflict("role already exists"));
                }
                require_text(title, "title")
            }
            RoleCommand::Edit { title, .. } => {
                if !self.exists() {
                    return Err(Rejection::bad_request("You must choose an existing role"));
                }
                require_text(title, "title")
            }
        }
    }

    fn execute(&mut self, event: &Event<Self::Command>) {
        match &event.payload {
            RoleCommand::Create { title, permissions } | RoleCommand::Edit { title, permissions } => {
                self.title = title.clone();
                self.permissions = permissions.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::EventMetadata;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn run(role: &mut Role, payload: RoleCommand) -> Result<(), Rejection> {
        let command = Command::new(1, role.uuid(), role.version(), payload);
        role.validate(&command)?;
        let event = Event::from_command::<Role>(&command, Utc::now(), EventMetadata::default());
        role.apply(&event, None);
        Ok(())
    }

    fn permissions(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn edit_requires_existing_role() {
        let mut role = <Role as Entity>::new(Uuid::new_v4());
        assert_eq!(
            run(
                &mut role,
                RoleCommand::Edit {
                    title: "Editor".into(),
                    permissions: BTreeSet::new(),
                }
            )
            .unwrap_err(),
            Rejection::bad_request("You must choose an existing role")
        );
        assert_eq!(role.version(), 0);
    }

    #[test]
    fn create_once_then_edit_overwrites_permissions() {
        let mut role = <Role as Entity>::new(Uuid::new_v4());
        let create = RoleCommand::Create {
            title: "Editor".into(),
            permissions: permissions(&["page.edit", "page.publish"]),
        };
        run(&mut role, create.clone()).unwrap();
        assert_eq!(
            run(&mut role, create).unwrap_err(),
            Rejection::conflict("role already exists")
        );

        run(
            &mut role,
            RoleCommand::Edit {
                title: "Author".into(),
                permissions: permissions(&["file.upload"]),
            },
        )
        .unwrap();
        assert_eq!(role.title, "Author");
        assert_eq!(role.permissions, permissions(&["file.upload"]));
        assert_eq!(role.version(), 2);
        assert_eq!(role.history()[1].message, "Role \"Author\" edited");
    }
}
