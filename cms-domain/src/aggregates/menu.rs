//! 菜单聚合：与页面共用树变更算法，菜单项即树节点
//!
use super::{require_fresh_copy, require_fresh_node, require_node, require_text, tree_applied};
use crate::aggregate::{Aggregate, Seed};
use crate::command::{Command, Payload};
use crate::domain_event::Event;
use crate::entity::{AggregateId, Entity};
use crate::error::Rejection;
use crate::tree::{self, OrderNode, TreeNode};
use crate::value_object::Direction;
use cms_macros::{aggregate, payload};
use serde_json::{Map, Value};
use uuid::Uuid;

#[aggregate]
pub struct Menu {
    pub title: String,
    pub language: String,
    pub website: Option<i64>,
    pub items: Vec<TreeNode>,
    pub deleted: bool,
}

#[payload(prefix = "menu")]
pub enum MenuCommand {
    Create {
        title: String,
        language: String,
        website: Option<i64>,
    },
    AddItem {
        item_name: String,
        data: Map<String, Value>,
        parent: Option<Uuid>,
    },
    EditItem {
        uuid: Uuid,
        data: Map<String, Value>,
    },
    RemoveItem {
        uuid: Uuid,
    },
    ShiftItem {
        uuid: Uuid,
        direction: Direction,
    },
    DuplicateItem {
        uuid: Uuid,
    },
    EnableItem {
        uuid: Uuid,
    },
    DisableItem {
        uuid: Uuid,
    },
    SaveOrder {
        order: Vec<OrderNode>,
    },
    Rollback {
        previous_version: usize,
    },
    #[payload(event_type = "menu.clone")]
    CloneFrom {
        original_uuid: AggregateId,
        original_version: usize,
    },
    Delete,
}

impl Payload for MenuCommand {
    fn message(&self) -> String {
        match self {
            Self::Create { title, .. } => format!("Menu \"{title}\" created"),
            Self::AddItem { item_name, .. } => format!("Menu item \"{item_name}\" added"),
            Self::EditItem { .. } => "Menu item edited".to_string(),
            Self::RemoveItem { .. } => "Menu item removed".to_string(),
            Self::ShiftItem { direction, .. } => format!("Menu item shifted {direction}"),
            Self::DuplicateItem { .. } => "Menu item duplicated".to_string(),
            Self::EnableItem { .. } => "Menu item enabled".to_string(),
            Self::DisableItem { .. } => "Menu item disabled".to_string(),
            Self::SaveOrder { .. } => "Menu order saved".to_string(),
            Self::Rollback { previous_version } => {
                format!("Menu rolled back to version {previous_version}")
            }
            Self::CloneFrom { original_uuid, .. } => format!("Menu cloned from {original_uuid}"),
            Self::Delete => "Menu deleted".to_string(),
        }
    }

    fn seed(&self) -> Option<Seed> {
        match self {
            Self::Rollback { previous_version } => Some(Seed::Rollback {
                version: *previous_version,
            }),
            Self::CloneFrom {
                original_uuid,
                original_version,
            } => Some(Seed::Clone {
                uuid: *original_uuid,
                version: *original_version,
            }),
            _ => None,
        }
    }
}

impl Aggregate for Menu {
    const TYPE: &'static str = "menu";
    type Command = MenuCommand;

    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
        use MenuCommand::*;

        if self.deleted {
            return Err(Rejection::bad_request("menu has been deleted"));
        }

        match &command.payload {
            Create { title, .. } => {
                if self.exists() {
                    return Err(Rejection::conflict("menu already exists"));
                }
                require_text(title, "title")
            }
            CloneFrom {
                original_uuid,
                original_version,
            } => {
                if self.exists() {
                    return Err(Rejection::conflict("clone target already exists"));
                }
                if *original_uuid == self.uuid() || *original_version < 1 {
                    return Err(Rejection::bad_request("invalid clone source"));
                }
                Ok(())
            }
            _ if !self.exists() => Err(Rejection::bad_request("You must choose an existing menu")),
            AddItem {
                item_name, parent, ..
            } => {
                require_text(item_name, "item name")?;
                require_fresh_node(&self.items, command.command_uuid)?;
                match parent {
                    Some(parent) => require_node(&self.items, *parent),
                    None => Ok(()),
                }
            }
            DuplicateItem { uuid } => {
                require_node(&self.items, *uuid)?;
                require_fresh_copy(&self.items, *uuid, command.command_uuid)
            }
            EditItem { uuid, .. }
            | RemoveItem { uuid }
            | ShiftItem { uuid, .. }
            | EnableItem { uuid }
            | DisableItem { uuid } => require_node(&self.items, *uuid),
            Rollback { previous_version } => {
                if *previous_version < 1 || *previous_version >= self.version() {
                    return Err(Rejection::bad_request(format!(
                        "cannot roll back to version {previous_version} from version {}",
                        self.version()
                    )));
                }
                Ok(())
            }
            SaveOrder { .. } | Delete => Ok(()),
        }
    }

    fn execute(&mut self, event: &Event<Self::Command>) {
        use MenuCommand::*;

        match &event.payload {
            Create {
                title,
                language,
                website,
            } => {
                self.title = title.clone();
                self.language = language.clone();
                self.website = *website;
            }
            AddItem {
                item_name,
                data,
                parent,
            } => {
                let node = TreeNode::new(event.command_uuid, item_name.clone(), data.clone());
                let applied = tree::add(&mut self.items, *parent, node);
                tree_applied(applied, event, parent.unwrap_or(event.command_uuid));
            }
            EditItem { uuid, data } => {
                let applied = tree::edit(&mut self.items, *uuid, data.clone());
                tree_applied(applied, event, *uuid);
            }
            RemoveItem { uuid } => {
                let applied = tree::remove(&mut self.items, *uuid).is_some();
                tree_applied(applied, event, *uuid);
            }
            ShiftItem { uuid, direction } => {
                let applied = tree::shift(&mut self.items, *uuid, *direction);
                tree_applied(applied, event, *uuid);
            }
            DuplicateItem { uuid } => {
                let applied = tree::duplicate(&mut self.items, *uuid, event.command_uuid).is_some();
                tree_applied(applied, event, *uuid);
            }
            EnableItem { uuid } => {
                let applied = tree::set_enabled(&mut self.items, *uuid, true);
                tree_applied(applied, event, *uuid);
            }
            DisableItem { uuid } => {
                let applied = tree::set_enabled(&mut self.items, *uuid, false);
                tree_applied(applied, event, *uuid);
            }
            SaveOrder { order } => tree::save_order(&mut self.items, order),
            Rollback { .. } => {}
            CloneFrom { .. } => {
                self.title.push_str(super::page::COPY_MARKER);
                self.deleted = false;
            }
            Delete => self.deleted = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::EventMetadata;
    use chrono::Utc;

    fn run(menu: &mut Menu, payload: MenuCommand) -> Result<Event<MenuCommand>, Rejection> {
        let command = Command::new(1, menu.uuid(), menu.version(), payload);
        menu.validate(&command)?;
        let event = Event::from_command::<Menu>(&command, Utc::now(), EventMetadata::default());
        menu.apply(&event, None);
        Ok(event)
    }

    fn item(menu: &mut Menu, parent: Option<Uuid>) -> Uuid {
        run(
            menu,
            MenuCommand::AddItem {
                item_name: "link".into(),
                data: Map::new(),
                parent,
            },
        )
        .unwrap()
        .command_uuid
    }

    #[test]
    fn items_follow_tree_rules() {
        let mut menu = <Menu as Entity>::new(Uuid::new_v4());
        assert!(matches!(
            run(
                &mut menu,
                MenuCommand::AddItem {
                    item_name: "link".into(),
                    data: Map::new(),
                    parent: None,
                }
            ),
            Err(Rejection::BadRequest(_))
        ));

        run(
            &mut menu,
            MenuCommand::Create {
                title: "Main".into(),
                language: "en".into(),
                website: None,
            },
        )
        .unwrap();

        let home = item(&mut menu, None);
        let about = item(&mut menu, None);
        let team = item(&mut menu, Some(about));

        run(
            &mut menu,
            MenuCommand::SaveOrder {
                order: vec![OrderNode {
                    uuid: about,
                    children: vec![OrderNode::leaf(team), OrderNode::leaf(home)],
                }],
            },
        )
        .unwrap();
        assert_eq!(tree::uuids(&menu.items), vec![about, team, home]);
        assert_eq!(menu.items.len(), 1);

        run(&mut menu, MenuCommand::RemoveItem { uuid: team }).unwrap();
        assert!(matches!(
            run(&mut menu, MenuCommand::EnableItem { uuid: team }),
            Err(Rejection::Conflict(_))
        ));

        run(&mut menu, MenuCommand::Delete).unwrap();
        assert!(run(&mut menu, MenuCommand::Delete).is_err());
        assert_eq!(menu.history().len(), 7);
    }

    #[test]
    fn reused_command_uuid_keeps_item_uuids_unique() {
        let mut menu = <Menu as Entity>::new(Uuid::new_v4());
        run(
            &mut menu,
            MenuCommand::Create {
                title: "Main".into(),
                language: "en".into(),
                website: None,
            },
        )
        .unwrap();

        let reused = Uuid::new_v4();
        let add = |menu: &Menu| {
            Command::new(
                1,
                menu.uuid(),
                menu.version(),
                MenuCommand::AddItem {
                    item_name: "link".into(),
                    data: Map::new(),
                    parent: None,
                },
            )
            .with_command_uuid(reused)
        };

        let first = add(&menu);
        menu.validate(&first).unwrap();
        let event = Event::from_command::<Menu>(&first, Utc::now(), EventMetadata::default());
        menu.apply(&event, None);

        assert!(matches!(menu.validate(&add(&menu)), Err(Rejection::Conflict(_))));

        let duplicate = Command::new(
            1,
            menu.uuid(),
            menu.version(),
            MenuCommand::DuplicateItem { uuid: reused },
        )
        .with_command_uuid(reused);
        menu.validate(&duplicate).unwrap();
        let event = Event::from_command::<Menu>(&duplicate, Utc::now(), EventMetadata::default());
        menu.apply(&event, None);
        assert!(matches!(menu.validate(&duplicate), Err(Rejection::Conflict(_))));
        assert_eq!(
            tree::uuids(&menu.items),
            vec![reused, tree::derive_uuid(reused, reused)]
        );
    }
}
