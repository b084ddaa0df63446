use cms_domain::command::EventKind;
use cms_macros::payload;

#[payload(prefix = "folder")]
enum FolderCommand {
    Create { path: String },
    #[payload(event_type = "folder.moved")]
    MoveTo(String),
    Delete,
}

fn main() {
    assert_eq!(FolderCommand::Delete.event_type(), "folder.delete");
    assert_eq!(FolderCommand::MoveTo("x".into()).event_type(), "folder.moved");
    assert_eq!(
        FolderCommand::Create { path: "/".into() }.event_type(),
        "folder.create"
    );
}
