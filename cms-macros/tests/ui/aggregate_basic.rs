use cms_domain::entity::Entity;
use cms_macros::aggregate;

#[aggregate]
struct Account {
    name: String,
}

fn main() {
    let account = <Account as Entity>::new(uuid::Uuid::nil());
    assert_eq!(account.version(), 0);
    assert!(account.name.is_empty());
}
