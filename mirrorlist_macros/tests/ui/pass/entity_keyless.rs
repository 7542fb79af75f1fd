#![allow(non_snake_case)]
use mirrorlist_core::{Entity, IdentityResolver, IdentityStrategy, NoKey};
use mirrorlist_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Widget {
    #[field(column = "sku")]
    Sku: String,
    Name: String,
}

fn main() {
    let w = Widget { Sku: "001".into(), Name: "A".into() };
    assert_eq!(w.key(), None::<NoKey>);
    assert_eq!(
        IdentityResolver::resolver_for::<Widget>().unwrap(),
        IdentityStrategy::ByReference
    );
}
