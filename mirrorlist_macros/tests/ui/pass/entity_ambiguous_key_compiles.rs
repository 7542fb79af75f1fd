use mirrorlist_core::{IdentityResolver, SchemaError, SchemaMapper};
use mirrorlist_macros::Entity;

// Compiles; the schema mapper rejects it on first use.
#[derive(Entity, Clone, Debug)]
struct TwoIds {
    #[field(key)]
    id1: i64,
    #[field(key)]
    id2: i64,
}

#[derive(Entity, Clone, Debug)]
struct TextCounter {
    #[field(key, auto_increment)]
    code: String,
}

fn main() {
    let err = SchemaMapper::document().mapping_for::<TwoIds>().unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousKey { .. }));
    assert!(IdentityResolver::resolver_for::<TextCounter>().is_err());
}
