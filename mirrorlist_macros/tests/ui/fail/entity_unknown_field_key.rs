use mirrorlist_macros::Entity;

#[derive(Entity, Clone)]
struct User {
    // Misspelled marker should be rejected by the attribute parser.
    #[field(primary)]
    id: i64,
}

fn main() {}
