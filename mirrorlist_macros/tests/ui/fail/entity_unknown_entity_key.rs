use mirrorlist_macros::Entity;

#[derive(Entity, Clone)]
#[entity(tabel = "users")]
struct User {
    #[field(key)]
    id: i64,
}

fn main() {}
