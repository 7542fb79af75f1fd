use mirrorlist_macros::Entity;

#[derive(Entity, Clone)]
struct User {
    #[field(column = 5)]
    id: i64,
}

fn main() {}
