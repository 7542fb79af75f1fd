use mirrorlist_macros::Entity;

#[derive(Entity, Clone)]
struct Pair(i64, String);

fn main() {}
