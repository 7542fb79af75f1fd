use mirrorlist_macros::Entity;

#[derive(Entity, Clone)]
enum Color {
    Red,
}

fn main() {}
