use mirrorlist_core::{Entity, SchemaMapper};
use mirrorlist_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "people")]
struct Person {
    #[field(key)]
    id: i64,
    #[field(column = "email_address", length = 254)]
    email: String,
    #[field(column = "full_name", full_text)]
    name: String,
}

fn main() {
    assert_eq!(Person::SHAPE.table, Some("people"));
    let mapping = SchemaMapper::relational().mapping_for::<Person>().unwrap();
    assert_eq!(mapping.table, "people");
    assert_eq!(mapping.select_columns(), vec!["id", "email_address", "full_name"]);
    assert_eq!(mapping.full_text_columns(), vec!["full_name"]);
    assert_eq!(mapping.column("email").unwrap().max_length, Some(254));

    let mut p = Person { id: 3, email: "a@b".into(), name: "A".into() };
    assert_eq!(p.key(), Some(3));
    p.set_key(4);
    assert_eq!(p.id, 4);
    // Not auto-generated: stores cannot assign a sequence value.
    assert!(!p.set_generated_key(9));
}
