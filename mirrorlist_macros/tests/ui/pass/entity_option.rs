use mirrorlist_core::{Entity, FieldKind, SchemaMapper};
use mirrorlist_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Article {
    #[field(key, auto_increment)]
    id: Option<i32>,
    title: String,
    subtitle: Option<String>,
}

fn main() {
    // Bare type name, no pluralization.
    let mapping = SchemaMapper::document().mapping_for::<Article>().unwrap();
    assert_eq!(mapping.table, "Article");
    assert_eq!(mapping.select_columns(), vec!["id", "title", "subtitle"]);
    assert_eq!(mapping.insert_columns(), vec!["title", "subtitle"]);
    assert!(mapping.column("subtitle").unwrap().nullable);
    let key = mapping.key.clone().unwrap();
    assert!(key.auto_generated);
    assert_eq!(key.kind, FieldKind::Integer);

    let mut a = Article { id: None, title: "t".into(), subtitle: None };
    let id: Option<<Article as Entity>::Key> = a.key();
    assert_eq!(id, None);
    assert!(a.set_generated_key(5));
    assert_eq!(a.id, Some(5));
    assert!(!a.set_generated_key(i64::MAX));
    assert_eq!(a.id, Some(5));
}
