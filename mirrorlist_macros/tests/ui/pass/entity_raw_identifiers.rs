use mirrorlist_core::{Entity, SchemaMapper};
use mirrorlist_macros::Entity;

#[derive(Entity, Clone, Debug)]
struct Asset {
    #[field(key)]
    id: i64,
    r#type: String,
    #[field(column = "kind_of")]
    r#match: Option<String>,
}

fn main() {
    assert_eq!(Asset::SHAPE.fields[1].name, "type");
    let mapping = SchemaMapper::relational().mapping_for::<Asset>().unwrap();
    assert_eq!(mapping.select_columns(), vec!["id", "type", "kind_of"]);
    assert!(mapping.column("match").is_some());
}
