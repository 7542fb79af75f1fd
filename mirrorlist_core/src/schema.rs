//! Table and column mapping derived from an entity's declared shape.
//!
//! Mappings are computed once per (entity type, naming convention) and kept in
//! a process-wide cache. Invalid shapes are cached as errors as well, so every
//! attempt to map a broken type reports the same [`SchemaError`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use inflections::Inflect;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{Entity, EntityShape, FieldKind, SchemaError};

/// Strategy translating a field name into a column name.
/// Stores advertise theirs through [`crate::Store::naming`].
pub trait NamingConvention: Send + Sync + 'static {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    fn column_name(&self, field: &str) -> String;

    /// Identifies the convention in the mapping cache. Conventions of the
    /// same type must produce the same column names.
    fn convention_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// Field names are used as-is (document stores).
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

/// `FirstName` / `firstName` -> `first_name` (relational stores).
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCase;

/// `first_name` -> `firstName`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

/// `first_name` -> `FirstName`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCase;

impl NamingConvention for Verbatim {
    fn name(&self) -> &'static str {
        "verbatim"
    }
    fn column_name(&self, field: &str) -> String {
        field.to_string()
    }
}

impl NamingConvention for SnakeCase {
    fn name(&self) -> &'static str {
        "snake_case"
    }
    fn column_name(&self, field: &str) -> String {
        field.to_snake_case()
    }
}

impl NamingConvention for CamelCase {
    fn name(&self) -> &'static str {
        "camelCase"
    }
    fn column_name(&self, field: &str) -> String {
        field.to_camel_case()
    }
}

impl NamingConvention for PascalCase {
    fn name(&self) -> &'static str {
        "PascalCase"
    }
    fn column_name(&self, field: &str) -> String {
        field.to_pascal_case()
    }
}

/// The designated key of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub field: &'static str,
    pub column: String,
    pub auto_generated: bool,
    pub kind: FieldKind,
}

/// One field <-> column correspondence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub property: &'static str,
    pub column: String,
    /// The column name came from `#[field(column = "...")]`.
    pub explicit: bool,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub key: bool,
    pub full_text: bool,
}

/// Complete mapping of one entity type onto a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub table: String,
    /// The table name came from `#[entity(table = "...")]`.
    pub explicit_table: bool,
    /// Columns in field declaration order.
    pub columns: Vec<ColumnMapping>,
    pub key: Option<KeyDescriptor>,
}

impl TableMapping {
    /// Look up the mapping of a field by its property name.
    pub fn column(&self, property: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.property == property)
    }

    pub fn key_column(&self) -> Option<&str> {
        self.key.as_ref().map(|k| k.column.as_str())
    }

    pub fn select_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    /// Columns written on insert: everything except an auto-generated key.
    pub fn insert_columns(&self) -> Vec<&str> {
        let auto = self.key.as_ref().is_some_and(|k| k.auto_generated);
        self.columns
            .iter()
            .filter(|c| !(auto && c.key))
            .map(|c| c.column.as_str())
            .collect()
    }

    /// Columns in an update's SET clause: everything except the key.
    pub fn update_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.key)
            .map(|c| c.column.as_str())
            .collect()
    }

    /// Columns a store may hand to a free-text index.
    pub fn full_text_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.full_text)
            .map(|c| c.column.as_str())
            .collect()
    }
}

type MappingCache = HashMap<(TypeId, TypeId), Result<Arc<TableMapping>, SchemaError>>;

static MAPPINGS: OnceLock<RwLock<MappingCache>> = OnceLock::new();

/// Derives [`TableMapping`]s using an injected naming convention.
#[derive(Clone, Copy)]
pub struct SchemaMapper<'n> {
    naming: &'n dyn NamingConvention,
}

impl<'n> SchemaMapper<'n> {
    pub fn new(naming: &'n dyn NamingConvention) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &'n dyn NamingConvention {
        self.naming
    }

    /// Mapping for `T`, derived on first use and cached for the process lifetime.
    pub fn mapping_for<T: Entity>(&self) -> Result<Arc<TableMapping>, SchemaError> {
        let cache_key = (TypeId::of::<T>(), self.naming.convention_id());
        let cache = MAPPINGS.get_or_init(|| RwLock::new(HashMap::new()));

        if let Some(hit) = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return hit.clone();
        }

        let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .entry(cache_key)
            .or_insert_with(|| {
                let derived = derive_mapping(&T::SHAPE, self.naming).map(Arc::new);
                #[cfg(feature = "tracing")]
                {
                    match &derived {
                        Ok(m) => debug!(
                            entity = T::SHAPE.type_name,
                            table = %m.table,
                            columns = m.columns.len(),
                            naming = self.naming.name(),
                            "derived table mapping"
                        ),
                        Err(e) => {
                            debug!(entity = T::SHAPE.type_name, error = %e, "invalid entity shape")
                        }
                    }
                }
                derived
            })
            .clone()
    }
}

impl SchemaMapper<'static> {
    /// snake_case columns.
    pub fn relational() -> Self {
        Self::new(&SnakeCase)
    }

    /// Field names used verbatim.
    pub fn document() -> Self {
        Self::new(&Verbatim)
    }
}

impl std::fmt::Debug for SchemaMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaMapper")
            .field("naming", &self.naming.name())
            .finish()
    }
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Uncached derivation of a mapping from a shape.
pub fn derive_mapping(
    shape: &EntityShape,
    naming: &dyn NamingConvention,
) -> Result<TableMapping, SchemaError> {
    let entity = shape.type_name;

    let key_fields: Vec<_> = shape.fields.iter().filter(|f| f.key).collect();
    if key_fields.len() > 1 {
        return Err(SchemaError::AmbiguousKey {
            entity,
            fields: key_fields.iter().map(|f| f.name).collect(),
        });
    }
    if let Some(stray) = shape.fields.iter().find(|f| f.auto_increment && !f.key) {
        return Err(SchemaError::AutoIncrementWithoutKey {
            entity,
            field: stray.name,
        });
    }
    if let Some(key) = key_fields.first() {
        if key.auto_increment && key.kind != FieldKind::Integer {
            return Err(SchemaError::AutoKeyNotInteger {
                entity,
                field: key.name,
                kind: key.kind,
            });
        }
        if key.auto_increment && !key.nullable {
            return Err(SchemaError::AutoKeyNotOptional {
                entity,
                field: key.name,
            });
        }
    }

    let table = shape.table.unwrap_or(entity).to_string();
    if !is_valid_ident(&table) {
        return Err(SchemaError::InvalidIdentifier {
            entity,
            name: table,
        });
    }

    let mut columns: Vec<ColumnMapping> = Vec::with_capacity(shape.fields.len());
    for field in shape.fields {
        let column = match field.column {
            Some(explicit) => explicit.to_string(),
            None => naming.column_name(field.name),
        };
        if !is_valid_ident(&column) {
            return Err(SchemaError::InvalidIdentifier {
                entity,
                name: column,
            });
        }
        if columns.iter().any(|c| c.column == column) {
            return Err(SchemaError::DuplicateColumn { entity, column });
        }
        columns.push(ColumnMapping {
            property: field.name,
            column,
            explicit: field.column.is_some(),
            nullable: field.nullable,
            max_length: field.max_length,
            key: field.key,
            full_text: field.full_text,
        });
    }

    let key = columns.iter().zip(shape.fields).find_map(|(c, f)| {
        f.key.then(|| KeyDescriptor {
            field: f.name,
            column: c.column.clone(),
            auto_generated: f.auto_increment,
            kind: f.kind,
        })
    });

    Ok(TableMapping {
        table,
        explicit_table: shape.table.is_some(),
        columns,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldShape, NoKey};

    const fn key(name: &'static str, kind: FieldKind, auto: bool) -> FieldShape {
        FieldShape {
            name,
            column: None,
            key: true,
            auto_increment: auto,
            full_text: false,
            kind,
            nullable: auto,
            max_length: None,
        }
    }

    #[derive(Debug, Clone)]
    struct Customer {
        customer_id: Option<i64>,
    }

    impl Entity for Customer {
        type Key = i64;
        const SHAPE: EntityShape = EntityShape {
            type_name: "Customer",
            table: None,
            fields: &[
                key("customer_id", FieldKind::Integer, true),
                FieldShape::plain("FirstName", FieldKind::String),
                FieldShape {
                    column: Some("mail"),
                    nullable: true,
                    max_length: Some(120),
                    ..FieldShape::plain("emailAddress", FieldKind::String)
                },
                FieldShape {
                    full_text: true,
                    ..FieldShape::plain("notes", FieldKind::String)
                },
            ],
        };
        fn key(&self) -> Option<i64> {
            self.customer_id
        }
        fn set_key(&mut self, key: i64) {
            self.customer_id = Some(key);
        }
    }

    #[derive(Debug, Clone)]
    struct TwoKeys;

    impl Entity for TwoKeys {
        type Key = NoKey;
        const SHAPE: EntityShape = EntityShape {
            type_name: "TwoKeys",
            table: None,
            fields: &[
                key("a", FieldKind::Integer, false),
                key("b", FieldKind::Integer, false),
            ],
        };
        fn key(&self) -> Option<NoKey> {
            None
        }
        fn set_key(&mut self, _key: NoKey) {}
    }

    #[test]
    fn relational_mapping_translates_names_and_keeps_order() {
        let m = SchemaMapper::relational().mapping_for::<Customer>().unwrap();
        assert_eq!(m.table, "Customer");
        assert!(!m.explicit_table);
        assert_eq!(
            m.select_columns(),
            vec!["customer_id", "first_name", "mail", "notes"]
        );
        let key = m.key.as_ref().unwrap();
        assert_eq!(key.field, "customer_id");
        assert!(key.auto_generated);
        assert_eq!(key.kind, FieldKind::Integer);
        assert_eq!(m.key_column(), Some("customer_id"));
        assert_eq!(m.insert_columns(), vec!["first_name", "mail", "notes"]);
        assert_eq!(m.update_columns(), vec!["first_name", "mail", "notes"]);
        assert_eq!(m.full_text_columns(), vec!["notes"]);

        let mail = m.column("emailAddress").unwrap();
        assert!(mail.explicit);
        assert!(mail.nullable);
        assert_eq!(mail.max_length, Some(120));
    }

    #[test]
    fn document_mapping_keeps_field_names() {
        let m = SchemaMapper::document().mapping_for::<Customer>().unwrap();
        assert_eq!(
            m.select_columns(),
            vec!["customer_id", "FirstName", "mail", "notes"]
        );
    }

    #[test]
    fn mappings_are_cached_per_convention() {
        let a = SchemaMapper::relational().mapping_for::<Customer>().unwrap();
        let b = SchemaMapper::relational().mapping_for::<Customer>().unwrap();
        let c = SchemaMapper::document().mapping_for::<Customer>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    /// A custom convention that reuses a built-in name.
    struct Shouting;

    impl NamingConvention for Shouting {
        fn name(&self) -> &'static str {
            "snake_case"
        }
        fn column_name(&self, field: &str) -> String {
            field.to_uppercase()
        }
    }

    #[test]
    fn cache_tells_conventions_apart_by_type() {
        let snake = SchemaMapper::relational().mapping_for::<Customer>().unwrap();
        let loud = SchemaMapper::new(&Shouting).mapping_for::<Customer>().unwrap();
        assert!(!Arc::ptr_eq(&snake, &loud));
        assert_eq!(
            loud.select_columns(),
            vec!["CUSTOMER_ID", "FIRSTNAME", "mail", "NOTES"]
        );
        assert_eq!(snake.select_columns()[0], "customer_id");
    }

    #[test]
    fn ambiguous_key_is_rejected_every_time() {
        let first = SchemaMapper::document().mapping_for::<TwoKeys>().unwrap_err();
        let second = SchemaMapper::document().mapping_for::<TwoKeys>().unwrap_err();
        assert_eq!(
            first,
            SchemaError::AmbiguousKey {
                entity: "TwoKeys",
                fields: vec!["a", "b"],
            }
        );
        assert_eq!(first, second);
    }

    #[test]
    fn auto_key_must_be_integer() {
        static FIELDS: [FieldShape; 1] = [key("code", FieldKind::String, true)];
        let shape = EntityShape {
            type_name: "Sku",
            table: None,
            fields: &FIELDS,
        };
        let err = derive_mapping(&shape, &Verbatim).unwrap_err();
        assert_eq!(
            err,
            SchemaError::AutoKeyNotInteger {
                entity: "Sku",
                field: "code",
                kind: FieldKind::String,
            }
        );
    }

    #[test]
    fn auto_key_must_start_unassigned() {
        static FIELDS: [FieldShape; 1] = [FieldShape {
            nullable: false,
            ..key("id", FieldKind::Integer, true)
        }];
        let shape = EntityShape {
            type_name: "Job",
            table: None,
            fields: &FIELDS,
        };
        assert_eq!(
            derive_mapping(&shape, &Verbatim).unwrap_err(),
            SchemaError::AutoKeyNotOptional {
                entity: "Job",
                field: "id",
            }
        );
    }

    #[test]
    fn auto_increment_off_key_is_rejected() {
        static FIELDS: [FieldShape; 1] = [FieldShape {
            auto_increment: true,
            ..FieldShape::plain("counter", FieldKind::Integer)
        }];
        let shape = EntityShape {
            type_name: "Tally",
            table: None,
            fields: &FIELDS,
        };
        assert!(matches!(
            derive_mapping(&shape, &Verbatim),
            Err(SchemaError::AutoIncrementWithoutKey { field: "counter", .. })
        ));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        static FIELDS: [FieldShape; 2] = [
            FieldShape::plain("userName", FieldKind::String),
            FieldShape::plain("user_name", FieldKind::String),
        ];
        let shape = EntityShape {
            type_name: "Login",
            table: Some("logins"),
            fields: &FIELDS,
        };
        // Distinct under verbatim naming, colliding under snake_case.
        assert!(derive_mapping(&shape, &Verbatim).is_ok());
        assert_eq!(
            derive_mapping(&shape, &SnakeCase).unwrap_err(),
            SchemaError::DuplicateColumn {
                entity: "Login",
                column: "user_name".into(),
            }
        );
    }

    #[test]
    fn invalid_table_override_is_rejected() {
        let shape = EntityShape {
            type_name: "Bad",
            table: Some("drop table"),
            fields: &[],
        };
        assert!(matches!(
            derive_mapping(&shape, &Verbatim),
            Err(SchemaError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn keyless_shape_maps_without_key() {
        static FIELDS: [FieldShape; 2] = [
            FieldShape::plain("Sku", FieldKind::String),
            FieldShape::plain("Name", FieldKind::String),
        ];
        let shape = EntityShape {
            type_name: "Widget",
            table: None,
            fields: &FIELDS,
        };
        let m = derive_mapping(&shape, &SnakeCase).unwrap();
        assert!(m.key.is_none());
        assert_eq!(m.key_column(), None);
        assert_eq!(m.select_columns(), vec!["sku", "name"]);
        assert_eq!(m.insert_columns(), m.select_columns());
    }

    #[test]
    fn conventions_translate_field_names() {
        assert_eq!(SnakeCase.column_name("FirstName"), "first_name");
        assert_eq!(SnakeCase.column_name("first_name"), "first_name");
        assert_eq!(CamelCase.column_name("first_name"), "firstName");
        assert_eq!(PascalCase.column_name("first_name"), "FirstName");
        assert_eq!(Verbatim.column_name("First_Name"), "First_Name");
    }
}
