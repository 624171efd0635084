use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;

pub type TypeResult<T> = Result<T, TypeError>;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("type '{name}' is already registered with ID {existing}")]
    #[diagnostic(code(types::duplicate_registration))]
    DuplicateRegistration { name: String, existing: u16 },
}

// The 14 primitive type IDs. Everything from FIRST_USER_ID up names a
// user-declared class.
pub const I8: u16 = 1;
pub const I16: u16 = 2;
pub const I32: u16 = 3;
pub const I64: u16 = 4;
pub const INT: u16 = 5;
pub const F32: u16 = 6;
pub const F64: u16 = 7;
pub const FLOAT: u16 = 8;
pub const DEC: u16 = 9;
pub const CPX: u16 = 10;
pub const BOOL: u16 = 11;
pub const STR: u16 = 12;
pub const LIST: u16 = 13;
pub const MAP: u16 = 14;
pub const FIRST_USER_ID: u16 = 15;

const PRIMITIVES: [(u16, &str); 14] = [
    (I8, "i8"),
    (I16, "i16"),
    (I32, "i32"),
    (I64, "i64"),
    (INT, "int"),
    (F32, "f32"),
    (F64, "f64"),
    (FLOAT, "float"),
    (DEC, "dec"),
    (CPX, "cpx"),
    (BOOL, "bool"),
    (STR, "str"),
    (LIST, "list"),
    (MAP, "map"),
];

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: u16,
    pub name: String,
    pub is_primitive: bool,
    pub interfaces: Vec<u16>,
}

/// Maps between small integer type IDs and names. Primitives occupy 1..=14;
/// user registrations are handed IDs from 15 up, in registration order.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    name_to_id: HashMap<String, u16>,
    next_user_id: u16,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: Vec::with_capacity(PRIMITIVES.len()),
            name_to_id: HashMap::new(),
            next_user_id: FIRST_USER_ID,
        };
        for (id, name) in PRIMITIVES {
            registry.types.push(TypeInfo {
                id,
                name: name.to_string(),
                is_primitive: true,
                interfaces: Vec::new(),
            });
            registry.name_to_id.insert(name.to_string(), id);
        }
        registry
    }

    pub fn get(&self, id: u16) -> Option<&TypeInfo> {
        if id == 0 {
            return None;
        }
        self.types.get(id as usize - 1)
    }

    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.name_to_id.get(name).copied()
    }

    /// Registers a user type under the next free ID. Re-registering a name is
    /// an error.
    pub fn register(&mut self, name: &str, interfaces: Vec<u16>) -> TypeResult<u16> {
        if let Some(&existing) = self.name_to_id.get(name) {
            return Err(TypeError::DuplicateRegistration {
                name: name.to_string(),
                existing,
            });
        }
        let id = self.next_user_id;
        self.next_user_id += 1;
        self.types.push(TypeInfo {
            id,
            name: name.to_string(),
            is_primitive: false,
            interfaces,
        });
        self.name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Coarse assignment compatibility between a value of type `source` and a
    /// target slot of type `target`: the integer group (1..=5) and the float
    /// group (6..=8) are each mutually assignable, the two groups flow into
    /// each other, and user classes flow into any user class.
    pub fn is_compatible(&self, source: u16, target: u16) -> bool {
        if source == target {
            return true;
        }
        let is_integer = |id: u16| (I8..=INT).contains(&id);
        let is_float = |id: u16| (F32..=FLOAT).contains(&id);
        let is_numeric = |id: u16| is_integer(id) || is_float(id);

        if is_numeric(source) && is_numeric(target) {
            return true;
        }
        source >= FIRST_USER_ID && target >= FIRST_USER_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_round_trip_between_names_and_ids() {
        let registry = TypeRegistry::new();
        for (id, name) in PRIMITIVES {
            assert_eq!(registry.id_of(name), Some(id));
            assert_eq!(registry.get(id).unwrap().name, name);
        }
        assert!(registry.get(0).is_none());
        assert!(registry.get(99).is_none());
    }

    #[test]
    fn user_ids_start_at_fifteen_in_registration_order() {
        let mut registry = TypeRegistry::new();
        assert_eq!(registry.register("Foo", vec![]).unwrap(), 15);
        assert_eq!(registry.register("Bar", vec![]).unwrap(), 16);
        assert_eq!(registry.id_of("Bar"), Some(16));
        assert!(!registry.get(16).unwrap().is_primitive);
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut registry = TypeRegistry::new();
        registry.register("Foo", vec![]).unwrap();
        assert_eq!(
            registry.register("Foo", vec![]),
            Err(TypeError::DuplicateRegistration {
                name: "Foo".to_string(),
                existing: 15,
            })
        );
        // a primitive name cannot be reused either
        assert!(registry.register("int", vec![]).is_err());
    }

    #[test]
    fn numeric_groups_are_mutually_assignable() {
        let registry = TypeRegistry::new();
        // within the integer group, both directions
        assert!(registry.is_compatible(I8, INT));
        assert!(registry.is_compatible(INT, I8));
        // within the float group
        assert!(registry.is_compatible(F64, F32));
        // across the groups, both directions
        assert!(registry.is_compatible(F64, INT));
        assert!(registry.is_compatible(I16, FLOAT));
    }

    #[test]
    fn non_numeric_primitives_do_not_convert() {
        let registry = TypeRegistry::new();
        assert!(!registry.is_compatible(STR, INT));
        assert!(!registry.is_compatible(INT, STR));
        assert!(!registry.is_compatible(LIST, MAP));
        assert!(registry.is_compatible(STR, STR));
        assert!(!registry.is_compatible(F64, BOOL));
    }

    #[test]
    fn user_classes_flow_into_any_user_class() {
        let mut registry = TypeRegistry::new();
        let a = registry.register("A", vec![]).unwrap();
        let b = registry.register("B", vec![]).unwrap();
        assert!(registry.is_compatible(a, b));
        assert!(registry.is_compatible(b, a));
        assert!(!registry.is_compatible(a, INT));
        assert!(!registry.is_compatible(STR, a));
    }
}
