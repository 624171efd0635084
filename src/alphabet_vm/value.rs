use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<BTreeMap<String, Value>>>;
pub type ObjectRef = Rc<RefCell<ObjectData>>;

/// A runtime value. Lists, maps and objects are shared by reference:
/// mutation through one handle is visible through every alias. Reference
/// cycles through containers or object fields are never reclaimed.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    /// The sole number type.
    Number(f64),
    Str(String),
    List(ListRef),
    Map(MapRef),
    Object(ObjectRef),
}

#[derive(Debug, PartialEq)]
pub struct ObjectData {
    pub class_id: u16,
    pub fields: HashMap<String, Value>,
}

impl Value {
    pub fn object(class_id: u16) -> Value {
        Value::Object(Rc::new(RefCell::new(ObjectData {
            class_id,
            fields: HashMap::new(),
        })))
    }

    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Falsey is null, the number zero, or the empty string; everything else
    /// is truthy.
    pub fn is_falsey(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => *n == 0.0,
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, value) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "Object#{}", object.borrow().class_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_with_no_fraction_print_as_integers() {
        assert_eq!(Value::Number(70.0).to_string(), "70");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(3.5).to_string(), "3.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn containers_print_recursively() {
        let list = Value::list(vec![
            Value::Number(1.0),
            Value::Str("two".to_string()),
            Value::Null,
        ]);
        assert_eq!(list.to_string(), "[1, two, null]");

        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::Number(1.0));
        entries.insert("b".to_string(), list.clone());
        assert_eq!(Value::map(entries).to_string(), "{a: 1, b: [1, two, null]}");

        assert_eq!(Value::object(15).to_string(), "Object#15");
    }

    #[test]
    fn truthiness_follows_null_zero_and_empty_string() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Number(0.0).is_falsey());
        assert!(Value::Str(String::new()).is_falsey());
        assert!(!Value::Number(0.5).is_falsey());
        assert!(!Value::Str("x".to_string()).is_falsey());
        assert!(!Value::list(vec![]).is_falsey());
        assert!(!Value::object(15).is_falsey());
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Value::Number(2.0), Value::Number(2.0));
        assert_ne!(Value::Number(2.0), Value::Str("2".to_string()));
        assert_eq!(
            Value::list(vec![Value::Number(1.0)]),
            Value::list(vec![Value::Number(1.0)])
        );
        assert_ne!(
            Value::list(vec![Value::Number(1.0)]),
            Value::list(vec![Value::Number(2.0)])
        );
    }

    #[test]
    fn aliases_share_mutation() {
        let list = Value::list(vec![Value::Number(1.0)]);
        let alias = list.clone();
        if let Value::List(items) = &list {
            items.borrow_mut().push(Value::Number(2.0));
        }
        assert_eq!(alias.to_string(), "[1, 2]");
    }
}
