use std::fmt;

use serde::{Deserialize, Serialize};

use super::field_type::{FieldType, TypeCode};

/// A constant value carried by the plan (literals, column defaults, user variables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Datum {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    /// Zero value of a column type, used for missing defaults outside strict mode.
    pub fn zero_for(tp: &FieldType) -> Datum {
        if tp.is_string() {
            return Datum::String(String::new());
        }
        match tp.tp {
            TypeCode::Float | TypeCode::Double | TypeCode::NewDecimal => Datum::Float(0.0),
            TypeCode::Datetime | TypeCode::Timestamp => Datum::String("0000-00-00 00:00:00".to_string()),
            TypeCode::Date => Datum::String("0000-00-00".to_string()),
            TypeCode::Duration => Datum::String("00:00:00".to_string()),
            TypeCode::Null => Datum::Null,
            _ if tp.unsigned => Datum::UInt(0),
            _ => Datum::Int(0),
        }
    }

    /// Type a bare literal gets when it enters the plan.
    pub fn literal_type(&self) -> FieldType {
        match self {
            Datum::Null => FieldType::new(TypeCode::Null),
            Datum::Int(_) => FieldType::new(TypeCode::LongLong),
            Datum::UInt(_) => FieldType::new(TypeCode::LongLong).with_unsigned(),
            Datum::Float(_) => FieldType::new(TypeCode::Double),
            Datum::String(s) => FieldType::new(TypeCode::VarString).with_len(s.len()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Int(v) => write!(f, "{}", v),
            Datum::UInt(v) => write!(f, "{}", v),
            Datum::Float(v) => write!(f, "{}", v),
            Datum::String(s) => write!(f, "'{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(Datum::zero_for(&FieldType::new(TypeCode::Long)), Datum::Int(0));
        assert_eq!(Datum::zero_for(&FieldType::new(TypeCode::Long).with_unsigned()), Datum::UInt(0));
        assert_eq!(Datum::zero_for(&FieldType::new(TypeCode::Varchar)), Datum::String(String::new()));
        assert_eq!(Datum::zero_for(&FieldType::new(TypeCode::Double)), Datum::Float(0.0));
    }

    #[test]
    fn test_literal_type() {
        assert_eq!(Datum::Int(3).literal_type().tp, TypeCode::LongLong);
        let s = Datum::String("abc".to_string()).literal_type();
        assert_eq!(s.tp, TypeCode::VarString);
        assert_eq!(s.flen, Some(3));
    }
}
