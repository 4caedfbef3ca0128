use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{CHARSET_BIN, COLLATION_BIN, DEFAULT_CHARSET, DEFAULT_COLLATION};

/// MySQL column type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Tiny,
    Short,
    Int24,
    Long,
    LongLong,
    Float,
    Double,
    NewDecimal,
    Bit,
    Year,
    Date,
    Duration,
    Datetime,
    Timestamp,
    Varchar,
    VarString,
    String,
    Blob,
    Json,
    Null,
}

impl TypeCode {
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            TypeCode::Varchar | TypeCode::VarString | TypeCode::String | TypeCode::Blob
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeCode::Tiny | TypeCode::Short | TypeCode::Int24 | TypeCode::Long | TypeCode::LongLong
        )
    }
}

/// Default display width of a type, `None` when it is unspecified.
pub fn default_field_length(tp: TypeCode) -> Option<usize> {
    match tp {
        TypeCode::Bit => Some(1),
        TypeCode::Tiny => Some(4),
        TypeCode::Short => Some(6),
        TypeCode::Int24 => Some(9),
        TypeCode::Long => Some(11),
        TypeCode::LongLong => Some(21),
        TypeCode::NewDecimal => Some(10),
        TypeCode::Float => Some(12),
        TypeCode::Double => Some(22),
        TypeCode::Year => Some(4),
        TypeCode::Date => Some(10),
        TypeCode::Duration => Some(10),
        TypeCode::Datetime | TypeCode::Timestamp => Some(19),
        TypeCode::Blob => Some(65535),
        _ => None,
    }
}

/// Charset and collation a type gets when nothing else is specified.
pub fn default_charset_for_type(tp: TypeCode) -> (&'static str, &'static str) {
    if tp.is_string() || tp == TypeCode::Json {
        (DEFAULT_CHARSET, DEFAULT_COLLATION)
    } else {
        (CHARSET_BIN, COLLATION_BIN)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldType {
    pub tp: TypeCode,
    pub flen: Option<usize>,
    pub decimal: Option<usize>,
    pub unsigned: bool,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub charset: String,
    pub collate: String,
}

impl FieldType {
    pub fn new(tp: TypeCode) -> Self {
        let (charset, collate) = default_charset_for_type(tp);
        FieldType {
            tp,
            flen: None,
            decimal: None,
            unsigned: false,
            not_null: false,
            primary_key: false,
            auto_increment: false,
            charset: charset.to_string(),
            collate: collate.to_string(),
        }
    }

    pub fn with_len(mut self, flen: usize) -> Self {
        self.flen = Some(flen);
        self
    }

    pub fn with_unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn with_not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_charset(mut self, charset: &str, collate: &str) -> Self {
        self.charset = charset.to_string();
        self.collate = collate.to_string();
        self
    }

    pub fn is_string(&self) -> bool {
        self.tp.is_string()
    }

    pub fn is_integer(&self) -> bool {
        self.tp.is_integer()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self.tp).to_lowercase();
        match self.flen {
            Some(len) => write!(f, "{}({})", name, len)?,
            None => write!(f, "{}", name)?,
        }
        if self.unsigned {
            write!(f, " unsigned")?;
        }
        Ok(())
    }
}
