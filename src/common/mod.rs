pub mod error;
pub use error::{Clause, ErrorCode, PlanError, RewriteError};

pub mod result;
pub use result::{FirstError, PlanResult};

pub mod data_item;
pub use data_item::Datum;

pub mod field_type;
pub use field_type::{FieldType, TypeCode};

pub mod name;
pub use name::Name;
