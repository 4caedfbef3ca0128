pub mod ast;
pub mod ast_to_plan;
pub mod expression;
pub mod index_hints;
pub mod plan;
pub mod privilege;
pub mod rewriter;
pub mod schema;
pub mod session;
pub mod show_schema;
pub mod utils;
