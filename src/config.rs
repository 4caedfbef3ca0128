//! This file provide some configuration for the rsql planner
//! Caution: the show-schema widths below are part of the result metadata
//! sent to clients, change them together with the client expectations.

pub const _NAME: &str = "rsql-planner";
pub const _VERSION: &str = "0.1.0";

pub const LOG_LEVEL: &str = "info";
pub const LOG_PATH: &str = "./logs/rsql-planner.log";

pub const DEFAULT_CHARSET: &str = "utf8";
pub const DEFAULT_COLLATION: &str = "utf8_bin";
pub const CHARSET_BIN: &str = "binary";
pub const COLLATION_BIN: &str = "binary";

/// Database name reported for columns of introspection results.
pub const INFORMATION_SCHEMA_NAME: &str = "INFORMATION_SCHEMA";

pub const SHOW_VARCHAR_WIDTH: usize = 256;
pub const SHOW_DATETIME_WIDTH: usize = 19;
