//! Module for reading component registries and process tables, and for parsing expressions
pub mod expr_parse;
pub mod json;
pub mod table;
