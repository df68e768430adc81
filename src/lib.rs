// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod assembler;
pub mod convert;
pub mod extract;
pub mod filter;
pub mod input;
pub mod parser;
pub mod planner;
pub mod rewrite;
pub mod schema;
