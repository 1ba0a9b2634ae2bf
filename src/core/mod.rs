//! Core data types and the feed line parser

pub mod parser;
pub mod sample;
pub mod temporal;

pub use parser::{parse, parse_in, parse_record, parse_record_in, serialize, serialize_in};
pub use sample::*;
pub use temporal::*;
