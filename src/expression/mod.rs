// Copyright (c) 2024 Mike Tsao

//! Arithmetic over event fields, variables and constants. Operators apply
//! strictly left to right in the order written; there is no precedence or
//! grouping.

pub use {
    parser::{parse_expression, Expression},
    token::{parse_token, ParseContext, Token},
};

mod parser;
mod token;
