mod hex;
mod json;
mod row;
mod value;

pub use {hex::Hex, json::Json, row::Row, value::*};
