#![forbid(unsafe_code)]

pub mod due;
pub mod model;
pub mod store;
