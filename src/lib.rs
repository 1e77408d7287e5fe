#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod ai;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod task;
pub mod tui;
