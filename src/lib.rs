#![forbid(unsafe_code)]

pub mod cli;
pub mod codec;
pub mod dataset;
pub mod entry_date;
pub mod error;
pub mod logging;
pub mod pacer;
pub mod run;
pub mod source;
pub mod title_row;

pub use error::{Error, FormatError, Result};
