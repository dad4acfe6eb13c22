//! Windows installer drivers.

pub mod nsis;
