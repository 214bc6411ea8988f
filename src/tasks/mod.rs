//! Tasks, their hierarchy and the time attributed to them.

pub mod attribution;
pub mod collections;
pub mod model;
