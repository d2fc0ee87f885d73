//! Model provider port.

pub mod client;
