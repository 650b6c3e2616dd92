// Floor map viewer for a location service

pub mod client;
pub mod core;
