//! Component 4 – artifact writers. Each writer drops its files into the
//! output directory.
pub mod bin;
pub mod c;
pub mod listing;
