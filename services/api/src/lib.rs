pub mod adapters;
pub mod config;
pub mod error;
pub mod generation;
pub mod sermons;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
