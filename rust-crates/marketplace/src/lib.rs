pub mod app;

pub mod market;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
