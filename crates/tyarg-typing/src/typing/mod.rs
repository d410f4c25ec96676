pub mod env;
pub mod marker;
pub(crate) mod matcher;
pub(crate) mod reconstruct;
pub mod types;
