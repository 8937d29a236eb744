pub mod logger;
pub mod setup;
