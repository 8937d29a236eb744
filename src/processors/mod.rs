pub mod image;
pub mod scratch;
