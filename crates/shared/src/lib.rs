pub mod domain;
pub mod error;
pub mod property;
pub mod protocol;
