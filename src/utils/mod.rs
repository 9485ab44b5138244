pub mod error;
pub mod logger;
pub mod panic_hook;
pub mod validation;
