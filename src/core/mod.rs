pub mod batch;
pub mod guard;
pub mod server;
pub mod supervisor;
pub mod unwind;

pub use crate::domain::model::{Fault, Outcome, Payload};
pub use crate::domain::ports::{Action, ConfigProvider, ConnectionHandler};
pub use crate::utils::error::Result;
