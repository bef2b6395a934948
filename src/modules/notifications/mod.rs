pub mod service;

pub use service::{DispatchError, DispatchFailure, EmailDispatcher, QueueEmailDispatcher};
