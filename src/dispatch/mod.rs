mod service;

pub use service::{DispatchMode, DispatchOutcome, Dispatcher};
