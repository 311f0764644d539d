pub mod queue_reactive;
pub mod reactive_core;
pub mod unlock_reactive;
