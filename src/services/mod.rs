pub mod consumer;
pub mod detector;
pub mod processor;
pub mod queue;
