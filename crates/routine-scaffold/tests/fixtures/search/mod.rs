//! Generated routine template: Search guardian

pub mod critics;
pub mod observer;
pub mod workflow;

pub use workflow::run;
