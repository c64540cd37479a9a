//! Output gating.
//!
//! A Playbook App only writes the variables downstream Apps asked for.
//! [`OutputRequest`] holds that set; the facade consults it on every write
//! and silently skips variables nobody requested. [`OutputAccumulator`]
//! collects values across an App run and writes them in one pass.

pub mod accumulator;
pub mod request;

pub use accumulator::OutputAccumulator;
pub use request::OutputRequest;
