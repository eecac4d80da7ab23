//! # Context Module
//!
//! Per-request processing pipeline, modeled as an explicit state machine.
//!
//! Every request moves through five stages in a fixed order:
//!
//! 1. initialization (resource setup)
//! 2. request processing (wrapping the raw request)
//! 3. endpoint determination (routing)
//! 4. response generation (hooks, argument binding, endpoint invocation)
//! 5. cleanup (resource teardown, runs on every path, error or not)
//!
//! A stage called out of order fails with a `ContextProcessing` error rather
//! than corrupting the pipeline. Errors raised at any stage are recorded on
//! the context and rendered through the endpoint's exception-handler chain;
//! the error path still ends in the response-generated state so cleanup and
//! response delivery are uniform.

mod core;
#[cfg(test)]
mod tests;

pub use core::{render_error, Context, State};
