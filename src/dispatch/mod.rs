//! # Dispatch Module
//!
//! Explicit parameter schemas for endpoint and handler callables.
//!
//! Every callable registered with a region carries a [`Dispatchable`]: an
//! ordered list of [`DispatchParam`] entries (name, declared type, optional
//! default) plus a return-type tag. The schema is declared statically at
//! registration time, derived from the URL rule's `{name:type}` segments or
//! built explicitly, and drives type-directed argument coercion in the
//! router and context layers.

mod core;
#[cfg(test)]
mod tests;

pub use core::{Args, DispatchParam, Dispatchable, ParamType};
