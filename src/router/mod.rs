//! # Router Module
//!
//! Flattens a region tree into a resolvable dispatch table and answers
//! "given method + path (or RPC name), which endpoint, with which parameter
//! bindings?".
//!
//! ## Architecture
//!
//! The router works in two phases:
//!
//! 1. **Sealing**: at build time the region tree is walked depth-first.
//!    URL prefixes accumulate (trimmed of separators, joined by one `/`),
//!    each region's config becomes an `Arc`-linked [`AttributeScope`]
//!    layer, and every endpoint's effective rule is compiled into an
//!    anchored regex with one capture group per `{name:type}` segment.
//!
//! 2. **Resolution**: rules are tried in registration order; the first rule
//!    whose pattern matches the path *and* whose method set contains the
//!    request method wins. Typed segments are coerced after the pattern
//!    match, so `/users/abc` against `/users/{id:int}` surfaces as an
//!    invalid parameter rather than a 404, unless a later rule matches the
//!    path outright.
//!
//! The sealed table is read-only; resolution takes `&self` and the
//! composition phase is single-threaded by contract.
//!
//! [`AttributeScope`]: crate::scope::AttributeScope

mod core;

pub use core::{
    RouteEntry, RouteMatch, Router, ScopeChain, ScopeLayer, MAX_INLINE_PARAMS, ParamVec,
};
