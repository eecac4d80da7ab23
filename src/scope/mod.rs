//! # Scope Module
//!
//! Nested attribute scopes: the configuration-inheritance primitive.
//!
//! An [`AttributeScope`] is a read-mostly key/value mapping with an optional
//! parent. Lookup resolves locally first and falls back through the parent
//! chain to the root; writes always stay local. Region trees are sealed into
//! `Arc`-linked scope chains at build time, after which every scope is
//! read-only for the process lifetime.

mod core;

pub use core::AttributeScope;
