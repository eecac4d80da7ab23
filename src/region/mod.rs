//! # Region Module
//!
//! Hierarchical composition of endpoints and shared configuration.
//!
//! A [`Region`] is a named node owning endpoints, exception handlers,
//! before/after request hooks, and child regions attached under optional URL
//! prefixes. Regions compose into a tree; the tree is sealed into a
//! dispatch table by the router when the application is built. Configuration
//! set on a region cascades to everything beneath it through the attribute
//! scope chain, with inner values shadowing outer ones.
//!
//! Regions are mutated only during the single-threaded composition phase.
//! Attachment moves the child into the parent, so a region can never be
//! attached twice or become its own ancestor.

mod core;

pub use core::{
    AfterHook, BeforeHook, Endpoint, EndpointFn, EndpointOptions, ErrorHandlerFn,
    ExceptionHandler, Region, RegionKind,
};
