//! Core types and trait definitions for the gym subscriptions backend.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store crate implements the traits in [`store`]; the API and server
//! crates drive the [`lifecycle::LifecycleService`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod person;
pub mod plan;
pub mod status;
pub mod store;
pub mod subscription;
pub mod sweep;

pub use error::{Error, Result};
