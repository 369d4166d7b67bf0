//! Traffic Gate Library
//!
//! Serializes access to a contended intersection among concurrently
//! running vehicles, on top of a thread-safe blocking queue.

pub mod simulation;
