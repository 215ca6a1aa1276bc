//! Core types for Colloquy.

pub mod message;

pub use message::*;
