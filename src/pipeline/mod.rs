//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements exactly one step. Extraction itself lives in
//! [`crate::extract`]; these are the stages around it.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ detect ──▶ select ──▶ stage ──▶ extract ──▶ postprocess
//! (bytes)    (MIME)     (category) (tmpfile) (strategy)  (cleanup + title)
//! ```
//!
//! 1. [`detect`]     : extension + MIME + supported verdict; never fails
//! 2. [`select`]     : category lookup tables; extension first, `text` last
//! 3. [`stage`]      : scoped temporary file removed on every exit path
//! 4. [`postprocess`]: deterministic Markdown cleanup and title derivation

pub mod detect;
pub mod postprocess;
pub mod select;
pub mod stage;
