//! Pipeline stages for statement parsing.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped (e.g. a different model backend) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts ──▶ model ──▶ response
//! (path)    (pdfium)    (text)      (LLM)     (records)
//! ```
//!
//! 1. [`input`]   : check the path exists, is readable and starts with `%PDF`
//! 2. [`extract`] : page text and tables via pdfium, on a blocking thread;
//!    [`tables`] groups positioned text fragments into cell grids
//! 3. [`crate::prompts`]: fixed instruction template around the content
//! 4. [`model`]   : the hosted model call with deadline and retry; the only
//!    stage with network I/O
//! 5. [`response`]: locate the JSON array and coerce each element

pub mod extract;
pub mod input;
pub mod model;
pub mod response;
pub mod tables;
