//! Pipeline stages for PDF analysis.
//!
//! Each submodule implements exactly one transformation step and is tested
//! on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (prompts) ──▶ llm ──▶ table
//! (path/URL/  (lopdf)                 (chat)   (CSV: section)
//!  upload)
//! ```
//!
//! 1. [`input`]: canonicalise the path, URL or uploaded buffer to a local file
//! 2. [`extract`]: pull the text layer out of every page; runs in
//!    `spawn_blocking` because lopdf parsing is CPU-bound
//! 3. [`llm`]: send the prompt to the provider; the only stage with
//!    network I/O besides URL downloads
//! 4. [`table`]: find the `CSV:` section of the answer and parse it once

pub mod extract;
pub mod input;
pub mod llm;
pub mod table;
