//! ringlog-core: the Ring/Window/BufferWindow engine behind `ringlog`.
//!
//! This crate has no terminal/UI dependency. It owns the bounded history
//! buffer, the sliding view window, the coordinator that drives both from a
//! [`reader::Reader`] and a [`filter::Filter`], and the collaborator
//! contracts (`Reader`, `Parser`, `Filter`, [`line::Line`]) that the `ringlog`
//! binary crate implements against.
//!
//! # Modules
//!
//! - [`ring`]: bounded circular history of parsed lines.
//! - [`window`]: bounded sliding view holding handles into the ring.
//! - [`buffer_window`]: the coordinator tying ring, window, reader and filter
//!   together behind one mutex.
//! - [`line`]: the `Line` trait stored in the ring, plus `Mark`/`SourceId`.
//! - [`filter`]: the `Filter` trait and the bit-exact substring highlighter.
//! - [`parser`]: the `Parser` trait and the raw-text default.
//! - [`reader`]: the `Reader` trait and the pipe/tailed-file/multi readers.
//! - [`config`]: configuration loading (TOML file + env + CLI override order).
//! - [`error`]: shared error types.

#![forbid(unsafe_code)]

pub mod buffer_window;
pub mod config;
pub mod error;
pub mod filter;
pub mod line;
pub mod parser;
pub mod reader;
pub mod ring;
pub mod window;

pub use buffer_window::BufferWindow;
pub use error::{Error, Result};
pub use filter::{Filter, SubstringFilter};
pub use line::{Line, Mark, SourceId, TextLine};
pub use parser::{Parser, RawTextParser};
pub use reader::Reader;
pub use ring::{Handle, Ring};
pub use window::Window;
