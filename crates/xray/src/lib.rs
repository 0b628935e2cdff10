//! Xray - inspect template contexts as collapsible trees
//!
//! The parser walks a [`Value`] graph (possibly cyclic, possibly very deep)
//! and produces [`Descriptor`] trees that are bounded in depth, free of
//! cycles, typed with a fixed set of [`TypeTag`]s and sorted. The renderer
//! turns a tree into nested HTML.
//!
//! ```
//! use xray::{DataParser, Value, render};
//!
//! let context = Value::object([
//!     ("site", Value::object([("title", Value::from("My blog"))])),
//!     ("title", Value::from("Hello")),
//! ]);
//!
//! let mut parser = DataParser::default();
//! parser.set_global_keys(["site"]);
//! let global = parser.parse_global_data(&context)?.expect("max_depth > 0");
//! let page = parser.parse_page_data(&context)?.expect("max_depth > 0");
//!
//! assert!(global.child("site").is_some());
//! assert!(page.child("site").is_none());
//! assert!(render(&page).contains("Hello"));
//! # Ok::<(), xray::XrayError>(())
//! ```

mod classify;
mod descriptor;
mod error;
mod parser;
mod render;
mod sort;
mod summarize;
mod value;

pub use classify::classify;
pub use descriptor::{Content, Descriptor, TypeTag};
pub use error::{Result, XrayError};
pub use parser::{
    DEFAULT_CUTOFF, DEFAULT_MAX_DEPTH, DEFAULT_SHALLOW_KEYS, DataParser, Mode, ParseOptions,
    ROOT_KEY, SeenMap,
};
pub use render::render;
pub use sort::sort_alpha_num;
pub use summarize::{ELLIPSIS, Summary, apply_cutoff, format_number, summarize};
pub use value::{Function, Identity, Object, RegExp, Value};
