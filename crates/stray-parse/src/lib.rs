//! # stray-parse
//!
//! Argument tokenization and primitive value parsing for the Straylight
//! bot framework.
//!
//! ## Features
//!
//! - Whitespace tokenization with a single level of `'`/`"` quoting
//! - Rest-of-line access for "consume everything" parameters
//! - Base-10 integer parsing with configurable bounds (clamp or reject)
//! - Boolean word sets (`yes`/`no`, `on`/`off`, `enable`/`disable`, ...)
//!
//! ## Quick Start
//!
//! ```rust
//! use stray_parse::Tokenizer;
//!
//! let mut toks = Tokenizer::new(r#"ban "Bad Actor" 30"#);
//! assert_eq!(toks.next_token(false).unwrap(), "ban");
//! assert_eq!(toks.next_token(true).unwrap(), "Bad Actor");
//! assert_eq!(toks.rest(), "30");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod tokenizer;
mod value;

pub use error::{TokenError, ValueError};
pub use tokenizer::Tokenizer;
pub use value::{Bound, Bounds, BoundsPolicy, FALSE_WORDS, TRUE_WORDS, parse_bool, parse_i64};
