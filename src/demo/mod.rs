//! Demo modules for the REPL bot: a general command set and an
//! `admin`-prefixed module driving the hot-reload loader.

pub mod admin;
pub mod general;

use crate::module::StaticResolver;
use stray_parse::BoundsPolicy;

/// A resolver over the demo modules.
///
/// `bounds_policy` configures what the numeric demo commands do with
/// out-of-range values.
pub fn resolver(bounds_policy: BoundsPolicy) -> StaticResolver {
    StaticResolver::new()
        .register("general", move || general::module(bounds_policy))
        .register("admin", admin::module)
}
