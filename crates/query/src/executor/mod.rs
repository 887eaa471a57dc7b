//! Pipeline assembly.
//!
//! A `Plan` wires one statement's stages into a single record stream:
//!
//! ```text
//! sources -> join -> where -> group/window -> select, having -> distinct -> order by -> limit
//! ```
//!
//! Every stage is a lazily polled stream over the previous one. Dropping the output
//! drops the whole chain, including source streams and pending window timers.

mod plan;
mod projection;
mod source;
mod stage;

pub use plan::Plan;
