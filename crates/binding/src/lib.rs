//! Contract bindings for the token contracts the tracker reads.
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod token;

pub use token::IERC20;
