//! Kernel facade: drive one logical statement across its routed units
//! and present one logical result.
//!
//! The connection layer stays behind `StatementFactory`; routing and
//! SQL analysis stay in front, handing in `ExecutionUnit`s and a
//! `StatementContext`.

pub mod driver;


pub use driver::StatementDriver;
