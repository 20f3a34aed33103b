//! Runner harness adapters.

mod harness;

pub use harness::TokioHarness;
