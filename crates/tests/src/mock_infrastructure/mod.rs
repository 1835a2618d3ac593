//! Reusable mock types for testing.

pub mod origin_mock;

pub use origin_mock::OriginMockBuilder;
