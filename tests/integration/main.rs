//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the mock platform in `mock_hw`, except `worker_tests`, which
//! runs the real worker and alarm threads.

mod hysteresis_tests;
mod mock_hw;
