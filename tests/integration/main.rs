//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against a mock device and a recording bus. All tests run on the host
//! with no CAN hardware required.

mod bus_tests;
mod dispatch_tests;
mod mock_device;
mod registration_tests;
