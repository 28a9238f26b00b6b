//! Integration-test crate: all coverage lives in `tests/`.
