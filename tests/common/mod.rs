#![allow(dead_code)]

use std::error::Error;

pub use sequencer_test_utils::{init_tracing, wait_until, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;
