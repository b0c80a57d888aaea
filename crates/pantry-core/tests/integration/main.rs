mod batch_tests;
mod common;
mod scheduling_tests;
