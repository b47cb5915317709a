//! Integration test harness

mod darkflow_test;
mod pipeline_test;
