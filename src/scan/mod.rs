//! Scanning and scoring pipeline

pub mod composite;
pub mod darkflow;
pub mod pressure;
pub mod scoring;
pub mod types;

pub use composite::{CompositeScanner, ScanReport};
pub use darkflow::{dark_flow_score, DarkFlowAnalysis, DarkFlowConfig, DarkFlowScanner};
pub use pressure::{pressure_score, PressureConfig, PressureMetrics, PressureScanner};
pub use types::{
    sort_results, CandidateRow, Grade, ResultScore, ScanMode, ScanParameters, ScanResult,
};
