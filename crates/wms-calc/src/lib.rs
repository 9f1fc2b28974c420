//! # WMS Calculation Engine
//!
//! 無狀態的履約計算：倉庫評分、交期、波次規劃、包材與運費

pub mod lead_time;
pub mod packaging;
pub mod rating;
pub mod scoring;
pub mod wave_planning;

// Re-export 主要類型
pub use lead_time::LeadTimeCalculator;
pub use packaging::{PackagingCalculator, WeighedLine};
pub use rating::{rank_rates, CarrierTariff};
pub use scoring::{CandidateSnapshot, WarehouseScorer, SCORE_EPSILON};
pub use wave_planning::{WaveCandidate, WavePlanner};
