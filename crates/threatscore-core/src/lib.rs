#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! threatscore-core
//!
//! Domain types, error taxonomy, the `DocumentStore` capability, configuration,
//! the synthetic sample generator and the department/organization aggregators.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod generator;
pub mod traits;
pub mod types;

pub use aggregate::{department_score, Aggregation, AggregationMode};
pub use error::{Error, Result};
pub use generator::SampleGenerator;
pub use traits::DocumentStore;
pub use types::{AggregatedScore, DepartmentDataset, DepartmentScore, IndexHandle, IndexSchema, RiskSample, MAX_SCORE};
