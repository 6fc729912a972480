pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod ml;
pub mod optimizer;

pub use domain::history::HistoricalRecord;
pub use domain::quote::QuoteRequest;
pub use domain::selection::SelectionResult;
pub use errors::{ApplicationError, InterfaceError, OptimizationError};
pub use history::{FormOptions, HistoryDataset, HistoryError};
pub use ml::{ModelLoadError, RegressionModel};
pub use optimizer::candidates::{CandidateSpace, CandidateSpaceError};
pub use optimizer::predictor::{DualPredictor, PredictionError, Regressor};
pub use optimizer::{DiscountOptimizer, Evaluation};
