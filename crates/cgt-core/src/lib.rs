pub mod audit;
pub mod calendar;
pub mod config;
pub mod corporate_actions;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod exemption;
pub mod matcher;
pub mod models;
pub mod parser;
pub mod position;
pub mod report;
pub mod txlog;
pub mod validation;
pub mod warnings;

pub use config::Config;
pub use engine::Engine;
pub use error::CgtError;
pub use exemption::get_exemption;
pub use models::*;
pub use parser::{parse_file, parse_str};
pub use report::Report;
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate};
