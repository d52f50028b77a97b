//! Training data: CSV loading, source resolution and cleaning.

pub mod loader;
pub mod prepare;
pub mod sample;

pub use loader::{
    resolve_training_data, resolve_training_data_in, DataSource, RawTable, DEFAULT_TRAINING_FILE,
};
pub use prepare::prepare_data;
pub use sample::sample_table;
