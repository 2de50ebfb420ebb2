pub(crate) mod dataset;
pub mod defaults;
pub mod inputs;
pub mod loader;
pub mod predictor;
pub mod request;
pub mod runner;
pub(crate) mod scope;
pub(crate) mod shaper;
pub mod traits;
