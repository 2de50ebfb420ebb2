pub mod clip;
pub mod loading;
pub mod silence;
