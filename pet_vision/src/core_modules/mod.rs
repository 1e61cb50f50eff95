pub mod activity;
pub mod classifier;
pub mod detection;
pub mod history;
pub mod tracker;
pub mod zone;
