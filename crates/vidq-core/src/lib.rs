pub mod config;
pub mod logging;

pub mod control;
pub mod events;
pub mod manager;
pub mod options;
pub mod progress;
pub mod store;
pub mod thumbs;
pub mod tool;
pub mod url_model;
pub mod worker;
