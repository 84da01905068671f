// src/lib.rs
// Library interface for scope-harvest
pub mod backup;
pub mod checkpoint;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod harvester;
pub mod normalize;
pub mod platforms;
pub mod progress;
pub mod scope;
pub mod summary;
pub mod targets;
