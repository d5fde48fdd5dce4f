pub mod config;
pub mod describe;
pub mod recording;
pub mod source;
pub mod stages;
pub mod timeline;
pub mod watcher;
