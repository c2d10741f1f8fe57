pub mod aggregate;
pub mod config;
pub mod load;
pub mod merge;
pub mod pipeline;
pub mod render;
pub mod report;
