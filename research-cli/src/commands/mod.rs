pub mod config;
pub mod decide;
pub mod notebook;
pub mod report;
pub mod templates;
