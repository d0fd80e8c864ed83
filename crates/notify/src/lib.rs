pub mod format;
pub mod github;
pub mod publish;
pub mod report;
