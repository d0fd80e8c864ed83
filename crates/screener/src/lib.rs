pub mod closeness;
pub mod enrich;
pub mod history;
pub mod pipeline;
