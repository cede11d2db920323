//! Database layer - storage trait and its backends

pub mod memory;
pub mod postgres;
pub mod traits;

pub use memory::InMemoryQuestionStore;
pub use postgres::PostgresQuestionStore;
pub use traits::QuestionStore;
