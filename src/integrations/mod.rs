//! External service integrations.

pub mod llm_mapper {
    pub use crate::llm_mapper::*;
}
