// Field mapping pipeline and shared errors/models
pub mod nested_path {
    pub use crate::nested_path::*;
}

pub mod heuristics {
    pub use crate::heuristics::*;
}

pub mod mapping_engine {
    pub use crate::mapping_engine::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
