//! Top-level facade crate for otelpush.
//!
//! Re-exports the core data model and the runtime pipeline so users can depend
//! on a single crate.

pub mod core {
    pub use otelpush_core::*;
}

pub mod runtime {
    pub use otelpush_runtime::*;
}
