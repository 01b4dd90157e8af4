//! Cross-cutting types shared by every other module: the error taxonomy.

pub mod error;
