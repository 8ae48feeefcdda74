pub mod assembler;
pub mod catalog;
pub mod money;
pub mod normalizer;
pub mod reconciler;
pub mod sync;
