pub mod builder;
pub mod identifiers;
pub mod imports;
pub mod pipeline;
pub mod records;
pub mod symbols;
