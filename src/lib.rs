pub mod args;
pub mod collator;
pub mod convert;
pub mod errors;
