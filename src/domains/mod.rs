pub mod chain;
pub mod export;
pub mod reference;
