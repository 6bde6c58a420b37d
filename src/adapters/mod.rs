pub mod engine;
pub mod parsers;
pub mod synth;
