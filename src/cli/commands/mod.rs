pub mod check;
pub mod deploy;
pub mod destroy;
pub mod diff;
pub mod environments;
pub mod synth;
