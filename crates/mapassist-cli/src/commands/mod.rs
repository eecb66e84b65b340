pub mod area;
pub mod offsets;
pub mod run;
pub mod snapshot;
