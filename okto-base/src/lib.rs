mod font;
pub mod instruction;
pub mod machine;
mod nibble_ints;
pub mod runner;
pub mod screen;
