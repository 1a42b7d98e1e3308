mod commands;
mod print;
mod setup;
mod styles;

pub use commands::run;
