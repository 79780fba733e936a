pub mod config;
pub mod countdown;
pub mod render;
pub mod run;
