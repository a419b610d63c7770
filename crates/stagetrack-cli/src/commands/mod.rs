pub mod catalog;
pub mod reset;
pub mod show;
pub mod stage;
pub mod start;
pub mod sync;
