pub mod backend;
pub mod catalog;
pub mod event;
pub mod level;
pub mod timer;
