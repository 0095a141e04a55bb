pub mod action;
pub mod context;
pub mod environments;
pub mod nodes;
pub mod restore;
pub mod show;
pub mod target;
