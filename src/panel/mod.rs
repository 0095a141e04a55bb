pub mod console;
pub mod controller;
pub mod host;
pub mod messages;
pub mod state;

#[cfg(test)]
pub mod testing;
