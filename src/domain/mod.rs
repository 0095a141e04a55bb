pub mod capabilities;
pub mod environment;
pub mod services;
pub mod snapshot;
pub mod view_model;
