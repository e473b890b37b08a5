pub mod services;

pub use services::GardenServices;
