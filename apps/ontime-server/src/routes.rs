pub mod api;
pub mod health;
pub mod report;
pub mod rundown;
pub mod settings;
