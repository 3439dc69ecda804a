pub mod appointments;
pub mod health;
