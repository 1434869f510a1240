pub mod health;
pub mod system;
