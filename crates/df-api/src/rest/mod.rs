pub mod apps;
pub mod health;
