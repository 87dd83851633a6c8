pub mod dashboard;
pub mod days;
pub mod health;
