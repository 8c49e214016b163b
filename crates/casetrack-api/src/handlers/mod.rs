pub mod auth;
pub mod cases;
pub mod catalog;
pub mod health;
pub mod media;
