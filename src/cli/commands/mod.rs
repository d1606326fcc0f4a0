pub mod health;
pub mod note;
pub mod token;
pub mod user;
