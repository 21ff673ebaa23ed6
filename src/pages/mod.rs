pub mod admin;
pub mod mobile;
