pub mod bridge;
pub mod driver;
pub mod element;
pub mod hierarchy;
pub mod poll;
