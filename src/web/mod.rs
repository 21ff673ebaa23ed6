pub mod helper;
pub mod locator;
pub mod mock;
pub mod page;
pub mod session;
