pub mod login;
pub mod logout;
pub mod register;
pub mod session;

// Re-export main handlers
#[allow(unused_imports)]
pub use login::handle_login;

#[allow(unused_imports)]
pub use logout::handle_logout;

#[allow(unused_imports)]
pub use register::handle_register;

#[allow(unused_imports)]
pub use session::handle_session;
