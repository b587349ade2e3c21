pub mod display;
pub mod login;

pub use display::Display;
pub use login::Login;
