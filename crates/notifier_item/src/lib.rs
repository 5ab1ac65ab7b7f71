pub mod dbus;
pub mod names;
pub mod proxy;

mod error;
pub use error::*;

mod icon;
pub use icon::*;

mod item;
pub use item::*;

mod menu;
pub use menu::*;

mod register;
