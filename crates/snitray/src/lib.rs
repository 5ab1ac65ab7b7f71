//! Tray items (StatusNotifierItem) for multi-threaded applications.
//!
//! The protocol objects and their bus connections only ever live on one
//! dedicated thread, owned by [`EventLoop`]; the handles this crate exposes
//! ([`TrayItem`], [`TrayMenu`]) can be used from anywhere and forward work
//! to that thread.
//!
//! ```no_run
//! let tray = snitray::EventLoop::instance()?;
//! let item = tray.create_item("demo")?;
//! item.set_title("Demo");
//! item.set_icon_name("dialog-information");
//!
//! let menu = tray.create_menu();
//! menu.add_action("Quit", || snitray::quit());
//! item.set_context_menu(Some(&menu));
//!
//! snitray::exec()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::Result;

mod config;
mod event_loop;
mod handle;
mod manager;
mod util;

pub use config::{Config, NoMenuPath};
pub use event_loop::{EventLoop, LoopContext};
pub use handle::{TrayItem, TrayMenu};
pub use manager::TrayManager;

pub use notifier_item::{
    dbus::IconPixmap, ActionId, Category, FileIcon, IconSource, Orientation, Status,
};

/// Start the tray system (idempotent). Returns an error if the event loop
/// thread cannot be brought up; nothing is left half-initialized in that
/// case.
pub fn init() -> Result<()> {
    EventLoop::instance().map(|_| ())
}

pub fn init_with_config(config: Config) -> Result<()> {
    if EventLoop::get().is_some() {
        log::warn!("tray system already initialized, configuration left unchanged");
    }
    EventLoop::instance_with(config).map(|_| ())
}

/// Stop the event loop and drop all published items. Safe to call multiple
/// times, from any thread except the loop's own.
pub fn shutdown() {
    if let Some(event_loop) = EventLoop::get() {
        event_loop.shutdown();
    }
}

/// Pump tray events until [`quit`] is called. Survives panics raised while
/// processing events; those are logged and the loop carries on.
pub fn exec() -> Result<()> {
    let event_loop = EventLoop::instance()?;
    event_loop.begin_pumping();
    while event_loop.is_pumping() {
        let pumped = catch_unwind(AssertUnwindSafe(|| {
            event_loop.run_blocking(|ctx| ctx.manager().pump_events(ctx))
        }));
        match pumped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("cannot pump tray events: {}", e);
                break;
            }
            Err(_) => log::error!("panic while processing tray events"),
        }
    }
    Ok(())
}

/// Make [`exec`] return after its current slice.
pub fn quit() {
    if let Some(event_loop) = EventLoop::get() {
        event_loop.stop_pumping();
    }
}
