use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{Context, Result};
use notifier_item::{names, Item};

use crate::{config::Config, event_loop::LoopContext};

/// Registry of the process's published tray items.
///
/// Constructed exactly once, on the event loop thread, before the loop
/// signals readiness; all methods taking a [`LoopContext`] only ever run
/// there.
pub struct TrayManager {
    config: Config,
    no_menu_path: String,
    items: Mutex<HashMap<u64, Arc<Item>>>,
    next_serial: AtomicU64,
}

impl TrayManager {
    pub(crate) fn new(config: Config) -> TrayManager {
        let no_menu_path = config.no_menu_path.resolve();
        TrayManager {
            config,
            no_menu_path,
            items: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn create_item(&self, ctx: &LoopContext<'_>, id: &str) -> Result<(u64, Arc<Item>)> {
        let rt = ctx.runtime().context("Items cannot be created from within tray callbacks")?;
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let service = names::item_service(serial);
        let item = rt
            .block_on(Item::new(id, service, &self.no_menu_path))
            .context("Failed to publish the tray item on the session bus")?;
        self.items.lock().unwrap().insert(serial, item.clone()); // unwrap: mutex poisoning is okay
        Ok((serial, item))
    }

    pub(crate) fn destroy_item(&self, ctx: &LoopContext<'_>, serial: u64) {
        let item = self.items.lock().unwrap().remove(&serial); // unwrap: mutex poisoning is okay
        let Some(item) = item else { return };
        match ctx.runtime() {
            Some(rt) => rt.block_on(item.dispose()),
            // Reentrant destroy (e.g. from a menu callback): the loop is
            // busy right now, clean up as soon as it is idle again.
            None => ctx.spawn(async move { item.dispose().await }),
        }
    }

    /// Let the loop chew through pending bus traffic for one slice.
    pub(crate) fn pump_events(&self, ctx: &LoopContext<'_>) {
        if let Some(rt) = ctx.runtime() {
            rt.block_on(tokio::time::sleep(self.config.pump_slice));
        }
    }

    pub(crate) async fn dispose_all(&self) {
        let items: Vec<_> = self.items.lock().unwrap().drain().map(|(_, item)| item).collect(); // unwrap: mutex poisoning is okay
        for item in items {
            item.dispose().await;
        }
    }
}
