use std::sync::Weak;

use anyhow::Result;
use notifier_item::{encode, ActionId, Category, FileIcon, IconSource, Item, Menu, Orientation, Status};

use crate::event_loop::EventLoop;

impl EventLoop {
    /// Publish a new tray item and hand back a thread-safe handle to it.
    pub fn create_item(&'static self, id: &str) -> Result<TrayItem> {
        let id = id.to_owned();
        let (serial, item) = self.run_blocking(move |ctx| ctx.manager().create_item(ctx, &id))??;
        Ok(TrayItem { rt: self, serial, item: std::sync::Arc::downgrade(&item) })
    }

    /// A fresh, unattached menu tree.
    pub fn create_menu(&'static self) -> TrayMenu {
        let menu = match self.run_blocking(|_| Menu::new()) {
            Ok(menu) => menu,
            Err(e) => {
                log::warn!("created a dead menu, the tray event loop is gone: {}", e);
                dead_menu()
            }
        };
        TrayMenu { rt: self, menu }
    }
}

fn dead_menu() -> Menu {
    let menu = Menu::new();
    menu.destroy();
    menu
}

/// Handle to one published tray item. Cheap to clone, safe to use from any
/// thread; every operation is forwarded to the event loop thread.
///
/// Operations on a destroyed item are silent no-ops, so stale handles are
/// harmless.
#[derive(Clone)]
pub struct TrayItem {
    rt: &'static EventLoop,
    serial: u64,
    item: Weak<Item>,
}

impl TrayItem {
    fn with_item(&self, f: impl FnOnce(&Item) + Send + 'static) {
        let item = self.item.clone();
        self.rt.run_async(move |_| {
            if let Some(item) = item.upgrade() {
                f(&item);
            }
        });
    }

    pub fn set_title(&self, title: &str) {
        let title = title.to_owned();
        self.with_item(move |item| item.set_title(&title));
    }

    pub fn set_status(&self, status: Status) {
        self.with_item(move |item| item.set_status(status));
    }

    pub fn set_category(&self, category: Category) {
        self.with_item(move |item| item.set_category(category));
    }

    pub fn set_icon_name(&self, name: &str) {
        let name = name.to_owned();
        self.with_item(move |item| item.set_icon_name(&name));
    }

    /// Encode `icon` into the wire format and install it, replacing any
    /// previously set icon name.
    pub fn set_icon(&self, icon: &dyn IconSource) {
        let pixmaps = encode(icon);
        self.with_item(move |item| item.set_icon_pixmaps(pixmaps));
    }

    pub fn set_icon_path(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let icon = FileIcon::open(path)?;
        self.set_icon(&icon);
        Ok(())
    }

    pub fn set_overlay_icon_name(&self, name: &str) {
        let name = name.to_owned();
        self.with_item(move |item| item.set_overlay_icon_name(&name));
    }

    pub fn set_overlay_icon(&self, icon: &dyn IconSource) {
        let pixmaps = encode(icon);
        self.with_item(move |item| item.set_overlay_icon_pixmaps(pixmaps));
    }

    pub fn set_attention_icon_name(&self, name: &str) {
        let name = name.to_owned();
        self.with_item(move |item| item.set_attention_icon_name(&name));
    }

    pub fn set_attention_icon(&self, icon: &dyn IconSource) {
        let pixmaps = encode(icon);
        self.with_item(move |item| item.set_attention_icon_pixmaps(pixmaps));
    }

    pub fn set_tooltip_title(&self, title: &str) {
        let title = title.to_owned();
        self.with_item(move |item| item.set_tooltip_title(&title));
    }

    pub fn set_tooltip_subtitle(&self, subtitle: &str) {
        let subtitle = subtitle.to_owned();
        self.with_item(move |item| item.set_tooltip_subtitle(&subtitle));
    }

    pub fn set_tooltip_icon_name(&self, name: &str) {
        let name = name.to_owned();
        self.with_item(move |item| item.set_tooltip_icon_name(&name));
    }

    pub fn set_tooltip_icon(&self, icon: &dyn IconSource) {
        let pixmaps = encode(icon);
        self.with_item(move |item| item.set_tooltip_icon_pixmaps(pixmaps));
    }

    pub fn on_activate(&self, callback: impl FnMut(i32, i32) + Send + 'static) {
        self.with_item(move |item| item.on_activate(callback));
    }

    pub fn on_secondary_activate(&self, callback: impl FnMut(i32, i32) + Send + 'static) {
        self.with_item(move |item| item.on_secondary_activate(callback));
    }

    pub fn on_scroll(&self, callback: impl FnMut(i32, Orientation) + Send + 'static) {
        self.with_item(move |item| item.on_scroll(callback));
    }

    /// Attach a menu (or detach with `None`). Detaching waits out the
    /// configured settle delay so the host can catch up, unless called from
    /// a tray callback.
    pub fn set_context_menu(&self, menu: Option<&TrayMenu>) {
        let menu = menu.map(|menu| menu.menu.clone());
        let detaching = menu.is_none();
        let item = self.item.clone();
        match self.rt.run_blocking(move |_| {
            if let Some(item) = item.upgrade() {
                item.set_context_menu(menu);
            }
        }) {
            Ok(()) => {
                if detaching && !self.rt.on_loop_thread() {
                    std::thread::sleep(self.rt.manager().config().menu_detach_settle);
                }
            }
            Err(e) => log::warn!("context menu change skipped: {}", e),
        }
    }

    /// Best-effort desktop notification; never reports failure.
    pub fn show_message(&self, title: &str, body: &str, icon_name: &str, timeout_ms: i32) {
        let (title, body, icon_name) = (title.to_owned(), body.to_owned(), icon_name.to_owned());
        self.with_item(move |item| item.show_message(&title, &body, &icon_name, timeout_ms));
    }

    /// Re-announce icon, tooltip and status even if nothing changed.
    pub fn force_update(&self) {
        self.with_item(|item| item.force_update());
    }

    /// Unregister the item from the bus and drop it. Later operations on
    /// this (or any cloned) handle do nothing.
    pub fn destroy(&self) {
        let serial = self.serial;
        crate::print_result_err!(
            "while destroying a tray item",
            self.rt.run_blocking(move |ctx| ctx.manager().destroy_item(ctx, serial))
        );
    }
}

/// Handle to a menu tree. Mutations are forwarded to the event loop thread;
/// entries keep working (label, icon, enabled) after the menu was attached,
/// and changes reach the host through the export bridge.
#[derive(Clone)]
pub struct TrayMenu {
    rt: &'static EventLoop,
    pub(crate) menu: Menu,
}

impl TrayMenu {
    fn on_loop<R>(&self, f: impl FnOnce(&Menu) -> R + Send + 'static) -> Option<R>
    where
        R: Send + 'static,
    {
        let menu = self.menu.clone();
        match self.rt.run_blocking(move |_| f(&menu)) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("menu operation skipped: {}", e);
                None
            }
        }
    }

    pub fn add_action(&self, label: &str, callback: impl FnMut() + Send + 'static) -> ActionId {
        let label = label.to_owned();
        self.on_loop(move |menu| menu.add_action(&label, callback)).unwrap_or(ActionId::INVALID)
    }

    pub fn add_disabled_action(&self, label: &str, callback: impl FnMut() + Send + 'static) -> ActionId {
        let label = label.to_owned();
        self.on_loop(move |menu| menu.add_disabled_action(&label, callback)).unwrap_or(ActionId::INVALID)
    }

    pub fn add_checkable_action(
        &self,
        label: &str,
        checked: bool,
        callback: impl FnMut() + Send + 'static,
    ) -> ActionId {
        let label = label.to_owned();
        self.on_loop(move |menu| menu.add_checkable_action(&label, checked, callback))
            .unwrap_or(ActionId::INVALID)
    }

    pub fn add_separator(&self) {
        self.on_loop(|menu| menu.add_separator());
    }

    pub fn add_submenu(&self, label: &str) -> TrayMenu {
        let label = label.to_owned();
        let menu = self.on_loop(move |menu| menu.add_submenu(&label)).unwrap_or_else(dead_menu);
        TrayMenu { rt: self.rt, menu }
    }

    /// The entry this (sub)menu hangs off, usable with [`TrayMenu::set_icon_name`]
    /// and friends on the parent.
    pub fn entry_id(&self) -> ActionId {
        self.menu.entry_id()
    }

    pub fn set_label(&self, id: ActionId, label: &str) {
        let label = label.to_owned();
        self.on_loop(move |menu| menu.set_label(id, &label));
    }

    pub fn set_enabled(&self, id: ActionId, enabled: bool) {
        self.on_loop(move |menu| menu.set_enabled(id, enabled));
    }

    pub fn set_icon_name(&self, id: ActionId, icon: &str) {
        let icon = icon.to_owned();
        self.on_loop(move |menu| menu.set_icon_name(id, &icon));
    }

    pub fn remove(&self, id: ActionId) {
        self.on_loop(move |menu| menu.remove(id));
    }

    pub fn clear(&self) {
        self.on_loop(|menu| menu.clear());
    }

    /// Destroy the menu. An item it is attached to detaches synchronously
    /// before this returns; afterwards the caller waits out the settle
    /// delay, like a plain detach would.
    pub fn destroy(&self) {
        let menu = self.menu.clone();
        match self.rt.run_blocking(move |_| menu.destroy()) {
            Ok(()) => {
                if !self.rt.on_loop_thread() {
                    std::thread::sleep(self.rt.manager().config().menu_detach_settle);
                }
            }
            Err(e) => log::warn!("menu destruction skipped: {}", e),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.menu.is_destroyed()
    }
}
