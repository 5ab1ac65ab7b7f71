use std::sync::{Arc, Mutex};

use zbus::{interface, object_server::SignalContext, zvariant::OwnedObjectPath};

use crate::{
    dbus::{IconPixmap, ToolTip},
    item::{IconRef, ItemState, Orientation, PropertyEvent},
    names,
};

/// The `org.kde.StatusNotifierItem` object served on each item's connection.
///
/// All mutable state lives behind the shared [`ItemState`]; this type only
/// translates between it and the wire.
pub struct StatusNotifierItemIface {
    state: Arc<Mutex<ItemState>>,
}

impl StatusNotifierItemIface {
    pub(crate) fn new(state: Arc<Mutex<ItemState>>) -> Self {
        Self { state }
    }
}

fn slot_name(slot: &Option<IconRef>) -> String {
    match slot {
        Some(IconRef::Named(name)) => name.clone(),
        _ => String::new(),
    }
}

fn slot_pixmaps(slot: &Option<IconRef>) -> Vec<IconPixmap> {
    match slot {
        Some(IconRef::Pixmaps(pixmaps)) => pixmaps.clone(),
        _ => Vec::new(),
    }
}

#[interface(name = "org.kde.StatusNotifierItem")]
impl StatusNotifierItemIface {
    #[zbus(property)]
    fn id(&self) -> String {
        self.state.lock().unwrap().id.clone() // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn category(&self) -> String {
        self.state.lock().unwrap().category.as_str().to_owned() // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn status(&self) -> String {
        self.state.lock().unwrap().status.as_str().to_owned() // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn title(&self) -> String {
        self.state.lock().unwrap().title.clone() // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn window_id(&self) -> i32 {
        0
    }

    #[zbus(property)]
    fn item_is_menu(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn icon_theme_path(&self) -> String {
        String::new()
    }

    #[zbus(property)]
    fn icon_name(&self) -> String {
        slot_name(&self.state.lock().unwrap().icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn icon_pixmap(&self) -> Vec<IconPixmap> {
        slot_pixmaps(&self.state.lock().unwrap().icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn overlay_icon_name(&self) -> String {
        slot_name(&self.state.lock().unwrap().overlay_icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn overlay_icon_pixmap(&self) -> Vec<IconPixmap> {
        slot_pixmaps(&self.state.lock().unwrap().overlay_icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn attention_icon_name(&self) -> String {
        slot_name(&self.state.lock().unwrap().attention_icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn attention_icon_pixmap(&self) -> Vec<IconPixmap> {
        slot_pixmaps(&self.state.lock().unwrap().attention_icon) // unwrap: mutex poisoning is okay
    }

    #[zbus(property)]
    fn tool_tip(&self) -> ToolTip {
        let state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
        ToolTip {
            icon_name: slot_name(&state.tooltip_icon),
            icon_pixmaps: slot_pixmaps(&state.tooltip_icon),
            title: state.tooltip_title.clone(),
            description: state.tooltip_subtitle.clone(),
        }
    }

    #[zbus(property)]
    fn menu(&self) -> OwnedObjectPath {
        self.state.lock().unwrap().menu_path.clone() // unwrap: mutex poisoning is okay
    }

    async fn activate(&self, x: i32, y: i32, #[zbus(signal_context)] ctxt: SignalContext<'_>) {
        let (status, callback) = {
            let mut state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            state.begin_activation(false)
        };
        if let Some(status) = status {
            if let Err(e) = Self::new_status(&ctxt, status.as_str()).await {
                log::warn!("failed to signal status change: {}", e);
            }
        }
        if let Some(callback) = callback {
            (*callback.lock().unwrap())(x, y); // unwrap: mutex poisoning is okay
        }
    }

    async fn secondary_activate(&self, x: i32, y: i32, #[zbus(signal_context)] ctxt: SignalContext<'_>) {
        let (status, callback) = {
            let mut state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            state.begin_activation(true)
        };
        if let Some(status) = status {
            if let Err(e) = Self::new_status(&ctxt, status.as_str()).await {
                log::warn!("failed to signal status change: {}", e);
            }
        }
        if let Some(callback) = callback {
            (*callback.lock().unwrap())(x, y); // unwrap: mutex poisoning is okay
        }
    }

    async fn context_menu(&self, x: i32, y: i32) {
        let menu = {
            let state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            state.attached_menu()
        };
        if let Some(menu) = menu {
            if menu.is_shown() {
                menu.hide();
            } else {
                menu.popup(x, y);
            }
        }
    }

    async fn scroll(&self, delta: i32, orientation: String) {
        let callback = {
            let state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            state.on_scroll.clone()
        };
        if let Some(callback) = callback {
            (*callback.lock().unwrap())(delta, Orientation::from_wire(&orientation)); // unwrap: mutex poisoning is okay
        }
    }

    #[zbus(signal)]
    async fn new_title(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_overlay_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_attention_icon(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_tool_tip(ctxt: &SignalContext<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn new_status(ctxt: &SignalContext<'_>, status: &str) -> zbus::Result<()>;
}

/// Emit the change notification belonging to one property event on the item
/// object of `conn`. `Menu` goes out as a generic `PropertiesChanged`
/// broadcast, everything else has a dedicated signal.
pub(crate) async fn emit_property_event(conn: &zbus::Connection, event: &PropertyEvent) -> zbus::Result<()> {
    let iface_ref =
        conn.object_server().interface::<_, StatusNotifierItemIface>(names::ITEM_OBJECT).await?;
    let ctxt = iface_ref.signal_context();
    match event {
        PropertyEvent::Title => StatusNotifierItemIface::new_title(ctxt).await,
        PropertyEvent::Icon => StatusNotifierItemIface::new_icon(ctxt).await,
        PropertyEvent::OverlayIcon => StatusNotifierItemIface::new_overlay_icon(ctxt).await,
        PropertyEvent::AttentionIcon => StatusNotifierItemIface::new_attention_icon(ctxt).await,
        PropertyEvent::ToolTip => StatusNotifierItemIface::new_tool_tip(ctxt).await,
        PropertyEvent::Status(status) => StatusNotifierItemIface::new_status(ctxt, status.as_str()).await,
        PropertyEvent::Menu => {
            let iface = iface_ref.get().await;
            iface.menu_changed(ctxt).await
        }
    }
}
