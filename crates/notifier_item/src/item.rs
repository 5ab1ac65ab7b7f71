use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use zbus::zvariant::{ObjectPath, OwnedObjectPath};

use crate::{
    dbus::{self, IconPixmap, MenuExportBridge, StatusNotifierItemIface},
    menu::{Menu, ObserverId},
    names,
    proxy::NotificationsProxy,
    register, Error, Result,
};

/// Recognised values of [`org.kde.StatusNotifierItem.Status`].
///
/// [`org.kde.StatusNotifierItem.Status`]: https://www.freedesktop.org/wiki/Specifications/StatusNotifierItem/StatusNotifierItem/#org.freedesktop.statusnotifieritem.status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The item doesn't convey important information to the user, it can be considered an "idle"
    /// status and is likely that visualizations will chose to hide it.
    Passive,
    /// The item is active, is more important that the item will be shown in some way to the user.
    Active,
    /// The item carries really important information for the user, such as battery charge running
    /// out and is wants to incentive the direct user intervention. Visualizations should emphasize
    /// in some way the items with NeedsAttention status.
    NeedsAttention,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passive => "Passive",
            Status::Active => "Active",
            Status::NeedsAttention => "NeedsAttention",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ParseStatusError;

impl std::str::FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, ParseStatusError> {
        match s {
            "Passive" => Ok(Status::Passive),
            "Active" => Ok(Status::Active),
            "NeedsAttention" => Ok(Status::NeedsAttention),
            _ => Err(ParseStatusError),
        }
    }
}

/// Recognised values of `org.kde.StatusNotifierItem.Category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ApplicationStatus,
    Communications,
    SystemServices,
    Hardware,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ApplicationStatus => "ApplicationStatus",
            Category::Communications => "Communications",
            Category::SystemServices => "SystemServices",
            Category::Hardware => "Hardware",
        }
    }
}

/// Scroll direction as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Anything that isn't exactly "horizontal" (case-insensitively) scrolls
    /// vertically.
    pub fn from_wire(orientation: &str) -> Orientation {
        if orientation.eq_ignore_ascii_case("horizontal") {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// An icon slot holds either a themed name or decoded pixmaps, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconRef {
    Named(String),
    Pixmaps(Vec<IconPixmap>),
}

pub type PointCallback = Arc<Mutex<Box<dyn FnMut(i32, i32) + Send>>>;
pub type ScrollCallback = Arc<Mutex<Box<dyn FnMut(i32, Orientation) + Send>>>;

/// A change that still has to be announced on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PropertyEvent {
    Title,
    Icon,
    OverlayIcon,
    AttentionIcon,
    ToolTip,
    Status(Status),
    Menu,
}

/// Everything a host can observe about one item. Setters compare first and
/// only report an event when the stored value actually changed.
pub(crate) struct ItemState {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) status: Status,
    pub(crate) category: Category,
    pub(crate) icon: Option<IconRef>,
    pub(crate) overlay_icon: Option<IconRef>,
    pub(crate) attention_icon: Option<IconRef>,
    pub(crate) tooltip_title: String,
    pub(crate) tooltip_subtitle: String,
    pub(crate) tooltip_icon: Option<IconRef>,
    pub(crate) menu_path: OwnedObjectPath,
    pub(crate) no_menu_path: OwnedObjectPath,
    pub(crate) menu: Option<(Menu, ObserverId)>,
    pub(crate) on_activate: Option<PointCallback>,
    pub(crate) on_secondary_activate: Option<PointCallback>,
    pub(crate) on_scroll: Option<ScrollCallback>,
}

impl ItemState {
    pub(crate) fn new(id: &str, no_menu_path: OwnedObjectPath) -> ItemState {
        ItemState {
            id: id.to_owned(),
            title: "Test".to_owned(),
            status: Status::Active,
            category: Category::ApplicationStatus,
            icon: None,
            overlay_icon: None,
            attention_icon: None,
            tooltip_title: String::new(),
            tooltip_subtitle: String::new(),
            tooltip_icon: None,
            menu_path: no_menu_path.clone(),
            no_menu_path,
            menu: None,
            on_activate: None,
            on_secondary_activate: None,
            on_scroll: None,
        }
    }

    pub(crate) fn set_title(&mut self, title: &str) -> Option<PropertyEvent> {
        if self.title == title {
            return None;
        }
        self.title = title.to_owned();
        Some(PropertyEvent::Title)
    }

    pub(crate) fn set_status(&mut self, status: Status) -> Option<PropertyEvent> {
        if self.status == status {
            return None;
        }
        self.status = status;
        Some(PropertyEvent::Status(status))
    }

    pub(crate) fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    fn set_slot(slot: &mut Option<IconRef>, value: IconRef, event: PropertyEvent) -> Option<PropertyEvent> {
        if slot.as_ref() == Some(&value) {
            return None;
        }
        *slot = Some(value);
        Some(event)
    }

    pub(crate) fn set_icon_name(&mut self, name: &str) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.icon, IconRef::Named(name.to_owned()), PropertyEvent::Icon)
    }

    pub(crate) fn set_icon_pixmaps(&mut self, pixmaps: Vec<IconPixmap>) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.icon, IconRef::Pixmaps(pixmaps), PropertyEvent::Icon)
    }

    pub(crate) fn set_overlay_icon_name(&mut self, name: &str) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.overlay_icon, IconRef::Named(name.to_owned()), PropertyEvent::OverlayIcon)
    }

    pub(crate) fn set_overlay_icon_pixmaps(&mut self, pixmaps: Vec<IconPixmap>) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.overlay_icon, IconRef::Pixmaps(pixmaps), PropertyEvent::OverlayIcon)
    }

    pub(crate) fn set_attention_icon_name(&mut self, name: &str) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.attention_icon, IconRef::Named(name.to_owned()), PropertyEvent::AttentionIcon)
    }

    pub(crate) fn set_attention_icon_pixmaps(&mut self, pixmaps: Vec<IconPixmap>) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.attention_icon, IconRef::Pixmaps(pixmaps), PropertyEvent::AttentionIcon)
    }

    pub(crate) fn set_tooltip_title(&mut self, title: &str) -> Option<PropertyEvent> {
        if self.tooltip_title == title {
            return None;
        }
        self.tooltip_title = title.to_owned();
        Some(PropertyEvent::ToolTip)
    }

    pub(crate) fn set_tooltip_subtitle(&mut self, subtitle: &str) -> Option<PropertyEvent> {
        if self.tooltip_subtitle == subtitle {
            return None;
        }
        self.tooltip_subtitle = subtitle.to_owned();
        Some(PropertyEvent::ToolTip)
    }

    pub(crate) fn set_tooltip_icon_name(&mut self, name: &str) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.tooltip_icon, IconRef::Named(name.to_owned()), PropertyEvent::ToolTip)
    }

    pub(crate) fn set_tooltip_icon_pixmaps(&mut self, pixmaps: Vec<IconPixmap>) -> Option<PropertyEvent> {
        Self::set_slot(&mut self.tooltip_icon, IconRef::Pixmaps(pixmaps), PropertyEvent::ToolTip)
    }

    pub(crate) fn set_menu_path(&mut self, path: OwnedObjectPath) -> Option<PropertyEvent> {
        if self.menu_path == path {
            return None;
        }
        self.menu_path = path;
        Some(PropertyEvent::Menu)
    }

    /// The notifications a host is nudged with when it may have missed
    /// earlier ones; always emitted, current value or not.
    pub(crate) fn force_update_events(&self) -> Vec<PropertyEvent> {
        vec![PropertyEvent::Icon, PropertyEvent::ToolTip, PropertyEvent::Status(self.status)]
    }

    /// Host activation clears a pending attention request before the
    /// callback runs.
    pub(crate) fn begin_activation(&mut self, secondary: bool) -> (Option<Status>, Option<PointCallback>) {
        let status = if self.status == Status::NeedsAttention {
            self.status = Status::Active;
            Some(Status::Active)
        } else {
            None
        };
        let callback = if secondary { self.on_secondary_activate.clone() } else { self.on_activate.clone() };
        (status, callback)
    }

    pub(crate) fn attached_menu(&self) -> Option<Menu> {
        self.menu.as_ref().map(|(menu, _)| menu.clone())
    }
}

/// One published tray item: its bus connection, its observable state and the
/// export bridge for an attached menu.
///
/// Mutating methods queue their change notifications onto the runtime the
/// item was created on; they are cheap and non-blocking for the caller.
pub struct Item {
    service: String,
    conn: zbus::Connection,
    state: Arc<Mutex<ItemState>>,
    bridge: Mutex<Option<MenuExportBridge>>,
    watch: Mutex<Option<tokio::task::JoinHandle<()>>>,
    handle: tokio::runtime::Handle,
    weak_self: Weak<Item>,
}

impl Item {
    /// Connect to the session bus under `service`, publish the item object
    /// and register with the watcher (best-effort, self-healing on watcher
    /// restarts).
    pub async fn new(id: &str, service: String, no_menu_path: &str) -> Result<Arc<Item>> {
        let no_menu = ObjectPath::try_from(no_menu_path)
            .map_err(|source| Error::InvalidObjectPath { path: no_menu_path.to_owned(), source })?
            .into();
        let state = Arc::new(Mutex::new(ItemState::new(id, no_menu)));

        let conn = zbus::connection::Builder::session()?
            .name(service.as_str())?
            .serve_at(names::ITEM_OBJECT, StatusNotifierItemIface::new(state.clone()))?
            .build()
            .await?;

        let item = Arc::new_cyclic(|weak| Item {
            service,
            conn: conn.clone(),
            state,
            bridge: Mutex::new(None),
            watch: Mutex::new(None),
            handle: tokio::runtime::Handle::current(),
            weak_self: weak.clone(),
        });
        let watch = tokio::spawn(register::keep_registered(conn));
        *item.watch.lock().unwrap() = Some(watch); // unwrap: mutex poisoning is okay
        Ok(item)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ItemState) -> R) -> R {
        f(&mut self.state.lock().unwrap()) // unwrap: mutex poisoning is okay
    }

    fn notify(&self, events: Vec<PropertyEvent>) {
        if events.is_empty() {
            return;
        }
        let conn = self.conn.clone();
        self.handle.spawn(async move {
            for event in &events {
                if let Err(e) = dbus::emit_property_event(&conn, event).await {
                    log::warn!("failed to signal property change: {}", e);
                }
            }
        });
    }

    fn notify_one(&self, event: Option<PropertyEvent>) {
        self.notify(event.into_iter().collect());
    }

    pub fn set_title(&self, title: &str) {
        self.notify_one(self.with_state(|state| state.set_title(title)));
    }

    pub fn set_status(&self, status: Status) {
        self.notify_one(self.with_state(|state| state.set_status(status)));
    }

    pub fn set_category(&self, category: Category) {
        self.with_state(|state| state.set_category(category));
    }

    pub fn set_icon_name(&self, name: &str) {
        self.notify_one(self.with_state(|state| state.set_icon_name(name)));
    }

    pub fn set_icon_pixmaps(&self, pixmaps: Vec<IconPixmap>) {
        self.notify_one(self.with_state(|state| state.set_icon_pixmaps(pixmaps)));
    }

    pub fn set_overlay_icon_name(&self, name: &str) {
        self.notify_one(self.with_state(|state| state.set_overlay_icon_name(name)));
    }

    pub fn set_overlay_icon_pixmaps(&self, pixmaps: Vec<IconPixmap>) {
        self.notify_one(self.with_state(|state| state.set_overlay_icon_pixmaps(pixmaps)));
    }

    pub fn set_attention_icon_name(&self, name: &str) {
        self.notify_one(self.with_state(|state| state.set_attention_icon_name(name)));
    }

    pub fn set_attention_icon_pixmaps(&self, pixmaps: Vec<IconPixmap>) {
        self.notify_one(self.with_state(|state| state.set_attention_icon_pixmaps(pixmaps)));
    }

    pub fn set_tooltip_title(&self, title: &str) {
        self.notify_one(self.with_state(|state| state.set_tooltip_title(title)));
    }

    pub fn set_tooltip_subtitle(&self, subtitle: &str) {
        self.notify_one(self.with_state(|state| state.set_tooltip_subtitle(subtitle)));
    }

    pub fn set_tooltip_icon_name(&self, name: &str) {
        self.notify_one(self.with_state(|state| state.set_tooltip_icon_name(name)));
    }

    pub fn set_tooltip_icon_pixmaps(&self, pixmaps: Vec<IconPixmap>) {
        self.notify_one(self.with_state(|state| state.set_tooltip_icon_pixmaps(pixmaps)));
    }

    pub fn on_activate(&self, callback: impl FnMut(i32, i32) + Send + 'static) {
        self.with_state(|state| state.on_activate = Some(wrap_point_callback(callback)));
    }

    pub fn on_secondary_activate(&self, callback: impl FnMut(i32, i32) + Send + 'static) {
        self.with_state(|state| state.on_secondary_activate = Some(wrap_point_callback(callback)));
    }

    pub fn on_scroll(&self, callback: impl FnMut(i32, Orientation) + Send + 'static) {
        self.with_state(|state| {
            state.on_scroll = Some(Arc::new(Mutex::new(Box::new(callback) as Box<dyn FnMut(i32, Orientation) + Send>)))
        });
    }

    /// Re-announce icon, tooltip and status whether they changed or not.
    pub fn force_update(&self) {
        let events = self.with_state(|state| state.force_update_events());
        self.notify(events);
    }

    /// Attach, replace or detach (`None`) the context menu.
    ///
    /// The export bridge of a previously attached menu is torn down before
    /// the `Menu` property change goes out, then the new menu is exported.
    pub fn set_context_menu(&self, menu: Option<Menu>) {
        let menu = menu.filter(|menu| !menu.is_destroyed());
        let (event, attach) = {
            let mut state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            if state.attached_menu() == menu {
                return;
            }
            if let Some((old, observer)) = state.menu.take() {
                old.unobserve_destroyed(observer);
            }
            match menu {
                Some(menu) => {
                    let weak = self.weak_self.clone();
                    let observer = menu.observe_destroyed(move || {
                        if let Some(item) = weak.upgrade() {
                            item.on_menu_destroyed();
                        }
                    });
                    state.menu = Some((menu.clone(), observer));
                    (state.set_menu_path(names::menu_object_path()), Some(menu))
                }
                None => {
                    let path = state.no_menu_path.clone();
                    (state.set_menu_path(path), None)
                }
            }
        };
        self.spawn_menu_transition(event, attach);
    }

    /// Runs when an attached menu is destroyed without being detached first:
    /// the reference is cleared and the path reverted before the destroyer
    /// regains control.
    fn on_menu_destroyed(&self) {
        let event = {
            let mut state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            if state.menu.take().is_none() {
                return;
            }
            let path = state.no_menu_path.clone();
            state.set_menu_path(path)
        };
        self.spawn_menu_transition(event, None);
    }

    fn spawn_menu_transition(&self, menu_changed: Option<PropertyEvent>, attach: Option<Menu>) {
        let item = match self.weak_self.upgrade() {
            Some(item) => item,
            None => return,
        };
        self.handle.spawn(async move {
            let old = item.bridge.lock().unwrap().take(); // unwrap: mutex poisoning is okay
            if let Some(bridge) = old {
                bridge.detach().await;
            }
            if let Some(event) = menu_changed {
                if let Err(e) = dbus::emit_property_event(&item.conn, &event).await {
                    log::warn!("failed to announce menu change: {}", e);
                }
            }
            if let Some(menu) = attach {
                match MenuExportBridge::attach(&item.conn, menu).await {
                    Ok(bridge) => *item.bridge.lock().unwrap() = Some(bridge), // unwrap: mutex poisoning is okay
                    Err(e) => log::warn!("failed to export menu: {}", e),
                }
            }
        });
    }

    /// One fire-and-forget desktop notification; failures stay unobserved.
    pub fn show_message(&self, title: &str, body: &str, icon_name: &str, timeout_ms: i32) {
        let app_name = self.with_state(|state| state.title.clone());
        let conn = self.conn.clone();
        let (title, body, icon_name) = (title.to_owned(), body.to_owned(), icon_name.to_owned());
        self.handle.spawn(async move {
            let result: zbus::Result<u32> = async {
                let notifications = NotificationsProxy::new(&conn).await?;
                notifications
                    .notify(&app_name, 0, &icon_name, &title, &body, &[], HashMap::new(), timeout_ms)
                    .await
            }
            .await;
            if let Err(e) = result {
                log::debug!("desktop notification failed: {}", e);
            }
        });
    }

    /// Unpublish the item and drop its connection. Safe to call even if the
    /// watcher registration never went through.
    pub async fn dispose(&self) {
        let watch = self.watch.lock().unwrap().take(); // unwrap: mutex poisoning is okay
        if let Some(watch) = watch {
            watch.abort();
        }
        {
            let mut state = self.state.lock().unwrap(); // unwrap: mutex poisoning is okay
            if let Some((menu, observer)) = state.menu.take() {
                menu.unobserve_destroyed(observer);
                let path = state.no_menu_path.clone();
                state.set_menu_path(path);
            }
        }
        let bridge = self.bridge.lock().unwrap().take(); // unwrap: mutex poisoning is okay
        if let Some(bridge) = bridge {
            bridge.detach().await;
        }
        if let Err(e) =
            self.conn.object_server().remove::<StatusNotifierItemIface, _>(names::ITEM_OBJECT).await
        {
            log::debug!("failed to remove the item object: {}", e);
        }
        if let Err(e) = self.conn.release_name(self.service.as_str()).await {
            log::debug!("failed to release {}: {}", self.service, e);
        }
        self.conn.clone().graceful_shutdown().await;
    }
}

fn wrap_point_callback(callback: impl FnMut(i32, i32) + Send + 'static) -> PointCallback {
    Arc::new(Mutex::new(Box::new(callback) as Box<dyn FnMut(i32, i32) + Send>))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_menu_state() -> ItemState {
        ItemState::new(
            "demo",
            ObjectPath::try_from(names::NO_MENU_OBJECT).unwrap().into(),
        )
    }

    #[test]
    fn setters_notify_exactly_once_per_change() {
        let mut state = no_menu_state();
        assert_eq!(state.set_title("Demo"), Some(PropertyEvent::Title));
        assert_eq!(state.set_title("Demo"), None);
        assert_eq!(state.set_status(Status::Active), None);
        assert_eq!(state.set_status(Status::NeedsAttention), Some(PropertyEvent::Status(Status::NeedsAttention)));
        assert_eq!(state.set_tooltip_title("tip"), Some(PropertyEvent::ToolTip));
        assert_eq!(state.set_tooltip_title("tip"), None);
    }

    #[test]
    fn icon_name_and_pixmaps_are_mutually_exclusive() {
        let mut state = no_menu_state();
        assert_eq!(state.set_icon_name("dialog-information"), Some(PropertyEvent::Icon));
        assert_eq!(state.icon, Some(IconRef::Named("dialog-information".to_owned())));

        let pixmaps = vec![IconPixmap { width: 1, height: 1, data: vec![0, 0, 0, 0] }];
        assert_eq!(state.set_icon_pixmaps(pixmaps.clone()), Some(PropertyEvent::Icon));
        assert_eq!(state.icon, Some(IconRef::Pixmaps(pixmaps.clone())));

        // Same pixmaps again: no event.
        assert_eq!(state.set_icon_pixmaps(pixmaps), None);

        // Back to a name clears the pixmaps.
        assert_eq!(state.set_icon_name("dialog-information"), Some(PropertyEvent::Icon));
        assert_eq!(state.icon, Some(IconRef::Named("dialog-information".to_owned())));
    }

    #[test]
    fn force_update_always_reports() {
        let state = no_menu_state();
        assert_eq!(
            state.force_update_events(),
            vec![PropertyEvent::Icon, PropertyEvent::ToolTip, PropertyEvent::Status(Status::Active)]
        );
    }

    #[test]
    fn activation_clears_needs_attention_once() {
        let mut state = no_menu_state();
        state.set_status(Status::NeedsAttention);

        let (status, _) = state.begin_activation(false);
        assert_eq!(status, Some(Status::Active));
        assert_eq!(state.status, Status::Active);

        // Already active: nothing to announce.
        let (status, _) = state.begin_activation(false);
        assert_eq!(status, None);
    }

    #[test]
    fn scenario_title_status_activate() {
        let mut state = no_menu_state();
        let mut events = Vec::new();

        events.extend(state.set_title("Demo"));
        events.extend(state.set_status(Status::Active));
        events.extend(state.set_title("Demo"));
        assert_eq!(events.iter().filter(|e| **e == PropertyEvent::Title).count(), 1);

        events.extend(state.set_status(Status::NeedsAttention));

        let hits = Arc::new(Mutex::new(Vec::new()));
        {
            let hits = hits.clone();
            state.on_activate = Some(wrap_point_callback(move |x, y| hits.lock().unwrap().push((x, y))));
        }

        let (status, callback) = state.begin_activation(false);
        events.extend(status.map(PropertyEvent::Status));
        (*callback.unwrap().lock().unwrap())(10, 20);

        let status_events: Vec<_> =
            events.iter().filter(|e| matches!(e, PropertyEvent::Status(_))).collect();
        assert_eq!(
            status_events,
            vec![&PropertyEvent::Status(Status::NeedsAttention), &PropertyEvent::Status(Status::Active)]
        );
        assert_eq!(*hits.lock().unwrap(), vec![(10, 20)]);
    }

    #[test]
    fn orientation_parsing_is_case_insensitive_and_defaults_to_vertical() {
        assert_eq!(Orientation::from_wire("horizontal"), Orientation::Horizontal);
        assert_eq!(Orientation::from_wire("HORIZONTAL"), Orientation::Horizontal);
        assert_eq!(Orientation::from_wire("Vertical"), Orientation::Vertical);
        assert_eq!(Orientation::from_wire("diagonal"), Orientation::Vertical);
        assert_eq!(Orientation::from_wire(""), Orientation::Vertical);
    }

    #[test]
    fn menu_path_tracks_attachment() {
        let mut state = no_menu_state();
        assert_eq!(state.menu_path.as_str(), names::NO_MENU_OBJECT);

        // Attach: reference stored, path flips to the menu object.
        let menu = Menu::new();
        let observer = menu.observe_destroyed(|| {});
        state.menu = Some((menu.clone(), observer));
        assert_eq!(state.set_menu_path(names::menu_object_path()), Some(PropertyEvent::Menu));
        assert_eq!(state.menu_path.as_str(), names::MENU_OBJECT);
        assert!(state.attached_menu().is_some());

        // Detach: reference cleared, path reverts.
        state.menu = None;
        let path = state.no_menu_path.clone();
        assert_eq!(state.set_menu_path(path), Some(PropertyEvent::Menu));
        assert_eq!(state.menu_path.as_str(), names::NO_MENU_OBJECT);
        assert!(state.attached_menu().is_none());
    }

    #[test]
    fn destroying_an_attached_menu_reverts_state_before_returning() {
        let state = Arc::new(Mutex::new(no_menu_state()));
        let menu = Menu::new();

        let observer = {
            let state = state.clone();
            menu.observe_destroyed(move || {
                let mut state = state.lock().unwrap();
                state.menu.take();
                let path = state.no_menu_path.clone();
                state.set_menu_path(path);
            })
        };
        {
            let mut state = state.lock().unwrap();
            state.menu = Some((menu.clone(), observer));
            state.set_menu_path(names::menu_object_path());
        }

        menu.destroy();

        let state = state.lock().unwrap();
        assert!(state.menu.is_none());
        assert_eq!(state.menu_path.as_str(), names::NO_MENU_OBJECT);
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in [Status::Passive, Status::Active, Status::NeedsAttention] {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("Attention".parse::<Status>().is_err());
    }
}
