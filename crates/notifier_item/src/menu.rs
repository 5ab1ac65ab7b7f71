use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use zbus::zvariant::Value;

use crate::dbus;

pub type ActionCallback = Arc<Mutex<Box<dyn FnMut() + Send>>>;

/// Identifies one entry of a menu tree. Returned by the `add_*` operations;
/// operations on an id that no longer exists (or was never created) are
/// silent no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(pub(crate) i32);

impl ActionId {
    pub const INVALID: ActionId = ActionId(-1);
}

/// Handle to a registered destruction observer, for unregistration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserverId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NodeKind {
    Standard,
    Separator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Toggle {
    checked: bool,
}

struct MenuNode {
    parent: i32,
    kind: NodeKind,
    label: String,
    enabled: bool,
    icon_name: Option<String>,
    toggle: Option<Toggle>,
    children: Vec<i32>,
    on_activate: Option<ActionCallback>,
}

impl Default for MenuNode {
    fn default() -> Self {
        MenuNode {
            parent: 0,
            kind: NodeKind::Standard,
            label: String::new(),
            enabled: true,
            icon_name: None,
            toggle: None,
            children: Vec::new(),
            on_activate: None,
        }
    }
}

struct MenuTree {
    nodes: HashMap<i32, MenuNode>,
    next_id: i32,
    revision: u32,
    shown: bool,
    destroyed: bool,
    observers: Vec<(u64, Box<dyn FnOnce() + Send>)>,
    next_observer: u64,
}

/// Connects a menu tree to the bus object it is exported at, so mutations
/// can announce themselves to the host.
#[derive(Clone)]
pub(crate) struct MenuBinding {
    conn: zbus::Connection,
    handle: tokio::runtime::Handle,
}

impl MenuBinding {
    pub(crate) fn new(conn: zbus::Connection, handle: tokio::runtime::Handle) -> Self {
        Self { conn, handle }
    }

    fn spawn_layout_updated(&self, revision: u32) {
        let conn = self.conn.clone();
        self.handle.spawn(async move {
            if let Err(e) = dbus::emit_layout_updated(&conn, revision).await {
                log::warn!("failed to signal menu layout update: {}", e);
            }
        });
    }

    fn spawn_properties_updated(&self, id: i32, properties: HashMap<String, Value<'static>>) {
        let conn = self.conn.clone();
        self.handle.spawn(async move {
            if let Err(e) = dbus::emit_items_properties_updated(&conn, id, properties).await {
                log::warn!("failed to signal menu property update: {}", e);
            }
        });
    }
}

struct MenuShared {
    tree: Mutex<MenuTree>,
    binding: Mutex<Option<MenuBinding>>,
}

/// A menu/submenu/action tree that can be attached to a tray item.
///
/// Handles are cheap clones of a shared tree; a submenu handle is the same
/// tree rooted at the submenu's owning entry, so an entry's icon or label
/// can still be changed after the submenu was created.
#[derive(Clone)]
pub struct Menu {
    shared: Arc<MenuShared>,
    root: i32,
}

impl PartialEq for Menu {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared) && self.root == other.root
    }
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Menu {
    pub fn new() -> Menu {
        let mut nodes = HashMap::new();
        nodes.insert(0, MenuNode::default());
        Menu {
            shared: Arc::new(MenuShared {
                tree: Mutex::new(MenuTree {
                    nodes,
                    next_id: 1,
                    revision: 1,
                    shown: false,
                    destroyed: false,
                    observers: Vec::new(),
                    next_observer: 1,
                }),
                binding: Mutex::new(None),
            }),
            root: 0,
        }
    }

    fn with_tree<R>(&self, f: impl FnOnce(&mut MenuTree) -> R) -> Option<R> {
        let mut tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
        if tree.destroyed {
            None
        } else {
            Some(f(&mut tree))
        }
    }

    fn add_node(&self, mut node: MenuNode) -> ActionId {
        node.parent = self.root;
        let id = self.with_tree(|tree| {
            if !tree.nodes.contains_key(&self.root) {
                return None;
            }
            let id = tree.next_id;
            tree.next_id += 1;
            tree.nodes.insert(id, node);
            if let Some(parent) = tree.nodes.get_mut(&self.root) {
                parent.children.push(id);
            }
            Some(id)
        });
        match id.flatten() {
            Some(id) => {
                self.notify_layout();
                ActionId(id)
            }
            None => ActionId::INVALID,
        }
    }

    pub fn add_action(&self, label: &str, callback: impl FnMut() + Send + 'static) -> ActionId {
        self.add_node(MenuNode {
            label: label.to_owned(),
            on_activate: Some(wrap_callback(callback)),
            ..Default::default()
        })
    }

    pub fn add_disabled_action(&self, label: &str, callback: impl FnMut() + Send + 'static) -> ActionId {
        self.add_node(MenuNode {
            label: label.to_owned(),
            enabled: false,
            on_activate: Some(wrap_callback(callback)),
            ..Default::default()
        })
    }

    /// A checkable entry. The checked state flips on every activation, like
    /// a toolkit checkbox would, and the host is told about the flip.
    pub fn add_checkable_action(
        &self,
        label: &str,
        checked: bool,
        callback: impl FnMut() + Send + 'static,
    ) -> ActionId {
        self.add_node(MenuNode {
            label: label.to_owned(),
            toggle: Some(Toggle { checked }),
            on_activate: Some(wrap_callback(callback)),
            ..Default::default()
        })
    }

    pub fn add_separator(&self) {
        self.add_node(MenuNode { kind: NodeKind::Separator, ..Default::default() });
    }

    /// Add a submenu entry and return a handle rooted at it. Entry-level
    /// operations (label, icon, enabled) address the submenu through the
    /// returned handle's [`Menu::entry_id`].
    pub fn add_submenu(&self, label: &str) -> Menu {
        let id = self.add_node(MenuNode { label: label.to_owned(), ..Default::default() });
        Menu { shared: self.shared.clone(), root: id.0 }
    }

    /// The entry this handle is rooted at; [`ActionId::INVALID`] for the
    /// top-level menu.
    pub fn entry_id(&self) -> ActionId {
        if self.root == 0 {
            ActionId::INVALID
        } else {
            ActionId(self.root)
        }
    }

    pub fn set_label(&self, id: ActionId, label: &str) {
        let label = label.to_owned();
        self.update_entry(id, "label", move |node| node.label = label);
    }

    pub fn set_enabled(&self, id: ActionId, enabled: bool) {
        self.update_entry(id, "enabled", move |node| node.enabled = enabled);
    }

    /// Set the icon shown next to an entry. Works on submenu entries too, so
    /// a submenu's icon can be set after the fact through its owning entry.
    pub fn set_icon_name(&self, id: ActionId, icon: &str) {
        let icon = icon.to_owned();
        self.update_entry(id, "icon-name", move |node| node.icon_name = Some(icon));
    }

    fn update_entry(&self, id: ActionId, property: &'static str, f: impl FnOnce(&mut MenuNode)) {
        if id.0 <= 0 {
            return;
        }
        let updated = self
            .with_tree(|tree| match tree.nodes.get_mut(&id.0) {
                Some(node) => {
                    f(node);
                    true
                }
                None => false,
            })
            .unwrap_or(false);
        if updated {
            self.notify_properties(id.0, &[property]);
        }
    }

    pub fn remove(&self, id: ActionId) {
        if id.0 <= 0 {
            return;
        }
        let removed = self
            .with_tree(|tree| {
                let parent = match tree.nodes.get(&id.0) {
                    Some(node) => node.parent,
                    None => return false,
                };
                if let Some(parent) = tree.nodes.get_mut(&parent) {
                    parent.children.retain(|child| *child != id.0);
                }
                remove_subtree(tree, id.0);
                true
            })
            .unwrap_or(false);
        if removed {
            self.notify_layout();
        }
    }

    /// Remove every entry below this handle's root.
    pub fn clear(&self) {
        let cleared = self
            .with_tree(|tree| {
                let children = match tree.nodes.get_mut(&self.root) {
                    Some(root) => std::mem::take(&mut root.children),
                    None => return false,
                };
                let had_any = !children.is_empty();
                for child in children {
                    remove_subtree(tree, child);
                }
                had_any
            })
            .unwrap_or(false);
        if cleared {
            self.notify_layout();
        }
    }

    /// Tear the menu down. Registered destruction observers run before this
    /// returns, so an owning item has already detached when the caller gets
    /// control back. Idempotent; all further operations are no-ops.
    pub fn destroy(&self) {
        let observers = {
            let mut tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
            if tree.destroyed {
                return;
            }
            tree.destroyed = true;
            tree.shown = false;
            tree.nodes.clear();
            std::mem::take(&mut tree.observers)
        };
        for (_, observer) in observers {
            observer();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.tree.lock().unwrap().destroyed // unwrap: mutex poisoning is okay
    }

    /// Register an observer that runs when [`Menu::destroy`] is called. If
    /// the menu is already gone the observer runs immediately.
    pub fn observe_destroyed(&self, observer: impl FnOnce() + Send + 'static) -> ObserverId {
        let observer: Box<dyn FnOnce() + Send> = Box::new(observer);
        {
            let mut tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
            if !tree.destroyed {
                let id = tree.next_observer;
                tree.next_observer += 1;
                tree.observers.push((id, observer));
                return ObserverId(id);
            }
        }
        observer();
        ObserverId(0)
    }

    pub fn unobserve_destroyed(&self, id: ObserverId) {
        let mut tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
        tree.observers.retain(|(observer, _)| *observer != id.0);
    }

    pub(crate) fn popup(&self, x: i32, y: i32) {
        if self.with_tree(|tree| tree.shown = true).is_some() {
            log::debug!("menu popup requested at ({}, {})", x, y);
        }
    }

    pub(crate) fn hide(&self) {
        self.with_tree(|tree| tree.shown = false);
    }

    pub(crate) fn is_shown(&self) -> bool {
        self.with_tree(|tree| tree.shown).unwrap_or(false)
    }

    pub(crate) fn bind(&self, binding: MenuBinding) {
        *self.shared.binding.lock().unwrap() = Some(binding); // unwrap: mutex poisoning is okay
    }

    pub(crate) fn unbind(&self) {
        *self.shared.binding.lock().unwrap() = None; // unwrap: mutex poisoning is okay
    }

    fn notify_layout(&self) {
        let revision = match self.with_tree(|tree| {
            tree.revision += 1;
            tree.revision
        }) {
            Some(revision) => revision,
            None => return,
        };
        let binding = self.shared.binding.lock().unwrap().clone(); // unwrap: mutex poisoning is okay
        if let Some(binding) = binding {
            binding.spawn_layout_updated(revision);
        }
    }

    fn notify_properties(&self, id: i32, property_names: &[&str]) {
        let filter: Vec<String> = property_names.iter().map(|name| (*name).to_owned()).collect();
        let properties = match self
            .with_tree(|tree| tree.nodes.get(&id).map(|node| node_properties(node, &filter)))
            .flatten()
        {
            Some(properties) => properties,
            None => return,
        };
        let binding = self.shared.binding.lock().unwrap().clone(); // unwrap: mutex poisoning is okay
        if let Some(binding) = binding {
            binding.spawn_properties_updated(id, properties);
        }
    }

    pub(crate) fn layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        property_names: &[String],
    ) -> Option<(u32, dbus::MenuLayoutItem)> {
        let tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
        if tree.destroyed {
            return None;
        }
        let root = if parent_id == 0 { self.root } else { parent_id };
        if !tree.nodes.contains_key(&root) {
            return None;
        }
        Some((tree.revision, build_layout(&tree, root, recursion_depth, property_names)))
    }

    pub(crate) fn group_properties(
        &self,
        ids: &[i32],
        property_names: &[String],
    ) -> Vec<(i32, HashMap<String, Value<'static>>)> {
        let tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
        if tree.destroyed {
            return Vec::new();
        }
        let ids: Vec<i32> = if ids.is_empty() { tree.nodes.keys().copied().collect() } else { ids.to_vec() };
        ids.into_iter()
            .filter_map(|id| tree.nodes.get(&id).map(|node| (id, node_properties(node, property_names))))
            .collect()
    }

    pub(crate) fn property(&self, id: i32, name: &str) -> Option<Value<'static>> {
        let tree = self.shared.tree.lock().unwrap(); // unwrap: mutex poisoning is okay
        if tree.destroyed {
            return None;
        }
        tree.nodes.get(&id).and_then(|node| node_properties(node, &[]).remove(name))
    }

    pub(crate) fn dispatch_event(&self, id: i32, event: &str) {
        if event != "clicked" {
            return;
        }
        let (callback, toggled) = match self.with_tree(|tree| match tree.nodes.get_mut(&id) {
            Some(node) => {
                let mut toggled = false;
                if let Some(toggle) = &mut node.toggle {
                    toggle.checked = !toggle.checked;
                    toggled = true;
                }
                (node.on_activate.clone(), toggled)
            }
            None => (None, false),
        }) {
            Some(result) => result,
            None => return,
        };
        if toggled {
            self.notify_properties(id, &["toggle-state"]);
        }
        if let Some(callback) = callback {
            (*callback.lock().unwrap())(); // unwrap: mutex poisoning is okay
        }
    }
}

fn wrap_callback(callback: impl FnMut() + Send + 'static) -> ActionCallback {
    Arc::new(Mutex::new(Box::new(callback) as Box<dyn FnMut() + Send>))
}

fn remove_subtree(tree: &mut MenuTree, id: i32) {
    if let Some(node) = tree.nodes.remove(&id) {
        for child in node.children {
            remove_subtree(tree, child);
        }
    }
}

fn node_properties(node: &MenuNode, filter: &[String]) -> HashMap<String, Value<'static>> {
    let mut properties = HashMap::new();
    match node.kind {
        NodeKind::Separator => {
            properties.insert("type".to_owned(), Value::from("separator"));
        }
        NodeKind::Standard => {
            properties.insert("label".to_owned(), Value::from(node.label.clone()));
            properties.insert("enabled".to_owned(), Value::from(node.enabled));
            if let Some(icon) = &node.icon_name {
                properties.insert("icon-name".to_owned(), Value::from(icon.clone()));
            }
            if let Some(toggle) = &node.toggle {
                properties.insert("toggle-type".to_owned(), Value::from("checkmark"));
                properties.insert("toggle-state".to_owned(), Value::from(i32::from(toggle.checked)));
            }
            if !node.children.is_empty() {
                properties.insert("children-display".to_owned(), Value::from("submenu"));
            }
        }
    }
    if !filter.is_empty() {
        properties.retain(|key, _| filter.iter().any(|wanted| wanted == key));
    }
    properties
}

fn build_layout(
    tree: &MenuTree,
    id: i32,
    recursion_depth: i32,
    property_names: &[String],
) -> dbus::MenuLayoutItem {
    let node = match tree.nodes.get(&id) {
        Some(node) => node,
        None => return dbus::MenuLayoutItem { id, ..Default::default() },
    };
    let mut layout = dbus::MenuLayoutItem {
        id,
        properties: node_properties(node, property_names),
        children: Vec::new(),
    };
    if recursion_depth != 0 {
        for child in &node.children {
            layout.children.push(build_layout(tree, *child, recursion_depth - 1, property_names).into());
        }
    }
    layout
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn layout_reflects_the_tree() {
        let menu = Menu::new();
        let quit = menu.add_action("Quit", || {});
        menu.add_separator();
        let submenu = menu.add_submenu("More");
        submenu.add_checkable_action("Verbose", true, || {});

        let (revision, layout) = menu.layout(0, -1, &[]).unwrap();
        assert!(revision > 1);
        assert_eq!(layout.id, 0);
        assert_eq!(layout.children.len(), 3);

        let (_, entry) = menu.layout(quit.0, -1, &[]).unwrap();
        assert_eq!(entry.properties.get("label"), Some(&Value::from("Quit".to_owned())));
        assert_eq!(entry.properties.get("enabled"), Some(&Value::from(true)));

        let (_, submenu_layout) = menu.layout(submenu.entry_id().0, -1, &[]).unwrap();
        assert_eq!(submenu_layout.properties.get("children-display"), Some(&Value::from("submenu")));
        assert_eq!(submenu_layout.children.len(), 1);
    }

    #[test]
    fn property_filter_limits_the_reply() {
        let menu = Menu::new();
        let id = menu.add_checkable_action("Verbose", false, || {});
        let (_, layout) = menu.layout(id.0, 0, &["label".to_owned()]).unwrap();
        assert_eq!(layout.properties.len(), 1);
        assert!(layout.properties.contains_key("label"));
    }

    #[test]
    fn clicking_invokes_the_callback_and_flips_toggles() {
        let menu = Menu::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = {
            let hits = hits.clone();
            menu.add_checkable_action("Verbose", false, move || {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        menu.dispatch_event(id.0, "clicked");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(menu.property(id.0, "toggle-state"), Some(Value::from(1)));

        menu.dispatch_event(id.0, "hovered");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn submenu_icons_land_on_the_owning_entry() {
        let menu = Menu::new();
        let submenu = menu.add_submenu("More");
        menu.set_icon_name(submenu.entry_id(), "folder");
        assert_eq!(menu.property(submenu.entry_id().0, "icon-name"), Some(Value::from("folder".to_owned())));
    }

    #[test]
    fn remove_drops_the_whole_subtree() {
        let menu = Menu::new();
        let submenu = menu.add_submenu("More");
        let inner = submenu.add_action("Inner", || {});
        menu.remove(submenu.entry_id());
        assert!(menu.layout(submenu.entry_id().0, -1, &[]).is_none());
        assert!(menu.property(inner.0, "label").is_none());
    }

    #[test]
    fn clear_keeps_the_root_but_drops_entries() {
        let menu = Menu::new();
        menu.add_action("One", || {});
        menu.add_action("Two", || {});
        menu.clear();
        let (_, layout) = menu.layout(0, -1, &[]).unwrap();
        assert!(layout.children.is_empty());
    }

    #[test]
    fn destroy_notifies_observers_once_and_is_idempotent() {
        let menu = Menu::new();
        let notified = Arc::new(AtomicUsize::new(0));
        {
            let notified = notified.clone();
            menu.observe_destroyed(move || {
                notified.fetch_add(1, Ordering::SeqCst);
            });
        }
        menu.destroy();
        menu.destroy();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert!(menu.is_destroyed());
        assert_eq!(menu.add_action("late", || {}), ActionId::INVALID);
    }

    #[test]
    fn unobserved_observers_do_not_fire() {
        let menu = Menu::new();
        let notified = Arc::new(AtomicUsize::new(0));
        let observer = {
            let notified = notified.clone();
            menu.observe_destroyed(move || {
                notified.fetch_add(1, Ordering::SeqCst);
            })
        };
        menu.unobserve_destroyed(observer);
        menu.destroy();
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn visibility_toggles() {
        let menu = Menu::new();
        assert!(!menu.is_shown());
        menu.popup(10, 20);
        assert!(menu.is_shown());
        menu.hide();
        assert!(!menu.is_shown());
    }
}
