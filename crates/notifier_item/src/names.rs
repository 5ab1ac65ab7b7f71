//! Well-known bus names and object paths used by the StatusNotifierItem
//! protocol family.

use zbus::zvariant::{ObjectPath, OwnedObjectPath};

pub const WATCHER_BUS: &str = "org.kde.StatusNotifierWatcher";
pub const WATCHER_OBJECT: &str = "/StatusNotifierWatcher";

/// Object path every item is published at on its own connection.
pub const ITEM_OBJECT: &str = "/StatusNotifierItem";

/// Object path the menu export lives at while a menu is attached.
pub const MENU_OBJECT: &str = "/MenuBar";

/// The `Menu` property value that signals "no menu available" to most hosts.
pub const NO_MENU_OBJECT: &str = "/";

/// Plasma's dbusmenu implementation expects this sentinel instead of `/`.
pub const NO_MENU_OBJECT_KDE: &str = "/NO_DBUSMENU";

pub const NOTIFICATIONS_BUS: &str = "org.freedesktop.Notifications";
pub const NOTIFICATIONS_OBJECT: &str = "/org/freedesktop/Notifications";

/// Well-known name for the item with the given per-process serial, as
/// described in the StatusNotifierItem specification.
pub fn item_service(serial: u64) -> String {
    format!("org.freedesktop.StatusNotifierItem-{}-{}", std::process::id(), serial)
}

pub fn menu_object_path() -> OwnedObjectPath {
    ObjectPath::from_static_str_unchecked(MENU_OBJECT).into()
}

/// The no-menu path appropriate for the current desktop session.
///
/// This is a heuristic: only KDE/Plasma sessions are detected, everything
/// else gets the generic root path.
pub fn no_menu_path_for_environment() -> &'static str {
    let xdg = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
    let session = std::env::var("DESKTOP_SESSION").unwrap_or_default();
    let kde_full_session = std::env::var_os("KDE_FULL_SESSION").is_some();
    no_menu_path_for(&xdg, &session, kde_full_session)
}

fn no_menu_path_for(xdg_current_desktop: &str, desktop_session: &str, kde_full_session: bool) -> &'static str {
    let xdg = xdg_current_desktop.to_lowercase();
    let session = desktop_session.to_lowercase();
    if xdg.contains("kde")
        || xdg.contains("plasma")
        || session.contains("kde")
        || session.contains("plasma")
        || kde_full_session
    {
        NO_MENU_OBJECT_KDE
    } else {
        NO_MENU_OBJECT
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn item_service_names_are_unique_per_serial() {
        let a = item_service(1);
        let b = item_service(2);
        assert_ne!(a, b);
        assert!(a.starts_with("org.freedesktop.StatusNotifierItem-"));
    }

    #[test]
    fn kde_sessions_get_the_sentinel_path() {
        assert_eq!(no_menu_path_for("KDE", "", false), NO_MENU_OBJECT_KDE);
        assert_eq!(no_menu_path_for("X-Plasma", "", false), NO_MENU_OBJECT_KDE);
        assert_eq!(no_menu_path_for("", "plasmawayland", false), NO_MENU_OBJECT_KDE);
        assert_eq!(no_menu_path_for("", "", true), NO_MENU_OBJECT_KDE);
    }

    #[test]
    fn other_sessions_get_the_root_path() {
        assert_eq!(no_menu_path_for("GNOME", "gnome", false), NO_MENU_OBJECT);
        assert_eq!(no_menu_path_for("", "", false), NO_MENU_OBJECT);
    }
}
