use std::time::Duration;

use smart_default::SmartDefault;

/// Which object path the `Menu` property advertises while no menu is
/// attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMenuPath {
    /// Pick based on the desktop session: Plasma wants `/NO_DBUSMENU`,
    /// everything else gets `/`.
    Auto,
    /// Always advertise this path.
    Path(String),
}

impl NoMenuPath {
    pub fn resolve(&self) -> String {
        match self {
            NoMenuPath::Auto => notifier_item::names::no_menu_path_for_environment().to_owned(),
            NoMenuPath::Path(path) => path.clone(),
        }
    }
}

/// Tunables of the tray runtime, fixed at [`crate::init_with_config`] time.
#[derive(Debug, Clone, SmartDefault)]
pub struct Config {
    #[default(NoMenuPath::Auto)]
    pub no_menu_path: NoMenuPath,

    /// How long a caller waits after detaching a menu, giving the host room
    /// to process the property change before the menu goes away under it.
    #[default(Duration::from_millis(50))]
    pub menu_detach_settle: Duration,

    /// Upper bound of one `pump_events` slice.
    #[default(Duration::from_millis(100))]
    pub pump_slice: Duration,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_paths_resolve_verbatim() {
        let policy = NoMenuPath::Path("/NO_DBUSMENU".to_owned());
        assert_eq!(policy.resolve(), "/NO_DBUSMENU");
    }

    #[test]
    fn auto_resolves_to_a_known_convention() {
        let path = NoMenuPath::Auto.resolve();
        assert!(path == "/" || path == "/NO_DBUSMENU");
    }

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.no_menu_path, NoMenuPath::Auto);
        assert_eq!(config.menu_detach_settle, Duration::from_millis(50));
        assert_eq!(config.pump_slice, Duration::from_millis(100));
    }
}
