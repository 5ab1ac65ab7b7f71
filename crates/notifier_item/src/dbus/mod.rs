//! # DBus wire structures and served interfaces
//!
//! The structure layouts follow the signatures in the StatusNotifierItem and
//! [com.canonical.dbusmenu] interface descriptions as shipped by
//! [Waybar](https://github.com/Alexays/Waybar/tree/master/protocol); see
//! ["Writing a server interface" in the zbus
//! tutorial](https://dbus2.github.io/zbus/) for the serving side.
//!
//! [com.canonical.dbusmenu]: https://github.com/AyatanaIndicators/libdbusmenu

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zbus::zvariant::{StructureBuilder, Type, Value};

mod item_interface;
pub(crate) use item_interface::emit_property_event;
pub use item_interface::StatusNotifierItemIface;

mod menu_interface;
pub(crate) use menu_interface::{emit_items_properties_updated, emit_layout_updated};
pub use menu_interface::{DBusMenuIface, MenuExportBridge};

/// One icon resolution in the wire format: width, height and one 32-bit
/// big-endian ARGB word per pixel. Signature `(iiay)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct IconPixmap {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// The `ToolTip` property payload. Signature `(sa(iiay)ss)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct ToolTip {
    pub icon_name: String,
    pub icon_pixmaps: Vec<IconPixmap>,
    pub title: String,
    pub description: String,
}

/// One node of a `GetLayout` reply. Signature `(ia{sv}av)`; children are
/// nested values of the same shape.
#[derive(Clone, Debug, Default, Serialize, Type)]
pub struct MenuLayoutItem {
    pub id: i32,
    pub properties: HashMap<String, Value<'static>>,
    pub children: Vec<Value<'static>>,
}

impl From<MenuLayoutItem> for Value<'static> {
    fn from(item: MenuLayoutItem) -> Self {
        let structure = StructureBuilder::new()
            .add_field(item.id)
            .add_field(item.properties)
            .add_field(item.children)
            .build();
        Value::from(structure)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_signatures_match_the_protocol() {
        assert_eq!(IconPixmap::signature().as_str(), "(iiay)");
        assert_eq!(<Vec<IconPixmap>>::signature().as_str(), "a(iiay)");
        assert_eq!(ToolTip::signature().as_str(), "(sa(iiay)ss)");
        assert_eq!(MenuLayoutItem::signature().as_str(), "(ia{sv}av)");
    }

    #[test]
    fn layout_items_nest_as_values() {
        let child = MenuLayoutItem { id: 1, ..Default::default() };
        let mut root = MenuLayoutItem::default();
        root.children.push(child.into());
        assert_eq!(root.children.len(), 1);
    }
}
