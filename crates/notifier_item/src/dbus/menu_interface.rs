use std::collections::HashMap;

use zbus::{fdo, interface, object_server::SignalContext, zvariant::Value};

use crate::{
    dbus::MenuLayoutItem,
    menu::{Menu, MenuBinding},
    names,
};

/// The `com.canonical.dbusmenu` object exported at [`names::MENU_OBJECT`]
/// while a menu is attached to an item.
pub struct DBusMenuIface {
    menu: Menu,
}

#[interface(name = "com.canonical.dbusmenu")]
impl DBusMenuIface {
    #[zbus(property)]
    fn version(&self) -> u32 {
        3
    }

    #[zbus(property)]
    fn status(&self) -> String {
        "normal".to_owned()
    }

    #[zbus(property)]
    fn text_direction(&self) -> String {
        "ltr".to_owned()
    }

    #[zbus(out_args("revision", "layout"))]
    async fn get_layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        property_names: Vec<String>,
    ) -> fdo::Result<(u32, MenuLayoutItem)> {
        self.menu
            .layout(parent_id, recursion_depth, &property_names)
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("unknown menu entry {}", parent_id)))
    }

    #[zbus(out_args("properties"))]
    async fn get_group_properties(
        &self,
        ids: Vec<i32>,
        property_names: Vec<String>,
    ) -> Vec<(i32, HashMap<String, Value<'static>>)> {
        self.menu.group_properties(&ids, &property_names)
    }

    #[zbus(out_args("value"))]
    async fn get_property(&self, id: i32, name: String) -> fdo::Result<Value<'static>> {
        self.menu
            .property(id, &name)
            .ok_or_else(|| fdo::Error::InvalidArgs(format!("no property {:?} on menu entry {}", name, id)))
    }

    async fn event(&self, id: i32, event_id: String, _data: Value<'_>, _timestamp: u32) {
        self.menu.dispatch_event(id, &event_id);
    }

    async fn about_to_show(&self, _id: i32) -> bool {
        false
    }

    #[zbus(signal)]
    async fn layout_updated(ctxt: &SignalContext<'_>, revision: u32, parent: i32) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn items_properties_updated(
        ctxt: &SignalContext<'_>,
        updated_props: Vec<(i32, HashMap<String, Value<'static>>)>,
        removed_props: Vec<(i32, Vec<String>)>,
    ) -> zbus::Result<()>;
}

/// Owns the binding between one menu tree and the bus sub-object at
/// [`names::MENU_OBJECT`]. Created when a menu is attached to an item,
/// destroyed on detach (or when the menu itself is destroyed).
pub struct MenuExportBridge {
    conn: zbus::Connection,
    menu: Menu,
}

impl MenuExportBridge {
    pub(crate) async fn attach(conn: &zbus::Connection, menu: Menu) -> zbus::Result<Self> {
        conn.object_server().at(names::MENU_OBJECT, DBusMenuIface { menu: menu.clone() }).await?;
        menu.bind(MenuBinding::new(conn.clone(), tokio::runtime::Handle::current()));
        Ok(Self { conn: conn.clone(), menu })
    }

    pub(crate) async fn detach(self) {
        self.menu.unbind();
        if let Err(e) = self.conn.object_server().remove::<DBusMenuIface, _>(names::MENU_OBJECT).await {
            log::warn!("failed to remove menu export: {}", e);
        }
    }
}

pub(crate) async fn emit_layout_updated(conn: &zbus::Connection, revision: u32) -> zbus::Result<()> {
    let iface_ref = conn.object_server().interface::<_, DBusMenuIface>(names::MENU_OBJECT).await?;
    DBusMenuIface::layout_updated(iface_ref.signal_context(), revision, 0).await
}

pub(crate) async fn emit_items_properties_updated(
    conn: &zbus::Connection,
    id: i32,
    properties: HashMap<String, Value<'static>>,
) -> zbus::Result<()> {
    let iface_ref = conn.object_server().interface::<_, DBusMenuIface>(names::MENU_OBJECT).await?;
    DBusMenuIface::items_properties_updated(iface_ref.signal_context(), vec![(id, properties)], Vec::new())
        .await
}
