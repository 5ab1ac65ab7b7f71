use futures::StreamExt;

use crate::{names, proxy::StatusNotifierWatcherProxy};

/// Register with the watcher, then keep the registration alive for as long
/// as the connection exists. A watcher that restarts has lost every prior
/// registration, so every new owner of the watcher name gets a fresh
/// `RegisterStatusNotifierItem`.
pub(crate) async fn keep_registered(conn: zbus::Connection) {
    if let Err(e) = register_to_host(&conn).await {
        log::warn!("failed to register with the status notifier watcher: {}", e);
    }
    if let Err(e) = watch_host_ownership(&conn).await {
        log::warn!("lost track of the status notifier watcher: {}", e);
    }
}

async fn register_to_host(conn: &zbus::Connection) -> zbus::Result<()> {
    let watcher = StatusNotifierWatcherProxy::new(conn).await?;
    let service = match conn.unique_name() {
        Some(name) => name.to_string(),
        None => return Err(zbus::Error::Failure("connection has no unique name".into())),
    };
    watcher.register_status_notifier_item(&service).await
}

async fn watch_host_ownership(conn: &zbus::Connection) -> zbus::Result<()> {
    let dbus = zbus::fdo::DBusProxy::new(conn).await?;
    let mut owner_changes = dbus.receive_name_owner_changed_with_args(&[(0, names::WATCHER_BUS)]).await?;

    while let Some(sig) = owner_changes.next().await {
        let args = sig.args()?;
        if args.new_owner().is_some() {
            log::debug!("status notifier watcher changed owner, re-registering");
            if let Err(e) = register_to_host(conn).await {
                log::warn!("failed to re-register with the status notifier watcher: {}", e);
            }
        }
    }

    Ok(())
}
