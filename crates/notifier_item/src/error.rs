use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dbus connection error")]
    Dbus(#[from] zbus::Error),
    #[error("Object path {path:?} was not understood")]
    InvalidObjectPath {
        path: String,
        #[source]
        source: zbus::zvariant::Error,
    },
    #[error("loading icon from file {path:?}")]
    LoadIconFromFile {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
