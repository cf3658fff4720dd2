//! Service identity: the three fixed strings the shell uses to reach us.

use serde::{Deserialize, Serialize};
use zbus::names::{InterfaceName, WellKnownName};
use zbus::zvariant::ObjectPath;

use super::errors::{Error, Result};

/// Well-known bus name owned by the service.
pub const DEFAULT_BUS_NAME: &str = "org.gnome.SearchExample.SearchProvider";
/// Object path the provider interface is exported at.
pub const DEFAULT_OBJECT_PATH: &str = "/org/gnome/SearchExample/SearchProvider";
/// Interface the shell calls.
pub const DEFAULT_INTERFACE: &str = "org.gnome.Shell.SearchProvider2";

/// Immutable (bus name, object path, interface) triple.
///
/// Validated once at construction; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    bus_name: String,
    object_path: String,
    interface: String,
}

impl ServiceIdentity {
    pub fn new(
        bus_name: impl Into<String>,
        object_path: impl Into<String>,
        interface: impl Into<String>,
    ) -> Result<Self> {
        let bus_name = bus_name.into();
        let object_path = object_path.into();
        let interface = interface.into();

        WellKnownName::try_from(bus_name.as_str())
            .map_err(|e| Error::validation(format!("bus name {bus_name:?}: {e}")))?;
        ObjectPath::try_from(object_path.as_str())
            .map_err(|e| Error::validation(format!("object path {object_path:?}: {e}")))?;
        InterfaceName::try_from(interface.as_str())
            .map_err(|e| Error::validation(format!("interface {interface:?}: {e}")))?;

        Ok(Self {
            bus_name,
            object_path,
            interface,
        })
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            bus_name: DEFAULT_BUS_NAME.to_string(),
            object_path: DEFAULT_OBJECT_PATH.to_string(),
            interface: DEFAULT_INTERFACE.to_string(),
        }
    }
}
