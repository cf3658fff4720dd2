//! Object exporter: binds the provider interface to its object path.
//!
//! At most one export is live at a time. The exporter does not interpret
//! provider calls itself; it only decides where an incoming frame goes.

use std::fmt::Write as _;

use crate::ipc::{CallFrame, Method};
use crate::types::{Error, Result, ServiceIdentity};

const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";
const PEER: &str = "org.freedesktop.DBus.Peer";

/// Token for "interface bound at path". Not clonable: the holder gives it
/// back to [`ObjectExporter::unbind`] exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ExportHandle {
    serial: u64,
    path: String,
    interface: String,
}

impl ExportHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// Where an incoming frame should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// One of the five provider methods.
    Provider(Method),
    /// `org.freedesktop.DBus.Introspectable.Introspect`
    Introspect,
    /// `org.freedesktop.DBus.Peer.Ping`
    Ping,
}

/// Owns the single live export for a [`ServiceIdentity`].
#[derive(Debug)]
pub struct ObjectExporter {
    identity: ServiceIdentity,
    live: Option<u64>,
    next_serial: u64,
}

impl ObjectExporter {
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            live: None,
            next_serial: 1,
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Number of live exports: 0 or 1.
    pub fn export_count(&self) -> usize {
        usize::from(self.live.is_some())
    }

    pub fn is_exported(&self) -> bool {
        self.live.is_some()
    }

    /// Export the interface with its method table.
    pub fn bind(&mut self) -> Result<ExportHandle> {
        if self.live.is_some() {
            return Err(Error::already_bound(format!(
                "{} is already exported at {}",
                self.identity.interface(),
                self.identity.object_path()
            )));
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        self.live = Some(serial);

        tracing::info!(
            path = %self.identity.object_path(),
            interface = %self.identity.interface(),
            methods = Method::ALL.len(),
            "interface exported"
        );

        Ok(ExportHandle {
            serial,
            path: self.identity.object_path().to_string(),
            interface: self.identity.interface().to_string(),
        })
    }

    /// Withdraw the export. A handle that is not the live one is a
    /// programming error: asserts in debug builds, ignored in release.
    pub fn unbind(&mut self, handle: ExportHandle) {
        if self.live != Some(handle.serial) {
            debug_assert!(false, "unbind called with stale export handle {handle:?}");
            tracing::error!(serial = handle.serial, "unbind called with stale export handle");
            return;
        }
        self.live = None;
        tracing::info!(path = %handle.path, interface = %handle.interface, "interface unexported");
    }

    /// Decide where a frame goes, or which error it gets.
    pub fn route(&self, frame: &CallFrame) -> Result<Route> {
        if frame.path != self.identity.object_path() || self.live.is_none() {
            return Err(Error::unknown_object(format!(
                "no object at path {}",
                frame.path
            )));
        }

        match frame.interface.as_deref() {
            Some(INTROSPECTABLE) if frame.member == "Introspect" => Ok(Route::Introspect),
            Some(PEER) if frame.member == "Ping" => Ok(Route::Ping),
            Some(INTROSPECTABLE) | Some(PEER) => Err(self.unknown_method(frame)),
            Some(interface) if interface != self.identity.interface() => Err(
                Error::unknown_interface(format!("{} is not implemented at {}", interface, frame.path)),
            ),
            _ => Method::from_member(&frame.member)
                .map(Route::Provider)
                .ok_or_else(|| self.unknown_method(frame)),
        }
    }

    fn unknown_method(&self, frame: &CallFrame) -> Error {
        Error::unknown_method(format!(
            "no method {} on {}",
            frame.member,
            frame.interface.as_deref().unwrap_or(self.identity.interface())
        ))
    }

    /// Introspection XML for the exported object.
    pub fn introspection_xml(&self) -> String {
        let mut xml = String::from(
            "<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\"\n \
             \"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n<node>\n",
        );
        let _ = writeln!(xml, "  <interface name=\"{}\">", self.identity.interface());
        for method in Method::ALL {
            let _ = writeln!(xml, "    <method name=\"{}\">", method.as_str());
            for (name, sig) in method.in_args() {
                let _ = writeln!(
                    xml,
                    "      <arg type=\"{}\" name=\"{}\" direction=\"in\"/>",
                    sig, name
                );
            }
            for (name, sig) in method.out_args() {
                let _ = writeln!(
                    xml,
                    "      <arg type=\"{}\" name=\"{}\" direction=\"out\"/>",
                    sig, name
                );
            }
            xml.push_str("    </method>\n");
        }
        xml.push_str("  </interface>\n");
        let _ = writeln!(xml, "  <interface name=\"{INTROSPECTABLE}\">");
        xml.push_str(
            "    <method name=\"Introspect\">\n      <arg type=\"s\" name=\"xml_data\" direction=\"out\"/>\n    </method>\n",
        );
        xml.push_str("  </interface>\n");
        let _ = writeln!(xml, "  <interface name=\"{PEER}\">");
        xml.push_str("    <method name=\"Ping\"/>\n");
        xml.push_str("  </interface>\n</node>\n");
        xml
    }
}
