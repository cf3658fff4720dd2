//! Session-bus transport backed by zbus.
//!
//! Incoming method calls and `NameLost` signals are pumped by background
//! tasks into one event queue, so the service loop sees a single ordered
//! stream of [`BusEvent`]s.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use zbus::fdo::DBusProxy;
use zbus::message::Type as MessageType;
use zbus::zvariant::{Structure, Value};
use zbus::{Connection, Message, MessageStream};

use crate::bus::transport::{BusEvent, Transport};
use crate::ipc::{Arg, CallFrame, Reply, ReplyBody};
use crate::provider::ResultMeta;
use crate::types::{Error, Result};

/// Live session-bus connection.
#[derive(Debug)]
pub struct SessionBus {
    connection: Connection,
    events_tx: mpsc::UnboundedSender<BusEvent<Message>>,
    events: mpsc::UnboundedReceiver<BusEvent<Message>>,
    pumps: Vec<JoinHandle<()>>,
}

impl SessionBus {
    /// Connect to the session bus. Failure here is fatal for the process.
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session()
            .await
            .map_err(|e| Error::bus_connection(format!("cannot connect to session bus: {e}")))?;
        tracing::debug!(unique_name = ?connection.unique_name(), "connected to session bus");
        Ok(Self::from_connection(connection))
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: Connection) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();

        // Subscribe before returning so no call that arrives after export is missed.
        let calls = MessageStream::from(&connection);
        let pumps = vec![
            tokio::spawn(pump_method_calls(calls, events_tx.clone())),
            tokio::spawn(pump_name_lost(connection.clone(), events_tx.clone())),
        ];

        Self {
            connection,
            events_tx,
            events,
            pumps,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for SessionBus {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

#[async_trait]
impl Transport for SessionBus {
    type Target = Message;

    async fn request_name(&mut self, name: &str) -> Result<()> {
        let event = match self.connection.request_name(name).await {
            Ok(()) => BusEvent::NameAcquired(name.to_string()),
            Err(e) => {
                tracing::warn!(name, error = %e, "name request refused");
                BusEvent::NameLost(name.to_string())
            }
        };
        // The receiver lives in self, so this cannot fail.
        let _ = self.events_tx.send(event);
        Ok(())
    }

    async fn release_name(&mut self, name: &str) -> Result<()> {
        self.connection.release_name(name).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<BusEvent<Message>> {
        self.events.recv().await
    }

    async fn reply(&mut self, target: Message, reply: Reply) -> Result<()> {
        let header = target.header();
        match reply {
            Reply::Return(ReplyBody::Identifiers(ids)) => {
                self.connection.reply(&header, &ids).await?;
            }
            Reply::Return(ReplyBody::Metas(metas)) => {
                self.connection.reply(&header, &encode_metas(&metas)).await?;
            }
            Reply::Return(ReplyBody::Xml(xml)) => {
                self.connection.reply(&header, &xml).await?;
            }
            Reply::Return(ReplyBody::Void) => {
                self.connection.reply(&header, &()).await?;
            }
            Reply::Error { name, message } => {
                self.connection
                    .reply_error(&header, name.as_str(), &message)
                    .await?;
            }
        }
        Ok(())
    }
}

async fn pump_method_calls(mut stream: MessageStream, events: mpsc::UnboundedSender<BusEvent<Message>>) {
    while let Some(item) = stream.next().await {
        let message = match item {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable message");
                continue;
            }
        };
        if message.message_type() != MessageType::MethodCall {
            continue;
        }
        let frame = decode_frame(&message);
        if events
            .send(BusEvent::MethodCall {
                target: message,
                frame,
            })
            .is_err()
        {
            break;
        }
    }
    tracing::debug!("method call stream ended");
}

async fn pump_name_lost(connection: Connection, events: mpsc::UnboundedSender<BusEvent<Message>>) {
    let proxy = match DBusProxy::new(&connection).await {
        Ok(proxy) => proxy,
        Err(e) => {
            tracing::warn!(error = %e, "cannot watch for name loss");
            return;
        }
    };
    let mut lost = match proxy.receive_name_lost().await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "cannot subscribe to NameLost");
            return;
        }
    };
    while let Some(signal) = lost.next().await {
        let name = match signal.args() {
            Ok(args) => args.name().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "malformed NameLost signal");
                continue;
            }
        };
        if events.send(BusEvent::NameLost(name)).is_err() {
            break;
        }
    }
}

/// Turn a method-call message into a transport-neutral frame.
fn decode_frame(message: &Message) -> CallFrame {
    let header = message.header();
    let path = header.path().map(|p| p.to_string()).unwrap_or_default();
    let interface = header.interface().map(|i| i.to_string());
    let member = header.member().map(|m| m.to_string()).unwrap_or_default();

    let args = decode_args(message);

    CallFrame {
        path,
        interface,
        member,
        args,
    }
}

/// Positional arguments of a call body. A body that cannot be decoded
/// becomes one opaque argument carrying the body signature, so the shape
/// error names what was actually sent.
fn decode_args(message: &Message) -> Vec<Arg> {
    let signature = body_signature(message);
    if signature.is_empty() {
        return Vec::new();
    }
    match message.body().deserialize::<Structure<'_>>() {
        Ok(fields) => fields.into_fields().into_iter().map(arg_from_value).collect(),
        Err(e) => {
            tracing::debug!(%signature, error = %e, "undecodable call body");
            vec![Arg::Other(signature)]
        }
    }
}

/// Body signature without the enclosing parentheses, e.g. `sasu`.
fn body_signature(message: &Message) -> String {
    message.body().signature().to_string_no_parens()
}

/// `aa{sv}` payload for GetResultMetas: one dictionary per meta, string values.
fn encode_metas(metas: &[ResultMeta]) -> Vec<HashMap<String, Value<'static>>> {
    metas
        .iter()
        .map(|meta| {
            meta.entries()
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::from(value.to_string())))
                .collect()
        })
        .collect()
}

fn arg_from_value(value: Value<'_>) -> Arg {
    let signature = value.value_signature().to_string();
    match value {
        Value::Str(s) => Arg::Str(s.to_string()),
        Value::U32(n) => Arg::U32(n),
        Value::Array(array) if signature == "as" => match Vec::<String>::try_from(array) {
            Ok(list) => Arg::StrList(list),
            Err(_) => Arg::Other(signature),
        },
        _ => Arg::Other(signature),
    }
}
