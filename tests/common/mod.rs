//! Shared fixtures: an in-memory bus and a small document-search provider.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use search_provider::bus::{BusEvent, Transport};
use search_provider::ipc::{Arg, CallFrame, Reply};
use search_provider::provider::{HandlerResult, ResultMeta, SearchProvider};
use search_provider::types::{ResultId, SearchTerms, ServiceIdentity, DEFAULT_INTERFACE};
use search_provider::{Config, SearchProviderService};
use tokio::sync::{mpsc, Notify};

/// Name operations the service performed against the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOp {
    Request(String),
    Release(String),
}

/// Transport half handed to the service. Call targets are plain serials.
#[derive(Debug)]
pub struct MemoryTransport {
    grant_name: bool,
    queued: VecDeque<BusEvent<u32>>,
    events: mpsc::UnboundedReceiver<BusEvent<u32>>,
    replies: mpsc::UnboundedSender<(u32, Reply)>,
    names: Arc<Mutex<Vec<NameOp>>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    type Target = u32;

    async fn request_name(&mut self, name: &str) -> search_provider::Result<()> {
        self.names.lock().unwrap().push(NameOp::Request(name.to_string()));
        let event = if self.grant_name {
            BusEvent::NameAcquired(name.to_string())
        } else {
            BusEvent::NameLost(name.to_string())
        };
        self.queued.push_back(event);
        Ok(())
    }

    async fn release_name(&mut self, name: &str) -> search_provider::Result<()> {
        self.names.lock().unwrap().push(NameOp::Release(name.to_string()));
        Ok(())
    }

    async fn next_event(&mut self) -> Option<BusEvent<u32>> {
        if let Some(event) = self.queued.pop_front() {
            return Some(event);
        }
        self.events.recv().await
    }

    async fn reply(&mut self, target: u32, reply: Reply) -> search_provider::Result<()> {
        // The test may have stopped listening; that is not a service error.
        let _ = self.replies.send((target, reply));
        Ok(())
    }
}

/// Test-side half: injects calls and collects replies.
#[derive(Debug)]
pub struct MemoryBus {
    events: mpsc::UnboundedSender<BusEvent<u32>>,
    replies: mpsc::UnboundedReceiver<(u32, Reply)>,
    names: Arc<Mutex<Vec<NameOp>>>,
    next_serial: u32,
    identity: ServiceIdentity,
}

impl MemoryBus {
    /// Send a provider-interface call; returns its serial.
    pub fn call(&mut self, member: &str, args: Vec<Arg>) -> u32 {
        let frame = CallFrame::new(
            self.identity.object_path(),
            Some(DEFAULT_INTERFACE),
            member,
            args,
        );
        self.send_frame(frame)
    }

    pub fn send_frame(&mut self, frame: CallFrame) -> u32 {
        self.next_serial += 1;
        let serial = self.next_serial;
        self.events
            .send(BusEvent::MethodCall {
                target: serial,
                frame,
            })
            .expect("service dropped its transport");
        serial
    }

    /// Call and wait for the reply addressed to that call.
    pub async fn request(&mut self, member: &str, args: Vec<Arg>) -> Reply {
        let serial = self.call(member, args);
        let (target, reply) = self.next_reply().await;
        assert_eq!(target, serial, "reply addressed to the wrong call");
        reply
    }

    pub async fn next_reply(&mut self) -> (u32, Reply) {
        self.replies.recv().await.expect("reply channel closed")
    }

    /// Replies that arrived but were not consumed.
    pub fn drain_replies(&mut self) -> Vec<(u32, Reply)> {
        let mut out = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            out.push(reply);
        }
        out
    }

    /// Simulate another owner taking the well-known name.
    pub fn lose_name(&self) {
        self.events
            .send(BusEvent::NameLost(self.identity.bus_name().to_string()))
            .expect("service dropped its transport");
    }

    pub fn name_ops(&self) -> Vec<NameOp> {
        self.names.lock().unwrap().clone()
    }

    /// Close the connection: the service sees end of stream.
    pub fn disconnect(self) -> (mpsc::UnboundedReceiver<(u32, Reply)>, Arc<Mutex<Vec<NameOp>>>) {
        (self.replies, self.names)
    }
}

pub fn memory_bus(grant_name: bool) -> (MemoryTransport, MemoryBus) {
    let (events_tx, events) = mpsc::unbounded_channel();
    let (replies_tx, replies) = mpsc::unbounded_channel();
    let names = Arc::new(Mutex::new(Vec::new()));
    let transport = MemoryTransport {
        grant_name,
        queued: VecDeque::new(),
        events,
        replies: replies_tx,
        names: names.clone(),
    };
    let bus = MemoryBus {
        events: events_tx,
        replies,
        names,
        next_serial: 0,
        identity: ServiceIdentity::default(),
    };
    (transport, bus)
}

/// Build a service over an in-memory bus.
pub fn service_with(
    provider: Arc<dyn SearchProvider>,
    config: &Config,
    grant_name: bool,
) -> (SearchProviderService<MemoryTransport>, MemoryBus) {
    let (transport, bus) = memory_bus(grant_name);
    let service = SearchProviderService::new(transport, ServiceIdentity::default(), provider, config);
    (service, bus)
}

pub fn strs(items: &[&str]) -> Arg {
    Arg::StrList(items.iter().map(|s| s.to_string()).collect())
}

pub fn s(value: &str) -> Arg {
    Arg::Str(value.to_string())
}

/// Title-matching document search over a fixed catalog.
///
/// A term of `slow` parks the handler until [`DocsProvider::release_slow`];
/// activating `boom` panics inside the handler.
#[derive(Debug, Default)]
pub struct DocsProvider {
    calls: Mutex<Vec<String>>,
    gate: Notify,
}

const CATALOG: &[(&str, &str)] = &[
    ("doc-1", "Alpha Beta notes"),
    ("doc-2", "Alpha report"),
    ("doc-3", "Gamma slides"),
];

impl DocsProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn release_slow(&self) {
        self.gate.notify_one();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn title(id: &str) -> Option<&'static str> {
        CATALOG.iter().find(|(doc, _)| *doc == id).map(|(_, title)| *title)
    }

    fn matches(title: &str, terms: &[String]) -> bool {
        let title = title.to_lowercase();
        terms.iter().all(|term| title.contains(&term.to_lowercase()))
    }
}

#[async_trait]
impl SearchProvider for DocsProvider {
    async fn initial_result_set(&self, terms: SearchTerms) -> HandlerResult<Vec<ResultId>> {
        self.record(format!("initial {}", terms.join(" ")));
        if terms.iter().any(|t| t == "slow") {
            self.gate.notified().await;
            return Ok(Vec::new());
        }
        Ok(CATALOG
            .iter()
            .filter(|(_, title)| Self::matches(title, &terms))
            .map(|(id, _)| id.to_string())
            .collect())
    }

    async fn subsearch_result_set(
        &self,
        previous_results: Vec<ResultId>,
        terms: SearchTerms,
    ) -> HandlerResult<Vec<ResultId>> {
        self.record(format!("subsearch {}", terms.join(" ")));
        Ok(previous_results
            .into_iter()
            .filter(|id| Self::title(id).is_some_and(|title| Self::matches(title, &terms)))
            .collect())
    }

    async fn result_metas(&self, results: Vec<ResultId>) -> HandlerResult<Vec<ResultMeta>> {
        self.record(format!("metas {}", results.join(",")));
        Ok(results
            .into_iter()
            .map(|id| match Self::title(&id) {
                Some(title) => ResultMeta::new(id, title).with_icon("text-x-generic"),
                None => {
                    let name = id.clone();
                    ResultMeta::new(id, name)
                }
            })
            .collect())
    }

    async fn launch_search(&self, terms: SearchTerms, timestamp: u32) -> HandlerResult<()> {
        self.record(format!("launch [{}] {timestamp}", terms.join(" ")));
        Ok(())
    }

    async fn activate_result(
        &self,
        result: ResultId,
        terms: SearchTerms,
        timestamp: u32,
    ) -> HandlerResult<()> {
        if result == "boom" {
            panic!("activation handler crashed");
        }
        self.record(format!("activate {result} [{}] {timestamp}", terms.join(" ")));
        Ok(())
    }
}
