//! Search provider service - the single-threaded event loop.
//!
//! The service owns every component and drives them from one `select!` loop:
//!
//! ```text
//!                    ┌──────────────────────────────────────┐
//!   bus events   →   │        SearchProviderService         │
//!   replies      →   │  ┌─────────┐ ┌──────────┐ ┌────────┐ │
//!   hold/release →   │  │  Name   │ │  Object  │ │Lifecyc-│ │
//!   idle timer   →   │  │  Lease  │ │ Exporter │ │le Ctrl │ │
//!                    │  └─────────┘ └──────────┘ └────────┘ │
//!                    └──────────────────────────────────────┘
//! ```
//!
//! Components never touch each other; the loop turns each event into calls
//! on the component that owns the affected state.

pub mod lifecycle;

pub use lifecycle::{LifecycleController, LifecycleState};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::bus::{BusEvent, ExportHandle, NameLease, ObjectExporter, Route, Transport};
use crate::ipc::{decode, CallFrame, Completion, Dispatcher, PendingInvocation, Reply, ReplyBody};
use crate::provider::SearchProvider;
use crate::types::{Config, Result, ServiceIdentity};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Inactivity interval elapsed with nothing holding the service.
    IdleTimeout,
    /// Shutdown requested through the [`ServiceHandle`].
    Shutdown,
    /// The bus connection went away.
    Disconnected,
}

#[derive(Debug)]
enum Control {
    Hold,
    Release,
}

/// Cloneable handle for hold/release and shutdown from outside the loop.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    control: mpsc::UnboundedSender<Control>,
    cancel: CancellationToken,
}

impl ServiceHandle {
    /// Keep the service alive until a matching [`release`](Self::release).
    pub fn hold(&self) {
        let _ = self.control.send(Control::Hold);
    }

    /// Drop one hold; the inactivity timer restarts from now. The persistent
    /// hold is never dropped.
    pub fn release(&self) {
        let _ = self.control.send(Control::Release);
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Search provider service wiring the bus components to the dispatcher.
#[derive(Debug)]
pub struct SearchProviderService<T: Transport> {
    transport: T,
    lease: NameLease,
    exporter: ObjectExporter,
    export: Option<ExportHandle>,
    lifecycle: LifecycleController,
    dispatcher: Dispatcher,
    persist: bool,
    completions_tx: mpsc::UnboundedSender<Completion<T::Target>>,
    completions: mpsc::UnboundedReceiver<Completion<T::Target>>,
    control_tx: mpsc::UnboundedSender<Control>,
    control: mpsc::UnboundedReceiver<Control>,
    cancel: CancellationToken,
}

impl<T: Transport> SearchProviderService<T> {
    pub fn new(
        transport: T,
        identity: ServiceIdentity,
        provider: Arc<dyn SearchProvider>,
        config: &Config,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (control_tx, control) = mpsc::unbounded_channel();
        Self {
            transport,
            lease: NameLease::new(identity.bus_name()),
            exporter: ObjectExporter::new(identity),
            export: None,
            lifecycle: LifecycleController::new(config.service.inactivity_timeout),
            dispatcher: Dispatcher::new(provider),
            persist: config.service.persist,
            completions_tx,
            completions,
            control_tx,
            control,
            cancel: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            control: self.control_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run until idle timeout, shutdown, or disconnect; then tear down.
    pub async fn run(mut self) -> Result<ExitReason> {
        let now = Instant::now();
        self.lifecycle.start(now)?;
        if self.persist {
            tracing::info!("persistent mode: holding service indefinitely");
            self.lifecycle.pin(now);
        }

        self.lease.acquire(&mut self.transport).await?;

        let outcome = loop {
            let deadline = self.lifecycle.deadline();
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("shutdown requested");
                    break Ok(ExitReason::Shutdown);
                }
                event = self.transport.next_event() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_event(event).await {
                            tracing::error!(error = %e, "event handling failed");
                            break Err(e);
                        }
                    }
                    None => {
                        tracing::warn!("bus connection closed");
                        break Ok(ExitReason::Disconnected);
                    }
                },
                Some(completion) = self.completions.recv() => {
                    self.finish(completion).await;
                }
                Some(control) = self.control.recv() => {
                    self.handle_control(control);
                }
                _ = sleep_until(deadline) => {
                    if self.lifecycle.check_expiry(Instant::now()) {
                        break Ok(ExitReason::IdleTimeout);
                    }
                }
            }
        };

        self.teardown(outcome).await
    }

    async fn handle_event(&mut self, event: BusEvent<T::Target>) -> Result<()> {
        match event {
            BusEvent::NameAcquired(name) => {
                if self.lease.on_acquired(&name) {
                    // AlreadyBound here means the lease invariant broke; stop the loop.
                    self.export = Some(self.exporter.bind()?);
                }
            }
            BusEvent::NameLost(name) => {
                if self.lease.on_lost(&name) {
                    if let Some(handle) = self.export.take() {
                        self.exporter.unbind(handle);
                    }
                }
            }
            BusEvent::MethodCall { target, frame } => self.handle_call(target, frame).await,
        }
        Ok(())
    }

    async fn handle_call(&mut self, target: T::Target, frame: CallFrame) {
        let method = match self.exporter.route(&frame) {
            Ok(Route::Provider(method)) => method,
            Ok(Route::Introspect) => {
                let xml = self.exporter.introspection_xml();
                self.send_reply(target, Reply::Return(ReplyBody::Xml(xml))).await;
                return;
            }
            Ok(Route::Ping) => {
                self.send_reply(target, Reply::Return(ReplyBody::Void)).await;
                return;
            }
            Err(e) => {
                tracing::debug!(path = %frame.path, member = %frame.member, error = %e, "call rejected");
                self.send_reply(target, e.into()).await;
                return;
            }
        };

        // Shape errors are answered here and never count as activity.
        let request = match decode(method, frame.args) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%method, error = %e, "malformed call");
                self.send_reply(target, e.into()).await;
                return;
            }
        };

        let pending = PendingInvocation::new(request, target, self.completions_tx.clone());
        tracing::debug!(id = %pending.id(), %method, "invocation started");
        self.lifecycle.invocation_started(Instant::now());

        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let reply = dispatcher.dispatch(pending.request()).await;
            pending.complete(reply);
        });
    }

    fn handle_control(&mut self, control: Control) {
        let now = Instant::now();
        match control {
            Control::Hold => self.lifecycle.hold(now),
            Control::Release => self.lifecycle.release(now),
        }
        tracing::debug!(hold_count = self.lifecycle.hold_count(), "hold count changed");
    }

    async fn finish(&mut self, completion: Completion<T::Target>) {
        tracing::debug!(id = %completion.id, method = %completion.method, error = completion.reply.is_error(), "invocation finished");
        self.lifecycle.invocation_finished(Instant::now());
        self.send_reply(completion.target, completion.reply).await;
    }

    async fn send_reply(&mut self, target: T::Target, reply: Reply) {
        if let Err(e) = self.transport.reply(target, reply).await {
            tracing::warn!(error = %e, "failed to send reply");
        }
    }

    /// Drain in-flight invocations, unexport, then release the name. Runs on
    /// every exit path, including a failed event; `outcome` is passed through.
    async fn teardown(mut self, outcome: Result<ExitReason>) -> Result<ExitReason> {
        if let Err(e) = self.lifecycle.terminate() {
            tracing::warn!(error = %e, "lifecycle already terminating");
        }
        tracing::info!(?outcome, in_flight = self.lifecycle.in_flight(), "terminating");

        while self.lifecycle.in_flight() > 0 {
            match self.completions.recv().await {
                Some(completion) => self.finish(completion).await,
                None => break,
            }
        }

        if let Some(handle) = self.export.take() {
            self.exporter.unbind(handle);
        }
        if let Err(e) = self.lease.release(&mut self.transport).await {
            tracing::warn!(error = %e, "failed to release name");
        }

        outcome
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
