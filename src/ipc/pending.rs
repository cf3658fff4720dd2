//! In-flight method calls and their exactly-once reply channel.

use tokio::sync::mpsc;

use crate::ipc::dispatch::Request;
use crate::ipc::frame::Reply;
use crate::ipc::method::Method;
use crate::types::{error_names, InvocationId};

/// A reply ready to go back onto the bus.
#[derive(Debug)]
pub struct Completion<T> {
    pub id: InvocationId,
    pub method: Method,
    pub target: T,
    pub reply: Reply,
}

/// One method call awaiting its reply.
///
/// `complete` consumes the invocation, so a second reply cannot be written.
/// Dropping it unanswered (a handler task that panicked, say) sends a
/// `Failed` error instead, so the caller is never left waiting.
#[derive(Debug)]
pub struct PendingInvocation<T: Send + 'static> {
    id: InvocationId,
    request: Request,
    target: Option<T>,
    completions: mpsc::UnboundedSender<Completion<T>>,
}

impl<T: Send + 'static> PendingInvocation<T> {
    pub fn new(
        request: Request,
        target: T,
        completions: mpsc::UnboundedSender<Completion<T>>,
    ) -> Self {
        Self {
            id: InvocationId::new(),
            request,
            target: Some(target),
            completions,
        }
    }

    pub fn id(&self) -> &InvocationId {
        &self.id
    }

    pub fn method(&self) -> Method {
        self.request.method()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Hand the reply to the event loop.
    pub fn complete(mut self, reply: Reply) {
        self.send(reply);
    }

    fn send(&mut self, reply: Reply) {
        let Some(target) = self.target.take() else {
            return;
        };
        let completion = Completion {
            id: self.id.clone(),
            method: self.method(),
            target,
            reply,
        };
        if self.completions.send(completion).is_err() {
            tracing::warn!(id = %self.id, method = %self.method(), "event loop gone, reply dropped");
        }
    }
}

impl<T: Send + 'static> Drop for PendingInvocation<T> {
    fn drop(&mut self) {
        if self.target.is_some() {
            tracing::error!(id = %self.id, method = %self.method(), "invocation dropped without a reply");
            self.send(Reply::error(
                error_names::FAILED,
                format!("{} was abandoned before replying", self.method()),
            ));
        }
    }
}
