//! kmodel response: one type for replies that are available immediately and
//! replies still being computed by a background task.
//!
//! A [`Response`] built from a [`RawReply`] is consumed on construction. One
//! built from a [`TaskHandle`] stays pending until [`Response::get`] receives
//! the reply; the payload is translated at most once, even when several
//! threads call `get` concurrently.

#![forbid(unsafe_code)]

mod error;
mod task;
mod translate;

use std::sync::Arc;
use std::time::{Duration, Instant};

use kmodel_core::TypedNode;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::debug;

pub use error::{ResponseError, ResponseResult};
pub use task::{pending, spawn_blocking_call, Completion, Headers, PendingReply, RawReply, ReplySender, TaskError, TaskHandle};
pub use translate::{RegistryTranslator, Translate};

/// Reply payload after translation.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Typed(TypedNode),
    Raw(Value),
}

impl Payload {
    pub fn as_typed(&self) -> Option<&TypedNode> {
        match self { Payload::Typed(n) => Some(n), Payload::Raw(_) => None }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self { Payload::Raw(v) => Some(v), Payload::Typed(_) => None }
    }
}

/// Stored outcome of a consumed response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub payload: Option<Payload>,
    pub code: u16,
    pub headers: Headers,
}

/// Constructor argument: a finished reply or a handle to a running call.
pub enum ReplySource {
    Immediate(RawReply),
    Deferred(Box<dyn TaskHandle>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    ImmediateConsumed,
    DeferredPending,
    DeferredReady,
    DeferredConsumed,
}

pub struct Response {
    task: Option<Box<dyn TaskHandle>>,
    typed_codes: FxHashSet<u16>,
    translator: Arc<dyn Translate>,
    translate_keys: bool,
    reply: OnceCell<Reply>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("state", &self.state())
            .field("typed_codes", &self.typed_codes)
            .field("translate_keys", &self.translate_keys)
            .field("reply", &self.reply.get())
            .finish()
    }
}

/// Collects per-call settings before a [`Response`] is created.
pub struct ResponseBuilder {
    typed_codes: FxHashSet<u16>,
    translator: Arc<dyn Translate>,
    translate_keys: bool,
}

impl ResponseBuilder {
    /// Status codes whose payload is a typed document.
    pub fn typed_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.typed_codes = codes.into_iter().collect();
        self
    }

    /// Match payload keys in wire convention (the default) or verbatim.
    pub fn translate_keys(mut self, on: bool) -> Self {
        self.translate_keys = on;
        self
    }

    pub fn build(self, source: ReplySource) -> ResponseResult<Response> {
        let response = Response {
            task: None,
            typed_codes: self.typed_codes,
            translator: self.translator,
            translate_keys: self.translate_keys,
            reply: OnceCell::new(),
        };
        match source {
            ReplySource::Immediate(raw) => {
                let reply = response.process(raw)?;
                // fresh cell, cannot already be set
                let _ = response.reply.set(reply);
                Ok(response)
            }
            ReplySource::Deferred(task) => Ok(Response { task: Some(task), ..response }),
        }
    }

    pub fn immediate(self, raw: RawReply) -> ResponseResult<Response> { self.build(ReplySource::Immediate(raw)) }

    pub fn deferred(self, task: impl TaskHandle + 'static) -> Response {
        Response {
            task: Some(Box::new(task)),
            typed_codes: self.typed_codes,
            translator: self.translator,
            translate_keys: self.translate_keys,
            reply: OnceCell::new(),
        }
    }
}

impl Response {
    pub fn builder(translator: Arc<dyn Translate>) -> ResponseBuilder {
        ResponseBuilder { typed_codes: FxHashSet::default(), translator, translate_keys: true }
    }

    pub fn new(
        source: ReplySource,
        typed_codes: impl IntoIterator<Item = u16>,
        translator: Arc<dyn Translate>,
    ) -> ResponseResult<Self> {
        Self::builder(translator).typed_codes(typed_codes).build(source)
    }

    pub fn immediate(
        raw: RawReply,
        typed_codes: impl IntoIterator<Item = u16>,
        translator: Arc<dyn Translate>,
    ) -> ResponseResult<Self> {
        Self::builder(translator).typed_codes(typed_codes).immediate(raw)
    }

    pub fn deferred(
        task: impl TaskHandle + 'static,
        typed_codes: impl IntoIterator<Item = u16>,
        translator: Arc<dyn Translate>,
    ) -> Self {
        Self::builder(translator).typed_codes(typed_codes).deferred(task)
    }

    pub fn state(&self) -> ResponseState {
        match &self.task {
            None => ResponseState::ImmediateConsumed,
            Some(_) if self.reply.get().is_some() => ResponseState::DeferredConsumed,
            Some(t) if t.ready() => ResponseState::DeferredReady,
            Some(_) => ResponseState::DeferredPending,
        }
    }

    pub fn ready(&self) -> bool {
        match &self.task {
            None => true,
            Some(t) => t.ready(),
        }
    }

    /// Whether the call succeeded. Immediate responses always did; a deferred
    /// one must have finished first.
    pub fn successful(&self) -> ResponseResult<bool> {
        match &self.task {
            None => Ok(true),
            Some(t) => t.successful().ok_or(ResponseError::NotReady),
        }
    }

    pub fn wait(&self, timeout: Option<Duration>) {
        if let Some(t) = &self.task {
            t.wait(timeout);
        }
    }

    /// The stored reply, receiving and translating it first if the response
    /// is deferred and not yet consumed.
    ///
    /// Each caller waits on the task for at most its own `timeout`, and a
    /// timeout leaves the response pending so `get` may be retried. Only a
    /// finished task enters the translation step, which runs once.
    pub fn get(&self, timeout: Option<Duration>) -> ResponseResult<&Reply> {
        if let Some(reply) = self.reply.get() {
            return Ok(reply);
        }
        let task = self.task.as_ref().ok_or(ResponseError::NotReady)?;
        let started = Instant::now();
        task.wait(timeout);
        histogram!("response_get_wait_ms", started.elapsed().as_secs_f64() * 1000.0);
        if !task.ready() {
            return Err(ResponseError::TimeoutExceeded(timeout));
        }
        self.reply.get_or_try_init(|| match task.get(Some(Duration::ZERO))? {
            Completion::Reply(raw) => self.process(raw),
            Completion::Other(v) => Err(ResponseError::UnexpectedReplyShape(v.to_string())),
        })
    }

    pub fn payload(&self) -> Option<&Payload> { self.reply.get()?.payload.as_ref() }
    pub fn code(&self) -> Option<u16> { self.reply.get().map(|r| r.code) }
    pub fn headers(&self) -> Option<&Headers> { self.reply.get().map(|r| &r.headers) }

    /// Typed document of a consumed reply, if its code was a typed code.
    pub fn typed(&self) -> Option<&TypedNode> { self.payload()?.as_typed() }

    fn process(&self, raw: RawReply) -> ResponseResult<Reply> {
        let RawReply { payload, code, headers } = raw;
        let payload = match payload {
            None | Some(Value::Null) => None,
            Some(v) if self.typed_codes.contains(&code) => {
                let node = self.translator.translate(&v, self.translate_keys)?;
                counter!("response_translations_total", 1u64);
                debug!(code, type_name = %node.type_name(), "translated reply payload");
                Some(Payload::Typed(node))
            }
            Some(v) => Some(Payload::Raw(v)),
        };
        Ok(Reply { payload, code, headers })
    }
}
