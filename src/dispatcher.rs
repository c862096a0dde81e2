//! JSON-RPC method registry and request dispatch.
//!
//! Wire method names follow the `namespace_method` convention: the part
//! before the first `_` selects a registered [`Namespace`], the rest
//! selects a method within it (lower-case first letter, e.g.
//! `eth_blockNumber`). Registration is a typed builder: each method is a
//! closure over the service object whose parameter tuple is decoded
//! positionally from the request's `params` array, so signature mismatches
//! are compile errors rather than registration-time surprises.
//!
//! The dispatcher is assembled once at start-up and read-only afterwards;
//! request handling takes no locks.

use crate::{
    error::ApiError,
    filter::{FilterManager, WsConn},
};
use bellows_core::eth::{subscription::SubscriptionKind, LogFilter};
use bellows_rpc::{
    error::ErrorObject,
    request::{Id, Request},
    response::Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error};

/// Positional decoding of a JSON-RPC `params` array into a typed value.
///
/// Implemented for `()` and tuples of `Deserialize` types up to three
/// elements. Missing trailing positions decode from `null`, so a trailing
/// `Option<T>` parameter makes the final argument optional; any surplus
/// positional argument is an error.
pub trait FromParams: Sized {
    fn from_params(params: Vec<Value>) -> Result<Self, ParamsError>;
}

/// The `params` array did not fit the handler's parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamsError;

impl FromParams for () {
    fn from_params(params: Vec<Value>) -> Result<Self, ParamsError> {
        if params.is_empty() {
            Ok(())
        } else {
            Err(ParamsError)
        }
    }
}

macro_rules! impl_from_params {
    ($len:expr => $($ty:ident),+) => {
        impl<$($ty: DeserializeOwned),+> FromParams for ($($ty,)+) {
            fn from_params(params: Vec<Value>) -> Result<Self, ParamsError> {
                if params.len() > $len {
                    return Err(ParamsError);
                }
                let mut slots = params.into_iter();
                Ok(($(
                    serde_json::from_value::<$ty>(slots.next().unwrap_or(Value::Null))
                        .map_err(|_| ParamsError)?,
                )+))
            }
        }
    };
}

impl_from_params!(1 => A);
impl_from_params!(2 => A, B);
impl_from_params!(3 => A, B, C);

/// A failed request: the error to report plus the id of the request that
/// caused it, echoed in the error envelope. The id is `Null` only when
/// the envelope itself could not be parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchError {
    pub id: Id,
    pub error: ErrorObject,
}

impl DispatchError {
    /// The error envelope to write back to the peer.
    pub fn into_response(self) -> Response {
        Response::error(self.id, self.error)
    }
}

/// Failure modes of a single method invocation.
enum CallError {
    InvalidParams,
    Failed(ApiError),
}

type BoxedMethod<S> = Box<dyn Fn(&S, Vec<Value>) -> Result<Value, CallError> + Send + Sync>;

/// A set of methods sharing one service object, registered under a common
/// namespace prefix.
pub struct Namespace<S> {
    service: Arc<S>,
    methods: HashMap<String, BoxedMethod<S>>,
}

impl<S: Send + Sync + 'static> Namespace<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service, methods: HashMap::new() }
    }

    /// Registers `handler` under `name`, the wire name without the
    /// namespace prefix.
    pub fn method<P, R, F>(mut self, name: &str, handler: F) -> Self
    where
        P: FromParams,
        R: Serialize,
        F: Fn(&S, P) -> Result<R, ApiError> + Send + Sync + 'static,
    {
        let shim = move |service: &S, params: Vec<Value>| {
            let params = P::from_params(params).map_err(|_| CallError::InvalidParams)?;
            let result = handler(service, params).map_err(CallError::Failed)?;
            serde_json::to_value(result).map_err(|err| CallError::Failed(err.into()))
        };
        self.methods.insert(name.to_string(), Box::new(shim));
        self
    }
}

/// Type-erased namespace entry held by the dispatcher.
trait Service: Send + Sync {
    fn call(&self, method: &str, params: Vec<Value>) -> Option<Result<Value, CallError>>;
}

impl<S: Send + Sync + 'static> Service for Namespace<S> {
    fn call(&self, method: &str, params: Vec<Value>) -> Option<Result<Value, CallError>> {
        let handler = self.methods.get(method)?;
        Some(handler(&self.service, params))
    }
}

/// Routes serialized JSON-RPC requests to registered namespace methods.
#[derive(Default)]
pub struct Dispatcher {
    services: HashMap<String, Box<dyn Service>>,
    filters: Option<Arc<FilterManager>>,
}

impl Dispatcher {
    /// Attaches the filter manager that backs `eth_subscribe` /
    /// `eth_unsubscribe` on websocket connections.
    pub fn with_filter_manager(mut self, filters: Arc<FilterManager>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Registers every method of `namespace` under `name`.
    ///
    /// Panics when `name` is empty or already registered; both are
    /// programming errors, not runtime conditions.
    pub fn register<S: Send + Sync + 'static>(&mut self, name: &str, namespace: Namespace<S>) {
        if name.is_empty() {
            panic!("rpc: namespace name cannot be empty");
        }
        if self.services.insert(name.to_string(), Box::new(namespace)).is_some() {
            panic!("rpc: namespace {name:?} registered twice");
        }
    }

    /// Handles a single serialized request, returning the serialized
    /// response. Failures come back as the error object plus the request
    /// id the transport must echo in the error envelope.
    pub fn handle(&self, body: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let req: Request = serde_json::from_slice(body).map_err(|_| DispatchError {
            id: Id::Null,
            error: ErrorObject::invalid_request(),
        })?;
        self.handle_request(req)
    }

    /// Like [`handle`](Self::handle) for requests arriving over a
    /// websocket. `eth_subscribe` and `eth_unsubscribe` are intercepted
    /// here because they need the connection as a notification writer.
    pub fn handle_ws(&self, body: &[u8], conn: &Arc<dyn WsConn>) -> Result<Vec<u8>, DispatchError> {
        let req: Request = serde_json::from_slice(body).map_err(|_| DispatchError {
            id: Id::Null,
            error: ErrorObject::invalid_request(),
        })?;
        match req.method.as_str() {
            "eth_subscribe" => self.handle_subscribe(req, conn),
            "eth_unsubscribe" => self.handle_unsubscribe(req),
            _ => self.handle_request(req),
        }
    }

    fn handle_request(&self, req: Request) -> Result<Vec<u8>, DispatchError> {
        debug!(target: "rpc", method = %req.method, "handling request");

        let (service, method) = match req.method.split_once('_') {
            Some((namespace, method)) => match self.services.get(namespace) {
                Some(service) => (service, method),
                None => return Err(fail(&req, ErrorObject::method_not_found(&req.method))),
            },
            None => return Err(fail(&req, ErrorObject::method_not_found(&req.method))),
        };

        let params = decode_params(&req).map_err(|err| fail(&req, err))?;
        let outcome = match service.call(method, params) {
            Some(outcome) => outcome,
            None => return Err(fail(&req, ErrorObject::method_not_found(&req.method))),
        };

        let result = match outcome {
            Ok(value) => value,
            Err(CallError::InvalidParams) => {
                return Err(fail(&req, ErrorObject::invalid_params(&req.method)))
            }
            Err(CallError::Failed(err)) => {
                error!(target: "rpc", method = %req.method, %err, "failed to dispatch");
                return Err(fail(&req, ErrorObject::internal_error()));
            }
        };
        respond(req.id, result)
    }

    fn handle_subscribe(
        &self,
        req: Request,
        conn: &Arc<dyn WsConn>,
    ) -> Result<Vec<u8>, DispatchError> {
        let Some(filters) = &self.filters else {
            return Err(fail(&req, ErrorObject::method_not_found(&req.method)));
        };
        let params = decode_params(&req).map_err(|err| fail(&req, err))?;
        let (kind, filter): (SubscriptionKind, Option<LogFilter>) = FromParams::from_params(params)
            .map_err(|_| fail(&req, ErrorObject::invalid_params(&req.method)))?;

        let id = match kind {
            SubscriptionKind::NewHeads => filters.new_block_filter(Some(conn.clone())),
            SubscriptionKind::Logs => {
                filters.new_log_filter(filter.unwrap_or_default(), Some(conn.clone()))
            }
            SubscriptionKind::NewPendingTransactions => {
                filters.new_pending_tx_filter(Some(conn.clone()))
            }
        };
        respond(req.id, Value::String(id))
    }

    fn handle_unsubscribe(&self, req: Request) -> Result<Vec<u8>, DispatchError> {
        let Some(filters) = &self.filters else {
            return Err(fail(&req, ErrorObject::method_not_found(&req.method)));
        };
        let params = decode_params(&req).map_err(|err| fail(&req, err))?;
        let (id,): (String,) = FromParams::from_params(params)
            .map_err(|_| fail(&req, ErrorObject::invalid_params(&req.method)))?;
        respond(req.id, Value::Bool(filters.uninstall(&id)))
    }
}

/// Pairs an error object with the id of the request that caused it.
fn fail(req: &Request, error: ErrorObject) -> DispatchError {
    DispatchError { id: req.id.clone().unwrap_or_default(), error }
}

fn decode_params(req: &Request) -> Result<Vec<Value>, ErrorObject> {
    match &req.params {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => Ok(values.clone()),
        Some(_) => Err(ErrorObject::invalid_params(&req.method)),
    }
}

fn respond(id: Option<Id>, result: Value) -> Result<Vec<u8>, DispatchError> {
    let id = id.unwrap_or_default();
    let response = Response::success(id.clone(), result);
    serde_json::to_vec(&response).map_err(|err| {
        error!(target: "rpc", %err, "failed to serialize response");
        DispatchError { id, error: ErrorObject::internal_error() }
    })
}
