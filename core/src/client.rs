//! Session-holding client for the Workfront REST API.
//!
//! # Design
//! `Client` owns three pieces of mutable state: the configuration-derived
//! hostname, the optional session id set by `login`, and the optional batch
//! queue. Every operation funnels through one `request` path that prepares
//! the URI, then either queues it (batch mode) or sends it through the
//! [`Transport`] and unwraps the response envelope. State is per instance;
//! callers that share a client across threads must serialize access.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::{BatchQueue, PATH_BATCH};
use crate::config::ClientConfig;
use crate::envelope::unwrap_envelope;
use crate::error::{Result, WorkfrontError};
use crate::http::{HttpMethod, HttpRequest, Transport, UreqTransport};
use crate::outcome::Outcome;
use crate::uri::{prepare, Params};

pub const PATH_LOGIN: &str = "/login";
pub const PATH_LOGOUT: &str = "/logout";
pub const PATH_SEARCH: &str = "/search";
pub const PATH_COUNT: &str = "/count";
pub const PATH_REPORT: &str = "/report";
pub const PATH_METADATA: &str = "/metadata";

/// Blocking client for one Workfront instance.
#[derive(Debug)]
pub struct Client<T: Transport = UreqTransport> {
    config: ClientConfig,
    hostname: String,
    transport: T,
    session_id: Option<String>,
    batch: Option<BatchQueue>,
}

impl Client<UreqTransport> {
    /// Creates a client that talks HTTP(S) through ureq.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = UreqTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let hostname = config.hostname();
        Self {
            config,
            hostname,
            transport,
            session_id: None,
            batch: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL prepended to every prepared URI.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Logs in and remembers the returned session id.
    ///
    /// Missing or empty arguments fall back to the configured credentials.
    pub fn login(&mut self, username: Option<&str>, password: Option<&str>) -> Result<Outcome<Value>> {
        let username = username.filter(|u| !u.is_empty()).unwrap_or(self.config.login()).to_string();
        let password = password.filter(|p| !p.is_empty()).unwrap_or(self.config.password()).to_string();
        if username.is_empty() || password.is_empty() {
            return Err(WorkfrontError::MissingCredentials);
        }

        let params = Params::new().with("username", username).with("password", password);
        let outcome = self.request(PATH_LOGIN, Some(&params), None, HttpMethod::Post)?;

        if let Outcome::Done(data) = &outcome {
            let session_id = data.get("sessionID").and_then(Value::as_str).ok_or_else(|| {
                WorkfrontError::MalformedResponse("login response carries no sessionID".to_string())
            })?;
            self.session_id = Some(session_id.to_string());
            info!(host = %self.config.host_url(), "logged in");
        }
        Ok(outcome)
    }

    /// Ends the session. The local session id is discarded once the call
    /// has been sent or queued.
    pub fn logout(&mut self) -> Result<Outcome<bool>> {
        let mut params = Params::new();
        if let Some(session_id) = &self.session_id {
            params.push("sessionID", session_id);
        }
        let outcome = self.request(PATH_LOGOUT, Some(&params), None, HttpMethod::Get)?;
        self.session_id = None;
        info!(host = %self.config.host_url(), "logged out");
        Ok(outcome.map(|data| success(&data)))
    }

    /// Searches for all objects of `obj_code` matching `query`.
    pub fn search(&mut self, obj_code: &str, query: &Params, fields: Option<&[&str]>) -> Result<Outcome<Value>> {
        self.request(&format!("{obj_code}{PATH_SEARCH}"), Some(query), fields, HttpMethod::Get)
    }

    pub fn get(&mut self, obj_code: &str, id: &str, fields: Option<&[&str]>) -> Result<Outcome<Value>> {
        self.request(&format!("{obj_code}/{id}"), None, fields, HttpMethod::Get)
    }

    /// Creates an object; each message field travels as a query parameter.
    pub fn post(&mut self, obj_code: &str, message: &Params, fields: Option<&[&str]>) -> Result<Outcome<Value>> {
        self.request(obj_code, Some(message), fields, HttpMethod::Post)
    }

    /// Updates an object; `message` is sent JSON-encoded as `updates`.
    pub fn put(
        &mut self,
        obj_code: &str,
        id: &str,
        message: &Value,
        fields: Option<&[&str]>,
    ) -> Result<Outcome<Value>> {
        let params = Params::new().with("updates", encode(message)?);
        self.request(&format!("{obj_code}/{id}"), Some(&params), fields, HttpMethod::Put)
    }

    pub fn delete(&mut self, obj_code: &str, id: &str, force: bool) -> Result<Outcome<bool>> {
        let params = force.then(|| Params::new().with("force", true));
        let outcome = self.request(&format!("{obj_code}/{id}"), params.as_ref(), None, HttpMethod::Delete)?;
        Ok(outcome.map(|data| success(&data)))
    }

    pub fn report(&mut self, obj_code: &str, query: &Params) -> Result<Outcome<Value>> {
        self.request(&format!("{obj_code}{PATH_REPORT}"), Some(query), None, HttpMethod::Get)
    }

    /// Number of objects matching `query`; `0` when the server omits it.
    pub fn count(&mut self, obj_code: &str, query: &Params, fields: Option<&[&str]>) -> Result<Outcome<u64>> {
        let outcome = self.request(&format!("{obj_code}{PATH_COUNT}"), Some(query), fields, HttpMethod::Get)?;
        Ok(outcome.map(|data| data.get("count").and_then(Value::as_u64).unwrap_or(0)))
    }

    /// Copies object `id`, optionally applying `message` as updates to the copy.
    pub fn copy(
        &mut self,
        obj_code: &str,
        id: &str,
        message: Option<&Value>,
        fields: Option<&[&str]>,
    ) -> Result<Outcome<Value>> {
        let mut params = Params::new().with("copySourceID", id);
        if let Some(message) = message {
            params.push("updates", encode(message)?);
        }
        self.request(obj_code, Some(&params), fields, HttpMethod::Post)
    }

    /// Runs a named action on an object.
    pub fn execute(
        &mut self,
        obj_code: &str,
        id: &str,
        action: &str,
        params: Option<&Params>,
    ) -> Result<Outcome<bool>> {
        let outcome = self.request(&format!("{obj_code}/{id}/{action}"), params, None, HttpMethod::Put)?;
        Ok(outcome.map(|data| success(&data)))
    }

    pub fn named_query(
        &mut self,
        obj_code: &str,
        query_name: &str,
        query: Option<&Params>,
        fields: Option<&[&str]>,
    ) -> Result<Outcome<Value>> {
        self.request(&format!("{obj_code}/{query_name}"), query, fields, HttpMethod::Get)
    }

    /// API metadata for one object type, or for the whole API when `obj_code` is `None`.
    pub fn metadata(&mut self, obj_code: Option<&str>) -> Result<Outcome<Value>> {
        let path = match obj_code.filter(|c| !c.is_empty()) {
            Some(obj_code) => format!("{obj_code}{PATH_METADATA}"),
            None => PATH_METADATA.to_string(),
        };
        self.request(&path, None, None, HttpMethod::Get)
    }

    /// Queues every following call until [`Client::batch_end`].
    ///
    /// Starting a batch while one is open discards the calls queued so far.
    pub fn batch_start(&mut self, atomic: bool) {
        if let Some(previous) = &self.batch {
            warn!(discarded = previous.len(), "batch restarted before it was flushed");
        }
        self.batch = Some(BatchQueue::new(atomic));
    }

    /// Sends all queued calls as one batch request and leaves batch mode.
    ///
    /// Fails with [`WorkfrontError::EmptyBatch`] without sending anything
    /// when no call was queued; batch mode then stays active.
    pub fn batch_end(&mut self) -> Result<Value> {
        if self.batch.as_ref().map_or(true, BatchQueue::is_empty) {
            return Err(WorkfrontError::EmptyBatch);
        }
        let queue = self.batch.take().ok_or(WorkfrontError::EmptyBatch)?;
        info!(calls = queue.len(), atomic = queue.is_atomic(), "flushing batch");

        let params = queue.into_params()?;
        let uri = prepare(PATH_BATCH, Some(&params), None, HttpMethod::Get, self.session_id.as_deref())?;
        self.dispatch(HttpMethod::Get, &uri)
    }

    fn request(
        &mut self,
        path: &str,
        params: Option<&Params>,
        fields: Option<&[&str]>,
        method: HttpMethod,
    ) -> Result<Outcome<Value>> {
        let session = match self.batch {
            Some(_) => None,
            None => self.session_id.as_deref(),
        };
        let uri = prepare(path, params, fields, method, session)?;

        if let Some(queue) = self.batch.as_mut() {
            debug!(%method, path, queued = queue.len() + 1, "queued request");
            queue.push(uri);
            return Ok(Outcome::Queued);
        }
        self.dispatch(method, &uri).map(Outcome::Done)
    }

    fn dispatch(&mut self, method: HttpMethod, uri: &str) -> Result<Value> {
        let request = HttpRequest {
            method,
            url: format!("{}{uri}", self.hostname),
            headers: vec![("accept".to_string(), "application/json".to_string())],
        };
        // The query string carries credentials and the session id.
        let path = uri.split_once('?').map_or(uri, |(path, _)| path);
        debug!(%method, path, "dispatching request");

        let response = self.transport.send(&request)?;
        unwrap_envelope(&response)
    }
}

fn success(data: &Value) -> bool {
    data.get("success").and_then(Value::as_bool).unwrap_or(false)
}

fn encode(message: &Value) -> Result<String> {
    serde_json::to_string(message).map_err(|e| WorkfrontError::Serialization(e.to_string()))
}
