//! In-memory imitation of the Workfront REST API.
//!
//! Every request under `/attask/api[/v<version>]` goes through one handler
//! that routes on path segments and the effective method (the `method`
//! query parameter, else the HTTP verb). The batch endpoint replays each
//! queued URI through the same routing under the batch's session.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const PATH_CONTEXT: &str = "/attask/api";

/// Password the mock always rejects, for exercising failed logins.
pub const REJECTED_PASSWORD: &str = "wrong";

/// Query parameters that steer a call rather than describe object fields.
const RESERVED: &[&str] = &[
    "sessionID",
    "method",
    "fields",
    "updates",
    "copySourceID",
    "force",
    "atomic",
    "uri",
];

pub type Object = Map<String, Value>;

#[derive(Debug, Default, Clone)]
pub struct Store {
    sessions: HashMap<String, String>,
    objects: HashMap<String, BTreeMap<String, Object>>,
}

pub type Db = Arc<RwLock<Store>>;

impl Store {
    /// Seeds an object and returns its generated ID.
    pub fn insert(&mut self, obj_code: &str, fields: Object) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut object = Object::new();
        object.insert("ID".to_string(), Value::String(id.clone()));
        object.insert("objCode".to_string(), Value::String(obj_code.to_uppercase()));
        object.extend(fields);
        self.objects
            .entry(obj_code.to_lowercase())
            .or_default()
            .insert(id.clone(), object);
        id
    }

    pub fn get(&self, obj_code: &str, id: &str) -> Option<&Object> {
        self.objects.get(&obj_code.to_lowercase())?.get(id)
    }

    fn table(&self, obj_code: &str) -> impl Iterator<Item = &Object> {
        self.objects.get(&obj_code.to_lowercase()).into_iter().flat_map(BTreeMap::values)
    }

    fn object_mut(&mut self, obj_code: &str, id: &str) -> Result<&mut Object, Failure> {
        self.objects
            .get_mut(&obj_code.to_lowercase())
            .and_then(|table| table.get_mut(id))
            .ok_or_else(|| Failure::not_found(format!("{obj_code} {id} not found")))
    }

    fn handle(&mut self, call: &Call, batch_session: Option<&str>) -> Result<Value, Failure> {
        let segments: Vec<&str> = call.segments.iter().map(String::as_str).collect();
        if let ["login"] = segments.as_slice() {
            return self.login(call);
        }

        let session = call
            .param("sessionID")
            .or(batch_session)
            .filter(|id| self.sessions.contains_key(*id))
            .map(str::to_string)
            .ok_or_else(|| Failure::unauthorized("You are not currently logged in"))?;

        match (call.method.as_str(), segments.as_slice()) {
            ("GET", ["logout"]) => {
                self.sessions.remove(&session);
                Ok(json!({"success": true}))
            }
            ("GET", ["batch"]) if batch_session.is_none() => self.batch(call, &session),
            ("GET", ["metadata"]) => {
                let mut codes: Vec<&String> = self.objects.keys().collect();
                codes.sort();
                Ok(json!({"objects": codes}))
            }
            ("GET", [code, "metadata"]) => {
                let mut fields: Vec<&String> = self.table(code).flat_map(Object::keys).collect();
                fields.sort();
                fields.dedup();
                Ok(json!({"objCode": code.to_uppercase(), "fields": fields}))
            }
            ("GET", [code, "search"]) => Ok(Value::Array(self.search(code, call).cloned().map(Value::Object).collect())),
            ("GET", [code, "count"]) => Ok(json!({"count": self.search(code, call).count()})),
            ("GET", [code, "report"]) => Ok(json!({"dcount": self.search(code, call).count()})),
            ("POST", [code]) => match call.param("copySourceID") {
                Some(source) => self.copy(code, source, call),
                None => Ok(Value::Object(self.create(code, call.fields()))),
            },
            ("GET", [code, "myWork"]) => {
                let user = self.sessions.get(&session).cloned().unwrap_or_default();
                Ok(Value::Array(
                    self.table(code)
                        .filter(|o| o.get("assignedToID").and_then(Value::as_str) == Some(user.as_str()))
                        .cloned()
                        .map(Value::Object)
                        .collect(),
                ))
            }
            ("GET", [code, id]) => self
                .get(code, id)
                .cloned()
                .map(Value::Object)
                .ok_or_else(|| Failure::not_found(format!("{code} {id} not found"))),
            ("PUT", [code, id]) => {
                let updates = call.updates()?;
                let object = self.object_mut(code, id)?;
                object.extend(updates);
                Ok(Value::Object(object.clone()))
            }
            ("DELETE", [code, id]) => {
                self.objects
                    .get_mut(&code.to_lowercase())
                    .and_then(|table| table.remove(*id))
                    .ok_or_else(|| Failure::not_found(format!("{code} {id} not found")))?;
                Ok(json!({"success": true}))
            }
            ("PUT", [code, id, action]) => {
                let object = self.object_mut(code, id)?;
                object.insert("lastAction".to_string(), Value::String((*action).to_string()));
                object.extend(call.fields());
                Ok(json!({"success": true}))
            }
            _ => Err(Failure::not_found(format!(
                "unsupported request: {} /{}",
                call.method,
                segments.join("/")
            ))),
        }
    }

    fn login(&mut self, call: &Call) -> Result<Value, Failure> {
        let username = call.param("username").unwrap_or_default();
        let password = call.param("password").unwrap_or_default();
        if username.is_empty() || password.is_empty() || password == REJECTED_PASSWORD {
            return Err(Failure::unauthorized("Invalid username or password"));
        }
        let session_id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(session_id.clone(), username.to_string());
        Ok(json!({"sessionID": session_id, "userID": username}))
    }

    fn search<'a>(&'a self, code: &str, call: &'a Call) -> impl Iterator<Item = &'a Object> + 'a {
        let filters: Vec<(&'a str, &'a str)> = call.filters().collect();
        self.table(code).filter(move |object| {
            filters
                .iter()
                .all(|(name, wanted)| object.get(*name).map(render).as_deref() == Some(*wanted))
        })
    }

    fn create(&mut self, code: &str, fields: Object) -> Object {
        let id = self.insert(code, fields);
        self.get(code, &id).cloned().unwrap_or_default()
    }

    fn copy(&mut self, code: &str, source: &str, call: &Call) -> Result<Value, Failure> {
        let mut fields = self
            .get(code, source)
            .cloned()
            .ok_or_else(|| Failure::not_found(format!("{code} {source} not found")))?;
        fields.remove("ID");
        fields.extend(call.updates()?);
        Ok(Value::Object(self.create(code, fields)))
    }

    fn batch(&mut self, call: &Call, session: &str) -> Result<Value, Failure> {
        let uris = call.all("uri");
        if uris.is_empty() {
            return Err(Failure::bad_request("Batch operations must specify at least one 'uri' parameter"));
        }
        let atomic = call.param("atomic").is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let mut snapshot = atomic.then(|| self.objects.clone());

        let mut results = Vec::with_capacity(uris.len());
        for uri in uris {
            let outcome = Call::parse(uri).and_then(|sub| self.handle(&sub, Some(session)));
            match outcome {
                Ok(data) => results.push(data),
                Err(failure) => {
                    if let Some(snapshot) = snapshot.take() {
                        self.objects = snapshot;
                        return Err(failure);
                    }
                    results.push(json!({"error": {"message": failure.message}}));
                }
            }
        }
        Ok(Value::Array(results))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A failed call: HTTP status plus the message placed in the error envelope.
#[derive(Debug)]
struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

/// One API call: effective method, path segments below the API context,
/// and query pairs in wire order.
#[derive(Debug)]
struct Call {
    method: String,
    segments: Vec<String>,
    params: Vec<(String, String)>,
}

impl Call {
    fn new(path: &str, http_method: &Method, params: Vec<(String, String)>) -> Self {
        let method = params
            .iter()
            .find(|(name, _)| name == "method")
            .map_or_else(|| http_method.as_str().to_string(), |(_, v)| v.to_uppercase());
        Self {
            method,
            segments: path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect(),
            params,
        }
    }

    /// Parses a queued batch URI such as `/task/1?method=GET`.
    fn parse(uri: &str) -> Result<Self, Failure> {
        let parsed: Uri = uri
            .parse()
            .map_err(|_| Failure::bad_request(format!("invalid batch uri {uri}")))?;
        let Query(params) = Query::<Vec<(String, String)>>::try_from_uri(&parsed)
            .map_err(|e| Failure::bad_request(e.to_string()))?;
        Ok(Self::new(parsed.path(), &Method::GET, params))
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    fn all(&self, name: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .filter(|(n, _)| !RESERVED.contains(&n.as_str()))
            .map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn fields(&self) -> Object {
        self.filters()
            .map(|(n, v)| (n.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn updates(&self) -> Result<Object, Failure> {
        match self.param("updates") {
            None => Ok(Object::new()),
            Some(raw) => match serde_json::from_str(raw) {
                Ok(Value::Object(updates)) => Ok(updates),
                _ => Err(Failure::bad_request("updates must be a JSON object")),
            },
        }
    }
}

/// Strips `/attask/api` and an optional `/v<digits...>` segment.
fn strip_context(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PATH_CONTEXT)?;
    match rest
        .strip_prefix("/v")
        .filter(|v| v.starts_with(|c: char| c.is_ascii_digit()))
    {
        Some(versioned) => Some(versioned.find('/').map_or("", |i| &versioned[i..])),
        None => Some(rest),
    }
}

pub fn app() -> Router {
    app_with_store(Store::default())
}

pub fn app_with_store(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new().fallback(handle).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_store(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(store)).await
}

async fn handle(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<Value>) {
    let Some(path) = strip_context(uri.path()) else {
        return envelope(Err(Failure::not_found(format!("unknown path {}", uri.path()))));
    };
    let call = Call::new(path, &method, params);
    debug!(method = %call.method, path, "handling call");

    let result = db.write().await.handle(&call, None);
    envelope(result)
}

fn envelope(result: Result<Value, Failure>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(data) => (StatusCode::OK, Json(json!({"data": data}))),
        Err(failure) => (failure.status, Json(json!({"error": {"message": failure.message}}))),
    }
}
