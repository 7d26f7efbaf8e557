//! Resource handlers.
//!
//! A [`ResourceHandler`] binds per-verb views for one model to an axum
//! route. Each request goes through:
//!
//! ```text
//!   authenticate → permissions → OPTIONS? → verb lookup (405)
//!     → body verbs: content type (406) → unmarshal (400)
//!     → view → marshal in the negotiated format
//! ```
//!
//! `PATCH` bodies are decoded by a partial serializer, so absent keys are
//! left as the factory built them. `HEAD` is served by the `GET` view.
//! Errors always answer in JSON.

use std::{collections::BTreeMap, future::Future, sync::Arc};

use axum::{
    body::Body,
    extract::{RawPathParams, Request},
    http::{header, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Map;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{debug, info, warn};
use unchained_core::{Format, Model, ModelSerializer, Phase, SerializerError, Value};

use crate::{
    authentication::{self, AuthError},
    config::ViewConfig,
    error::ApiError,
    parsers::{request_format, response_format},
    request::RequestContext,
};

// ═══════════════════════════════════════════════════════════════════════════
// VERBS AND REPLIES
// ═══════════════════════════════════════════════════════════════════════════

/// The methods a view can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    /// `HEAD` maps to [`Verb::Get`]; `OPTIONS` is handled by the handler itself.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::PATCH => Some(Self::Patch),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    pub const fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    /// Verbs whose request body is decoded into the serializer.
    pub const fn reads_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

enum Payload<M> {
    Serializer(ModelSerializer<M>),
    List(Vec<ModelSerializer<M>>),
    Value(Value),
    Empty,
}

/// What a view answers with.
pub struct Reply<M> {
    status: StatusCode,
    payload: Payload<M>,
}

impl<M: Model> Reply<M> {
    pub fn ok(serializer: ModelSerializer<M>) -> Self {
        Self {
            status: StatusCode::OK,
            payload: Payload::Serializer(serializer),
        }
    }

    pub fn created(serializer: ModelSerializer<M>) -> Self {
        Self {
            status: StatusCode::CREATED,
            payload: Payload::Serializer(serializer),
        }
    }

    /// A `200` array, one object per serializer.
    pub fn list(serializers: Vec<ModelSerializer<M>>) -> Self {
        Self {
            status: StatusCode::OK,
            payload: Payload::List(serializers),
        }
    }

    pub fn value(status: StatusCode, value: Value) -> Self {
        Self {
            status,
            payload: Payload::Value(value),
        }
    }

    pub const fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            payload: Payload::Empty,
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    fn render(self, format: Format) -> Result<Response, ApiError> {
        let bytes = match self.payload {
            Payload::Serializer(mut serializer) => serializer.marshal(format)?,
            Payload::List(serializers) => {
                let items = serializers
                    .into_iter()
                    .map(|mut s| s.to_value())
                    .collect::<Result<Vec<_>, _>>()?;
                format.encode(&Value::Array(items))?
            }
            Payload::Value(value) => format.encode(&value)?,
            Payload::Empty => return Ok(self.status.into_response()),
        };
        Ok((
            self.status,
            [(header::CONTENT_TYPE, format.content_type())],
            bytes,
        )
            .into_response())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HANDLER
// ═══════════════════════════════════════════════════════════════════════════

type Factory<M> = Arc<dyn Fn() -> Result<ModelSerializer<M>, SerializerError> + Send + Sync>;

type ViewFn<M> = Arc<
    dyn Fn(RequestContext, ModelSerializer<M>) -> BoxFuture<'static, Result<Reply<M>, ApiError>>
        + Send
        + Sync,
>;

pub struct ResourceHandler<M> {
    factory: Factory<M>,
    view: ViewConfig,
    views: BTreeMap<Verb, ViewFn<M>>,
}

impl<M: Model + 'static> ResourceHandler<M> {
    /// `factory` builds a fresh serializer for every request.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<ModelSerializer<M>, SerializerError> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            view: ViewConfig::default(),
            views: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// Register `view` for `verb`, replacing any earlier registration.
    #[must_use]
    pub fn on<F, Fut>(mut self, verb: Verb, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        let view: ViewFn<M> =
            Arc::new(move |request: RequestContext, serializer: ModelSerializer<M>| {
                view(request, serializer).boxed()
            });
        self.views.insert(verb, view);
        self
    }

    #[must_use]
    pub fn get<F, Fut>(self, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        self.on(Verb::Get, view)
    }

    #[must_use]
    pub fn post<F, Fut>(self, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        self.on(Verb::Post, view)
    }

    #[must_use]
    pub fn put<F, Fut>(self, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        self.on(Verb::Put, view)
    }

    #[must_use]
    pub fn patch<F, Fut>(self, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        self.on(Verb::Patch, view)
    }

    #[must_use]
    pub fn delete<F, Fut>(self, view: F) -> Self
    where
        F: Fn(RequestContext, ModelSerializer<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply<M>, ApiError>> + Send + 'static,
    {
        self.on(Verb::Delete, view)
    }

    /// Registered verbs in declaration order.
    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        self.views.keys().copied()
    }

    /// Methods answered by this handler, for the `Allow` header.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.verbs().map(Verb::method).collect();
        if self.views.contains_key(&Verb::Get) {
            methods.push(Method::HEAD);
        }
        methods.push(Method::OPTIONS);
        methods
    }

    /// Field metadata keyed by registered verb, then by field name.
    pub fn metadata(&self) -> Result<Value, ApiError> {
        let mut serializer = (self.factory)()?;
        serializer.init()?;
        serializer.perform_modifications(Phase::PreWrite)?;
        serializer.perform_modifications(Phase::PreRead)?;
        let fields = serializer
            .metadata()
            .into_iter()
            .map(|field| {
                let name = field.name.clone();
                serde_json::to_value(field)
                    .map(|value| (name, value))
                    .map_err(|e| ApiError::Internal(format!("field metadata: {e}")))
            })
            .collect::<Result<Map<String, Value>, _>>()?;

        let by_verb: Map<String, Value> = Verb::iter()
            .filter(|verb| self.views.contains_key(verb))
            .map(|verb| (verb.to_string(), Value::Object(fields.clone())))
            .collect();
        Ok(Value::Object(by_verb))
    }

    /// Serve one request. `request.param(..)` is empty; use
    /// [`into_router`](Self::into_router) for routes with captures.
    pub async fn handle(&self, request: Request) -> Response {
        self.serve(Vec::new(), request).await
    }

    /// Mount the handler at `path`, which may capture parameters such as
    /// `/accounts/:id`.
    pub fn into_router(self, path: &str) -> Router {
        let handler = Arc::new(self);
        Router::new().route(
            path,
            any(move |params: Option<RawPathParams>, request: Request| {
                let handler = Arc::clone(&handler);
                async move {
                    let params = params
                        .iter()
                        .flat_map(|p| p.iter())
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    handler.serve(params, request).await
                }
            }),
        )
    }

    async fn serve(&self, params: Vec<(String, String)>, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        match self.dispatch(parts, params, body).await {
            Ok(response) => {
                info!(%method, %path, status = response.status().as_u16(), "request served");
                response
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    warn!(%method, %path, status = status.as_u16(), error = %e, "request failed");
                } else {
                    info!(%method, %path, status = status.as_u16(), error = %e, "request rejected");
                }
                e.into_response()
            }
        }
    }

    async fn dispatch(
        &self,
        parts: Parts,
        params: Vec<(String, String)>,
        body: Body,
    ) -> Result<Response, ApiError> {
        let mut request = RequestContext::from_parts(&parts).with_params(params);

        authentication::authenticate(self.view.authentication(), &mut request)
            .await
            .map_err(|e| self.authentication_error(e))?;
        self.check_permissions(&request)?;

        let format = response_format(&parts.headers, self.view.default_format());

        if parts.method == Method::OPTIONS {
            let metadata = self.metadata()?;
            return Reply::<M>::value(StatusCode::OK, metadata).render(format);
        }

        let (verb, view) = Verb::from_method(&parts.method)
            .and_then(|verb| self.views.get(&verb).map(|view| (verb, view)))
            .ok_or_else(|| ApiError::MethodNotAllowed {
                method: parts.method.clone(),
                allow: self.allowed_methods(),
            })?;

        let mut serializer = (self.factory)()?;
        if verb.reads_body() {
            let input = request_format(
                &parts.headers,
                self.view.enforces_content_type(),
                self.view.default_format(),
            )?;
            let bytes = axum::body::to_bytes(body, self.view.max_body_bytes())
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read request body: {e}")))?;
            if verb == Verb::Patch {
                serializer = serializer.partial();
            }
            debug!(%verb, %input, size = bytes.len(), "decoding request body");
            serializer.unmarshal(&bytes, input)?;
        } else {
            serializer.init()?;
        }

        let reply = view(request, serializer).await?;
        reply.render(format)
    }

    fn challenge(&self) -> Option<String> {
        self.view
            .authentication()
            .first()
            .map(|scheme| scheme.authenticate_header())
    }

    fn authentication_error(&self, error: AuthError) -> ApiError {
        match ApiError::from(error) {
            ApiError::NotAuthenticated { detail, .. } => ApiError::NotAuthenticated {
                detail,
                challenge: self.challenge(),
            },
            other => other,
        }
    }

    /// Anonymous requests are told to authenticate when a scheme could
    /// accept them; everyone else is forbidden.
    fn check_permissions(&self, request: &RequestContext) -> Result<(), ApiError> {
        if self
            .view
            .permissions()
            .iter()
            .all(|permission| permission.has_permission(request))
        {
            return Ok(());
        }
        match self.challenge() {
            Some(challenge) if !request.is_authenticated() => Err(ApiError::NotAuthenticated {
                detail: "authentication credentials were not provided".to_string(),
                challenge: Some(challenge),
            }),
            _ => Err(ApiError::PermissionDenied),
        }
    }
}
