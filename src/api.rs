//! REST API for the packing service.
//!
//! Accepts containers, a pack/unpack sequence and optional engine overrides,
//! runs the engine and returns the packed set, the action log, the metrics
//! series and the remaining free space. Uses Axum as the web framework and
//! supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineSettings};
use crate::engine::{
    EngineConfig, PackingOutcome, pack_sequence, pack_sequence_with_progress,
};
use crate::error::PackingError;
use crate::geometry::Hyperrectangle;
use crate::model::{Action, Item, Verb};
use crate::packer::PackerKind;
use crate::selector::SelectorKind;
use crate::types::{Dimensional, Positioned};

#[derive(Clone)]
struct ApiState {
    engine: EngineSettings,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pdp_packer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Outer container. The position defaults to the origin.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    #[serde(default)]
    #[schema(nullable = true, example = json!([0.0, 0.0, 0.0]))]
    pub position: Option<Vec<f64>>,
    #[schema(example = json!([30.0, 10.0, 10.0]))]
    pub extent: Vec<f64>,
}

impl ContainerRequest {
    fn into_region(self) -> Result<Hyperrectangle, PackingError> {
        let position = self.position.unwrap_or_else(|| vec![0.0; self.extent.len()]);
        Hyperrectangle::new(position, self.extent)
    }
}

/// One step of the sequence. Pack steps need an extent; unpack steps only a name.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ActionRequest {
    pub verb: Verb,
    pub name: String,
    #[serde(default)]
    #[schema(nullable = true, example = json!([1.0, 1.0, 1.0]))]
    pub extent: Option<Vec<f64>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub position: Option<Vec<f64>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub weight: Option<f64>,
}

impl ActionRequest {
    fn into_action(self, step: usize) -> Result<Action, PackRequestValidationError> {
        match self.verb {
            Verb::Unpack => Ok(Action::unpack(self.name)),
            Verb::Pack => {
                let Some(extent) = self.extent else {
                    return Err(PackRequestValidationError::MissingExtent {
                        step,
                        name: self.name,
                    });
                };
                let position = self.position.unwrap_or_else(|| vec![0.0; extent.len()]);
                Item::solid(self.name, position, extent, self.weight.unwrap_or(0.0))
                    .map(Action::pack)
                    .map_err(PackRequestValidationError::InvalidAction)
            }
        }
    }
}

/// Per-request overrides of the engine defaults.
#[derive(Deserialize, Clone, Default, ToSchema)]
pub struct OptionsRequest {
    /// `fixed` or `rotating`
    #[serde(default)]
    #[schema(nullable = true)]
    pub packer: Option<String>,
    /// `basic`, `non_blocking` or `stable_non_blocking`
    #[serde(default)]
    #[schema(nullable = true)]
    pub selector: Option<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub axis_priority: Option<Vec<usize>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub rotation_priority: Option<Vec<usize>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allowed_rotation_axes: Option<Vec<bool>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub blocking_axes: Option<Vec<bool>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub support_axis: Option<usize>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub metric_axis: Option<usize>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub prune_included_containers: Option<bool>,
}

impl OptionsRequest {
    fn apply_to(self, base: EngineConfig) -> Result<EngineConfig, PackRequestValidationError> {
        let mut builder = EngineConfig::builder()
            .packer(base.packer)
            .selector(base.selector)
            .support_axis(base.support_axis)
            .metric_axis(base.metric_axis)
            .prune_included_containers(base.prune_included_containers);

        if let Some(raw) = self.packer {
            let kind = PackerKind::from_code(&raw)
                .ok_or(PackRequestValidationError::UnknownPacker(raw))?;
            builder = builder.packer(kind);
        }
        if let Some(raw) = self.selector {
            let kind = SelectorKind::from_code(&raw)
                .ok_or(PackRequestValidationError::UnknownSelector(raw))?;
            builder = builder.selector(kind);
        }
        if let Some(axes) = self.axis_priority.or(base.axis_priority) {
            builder = builder.axis_priority(axes);
        }
        if let Some(axes) = self.rotation_priority.or(base.rotation_priority) {
            builder = builder.rotation_priority(axes);
        }
        if let Some(mask) = self.allowed_rotation_axes.or(base.allowed_rotation_axes) {
            builder = builder.allowed_rotation_axes(mask);
        }
        if let Some(mask) = self.blocking_axes.or(base.blocking_axes) {
            builder = builder.blocking_axes(mask);
        }
        if let Some(axis) = self.support_axis {
            builder = builder.support_axis(axis);
        }
        if let Some(axis) = self.metric_axis {
            builder = builder.metric_axis(axis);
        }
        if let Some(prune) = self.prune_included_containers {
            builder = builder.prune_included_containers(prune);
        }
        Ok(builder.build())
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "containers": [
            { "extent": [30.0, 10.0, 10.0] }
        ],
        "actions": [
            { "verb": "pack", "name": "a", "extent": [1.0, 1.0, 1.0], "weight": 2.0 },
            { "verb": "pack", "name": "b", "extent": [1.0, 1.0, 1.0] },
            { "verb": "unpack", "name": "a" },
            { "verb": "unpack", "name": "b" }
        ],
        "options": { "selector": "stable_non_blocking" }
    })
)]
pub struct PackRequest {
    pub containers: Vec<ContainerRequest>,
    pub actions: Vec<ActionRequest>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub options: Option<OptionsRequest>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    containers: Vec<Hyperrectangle>,
    actions: Vec<Action>,
    config: EngineConfig,
}

impl ValidatedPackRequest {
    fn container_count(&self) -> usize {
        self.containers.len()
    }

    fn action_count(&self) -> usize {
        self.actions.len()
    }

    fn into_parts(self) -> (Vec<Action>, Vec<Hyperrectangle>, EngineConfig) {
        (self.actions, self.containers, self.config)
    }
}

#[derive(Debug, Error)]
enum PackRequestValidationError {
    #[error("At least one container must be specified")]
    MissingContainers,
    #[error("{0}")]
    InvalidContainer(PackingError),
    #[error("Pack action {step} ('{name}') needs an extent")]
    MissingExtent { step: usize, name: String },
    #[error("{0}")]
    InvalidAction(PackingError),
    #[error("Unknown packer '{0}'")]
    UnknownPacker(String),
    #[error("Unknown selector '{0}'")]
    UnknownSelector(String),
}

impl PackRequest {
    fn into_validated(
        self,
        defaults: EngineConfig,
    ) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        if self.containers.is_empty() {
            return Err(PackRequestValidationError::MissingContainers);
        }

        let containers = self
            .containers
            .into_iter()
            .map(ContainerRequest::into_region)
            .collect::<Result<Vec<_>, PackingError>>()
            .map_err(PackRequestValidationError::InvalidContainer)?;

        let actions = self
            .actions
            .into_iter()
            .enumerate()
            .map(|(step, action)| action.into_action(step))
            .collect::<Result<Vec<_>, _>>()?;

        let config = self.options.unwrap_or_default().apply_to(defaults)?;

        Ok(ValidatedPackRequest {
            containers,
            actions,
            config,
        })
    }
}

/// Item in the final packed set.
#[derive(Serialize, ToSchema)]
pub struct PackedItemResponse {
    pub name: String,
    pub position: Vec<f64>,
    pub extent: Vec<f64>,
    pub weight: f64,
    /// Step that placed the item
    pub packed_at: usize,
}

/// Executed action with the geometry it acted on.
#[derive(Serialize, ToSchema)]
pub struct LoggedActionResponse {
    pub step: usize,
    pub verb: Verb,
    pub name: String,
    pub position: Vec<f64>,
    pub extent: Vec<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct MetricResponse {
    pub step: usize,
    pub max_extent: f64,
    pub loading: f64,
    pub weight: f64,
}

#[derive(Serialize, ToSchema)]
pub struct RegionResponse {
    pub position: Vec<f64>,
    pub extent: Vec<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct HaltResponse {
    pub step: usize,
    pub name: String,
}

/// Response of the packing endpoint.
///
/// # Fields
/// * `packed` - Items still loaded after the last executed action
/// * `actions` - Executed actions in order
/// * `metrics` - One sample per executed action
/// * `free_space` - Remaining free regions
/// * `halted` - Set when an item found no place
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub packed: Vec<PackedItemResponse>,
    pub actions: Vec<LoggedActionResponse>,
    pub metrics: Vec<MetricResponse>,
    pub free_space: Vec<RegionResponse>,
    #[schema(nullable = true)]
    pub halted: Option<HaltResponse>,
    pub is_complete: bool,
}

impl PackResponse {
    pub fn from_outcome(outcome: PackingOutcome) -> Self {
        let is_complete = outcome.is_complete();
        let PackingOutcome {
            packed,
            actions,
            metrics,
            free_space,
            halted,
            ..
        } = outcome;

        Self {
            packed: packed
                .into_iter()
                .map(|p| PackedItemResponse {
                    position: p.item.position().to_vec(),
                    extent: p.item.extent().to_vec(),
                    weight: p.item.weight,
                    name: p.item.name,
                    packed_at: p.packed_at,
                })
                .collect(),
            actions: actions
                .into_iter()
                .map(|a| LoggedActionResponse {
                    step: a.step,
                    verb: a.verb,
                    position: a.item.position().to_vec(),
                    extent: a.item.extent().to_vec(),
                    name: a.item.name,
                })
                .collect(),
            metrics: metrics
                .samples
                .iter()
                .map(|s| MetricResponse {
                    step: s.step,
                    max_extent: s.max_extent,
                    loading: s.loading,
                    weight: s.weight,
                })
                .collect(),
            free_space: free_space
                .regions()
                .iter()
                .map(|r| RegionResponse {
                    position: r.position().to_vec(),
                    extent: r.extent().to_vec(),
                })
                .collect(),
            halted: halted.map(|h| HaltResponse {
                step: h.step,
                name: h.name,
            }),
            is_complete,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn engine_error(err: PackingError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Packing run rejected",
        err.to_string(),
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    defaults: EngineConfig,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated(defaults) {
        Ok(validated) => Ok(validated),
        Err(err @ PackRequestValidationError::InvalidContainer(_)) => {
            Err(container_config_error(err.to_string()))
        }
        Err(err) => Err(validation_error(err.to_string())),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            ActionRequest,
            Verb,
            OptionsRequest,
            PackResponse,
            PackedItemResponse,
            LoggedActionResponse,
            MetricResponse,
            RegionResponse,
            HaltResponse,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for pickup-and-delivery packing"))
)]
struct ApiDoc;

fn router(engine: EngineSettings) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(ApiState { engine })
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests. Blocks until the server is
/// terminated.
pub async fn start_api_server(config: ApiConfig, engine: EngineSettings) {
    let app = router(engine);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Endpoints: POST /pack, POST /pack_stream, GET /docs, GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        error!("API server terminated with an error: {err}");
    }
}

/// Handler for POST /pack endpoint.
///
/// Runs the pack/unpack sequence and returns the complete result.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Sequence executed (possibly halted early)", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, container or engine configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, state.engine.engine_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        actions = request.action_count(),
        containers = request.container_count(),
        "New pack request"
    );
    let (actions, containers, config) = request.into_parts();

    match pack_sequence(&actions, &containers, &config) {
        Ok(outcome) => {
            info!(
                executed = outcome.executed_count(),
                halted = outcome.halted.is_some(),
                "Pack request finished"
            );
            (StatusCode::OK, Json(PackResponse::from_outcome(outcome))).into_response()
        }
        Err(err) => engine_error(err),
    }
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams engine events in real-time as Server-Sent Events (text/event-stream).
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, container or engine configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload, state.engine.engine_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (actions, containers, config) = request.into_parts();
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let result = pack_sequence_with_progress(&actions, &containers, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = result {
            let message = json!({ "type": "Error", "details": err.to_string() });
            let _ = tx.blocking_send(message.to_string());
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
