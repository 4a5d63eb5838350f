//! HTTP front-end.
//!
//! Build endpoints start work in the background and answer immediately;
//! list endpoints render the same inventories as the command line.
//!
//! | Route | Query |
//! |-------|-------|
//! | `GET /base-images/build` | `tag`, `force-rebuild` |
//! | `GET /base-images/list` | `format` |
//! | `GET /deployments/build` | `name`, `tag`, `deployment-tag` |
//! | `GET /deployments/list` | `format` |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use container_factory_core::{FactoryConfig, Result};
use container_factory_runtime::{CommandTool, Factory, ImageTool, OutputFormat};
use serde::Deserialize;

const BUILD_STARTED: &str = "Build process started";

/// Shared, immutable per-server state. Each request derives its own
/// configuration from it.
#[derive(Clone)]
pub struct AppState {
    config: Arc<FactoryConfig>,
    tool: Arc<dyn ImageTool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BaseImageBuildQuery {
    pub tag: Option<String>,
    #[serde(rename = "force-rebuild")]
    pub force_rebuild: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeploymentBuildQuery {
    pub name: Option<String>,
    pub tag: Option<String>,
    #[serde(rename = "deployment-tag")]
    pub deployment_tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub format: Option<String>,
}

/// Router driving the configured external build tool.
pub fn router(config: FactoryConfig) -> Router {
    let tool = Arc::new(CommandTool::new(config.build_tool.clone()));
    router_with_tool(config, tool)
}

pub fn router_with_tool(config: FactoryConfig, tool: Arc<dyn ImageTool>) -> Router {
    Router::new()
        .route("/base-images/build", get(build_base_images))
        .route("/base-images/list", get(list_base_images))
        .route("/deployments/build", get(build_deployment))
        .route("/deployments/list", get(list_deployments))
        .with_state(AppState {
            config: Arc::new(config),
            tool,
        })
}

/// Listen on `0.0.0.0:<listen_port>` until the process exits.
pub async fn serve(config: FactoryConfig) -> Result<()> {
    config.validate()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(port = config.listen_port, "Starting web server");

    axum::serve(listener, router(config)).await?;
    Ok(())
}

async fn build_base_images(
    State(state): State<AppState>,
    Query(query): Query<BaseImageBuildQuery>,
) -> Response {
    let mut config = (*state.config).clone();
    if let Some(tag) = non_empty(query.tag) {
        config.tag = Some(tag);
    }
    if non_empty(query.force_rebuild).is_some() {
        config.force_rebuild = true;
    }

    let factory = match Factory::with_tool(config, state.tool) {
        Ok(factory) => factory,
        Err(e) => return error_response(e),
    };

    tokio::spawn(async move {
        match factory.build_base_images().await {
            Ok(report) => tracing::info!(
                built = report.built.len(),
                failed = report.failed.len(),
                push_failed = report.push_failed.len(),
                "Background base image build finished"
            ),
            Err(e) => tracing::error!(error = %e, "Background base image build failed"),
        }
    });

    (StatusCode::OK, BUILD_STARTED).into_response()
}

async fn build_deployment(
    State(state): State<AppState>,
    Query(query): Query<DeploymentBuildQuery>,
) -> Response {
    let Some(name) = non_empty(query.name) else {
        return (StatusCode::BAD_REQUEST, "Deployment name must be specified").into_response();
    };

    let mut config = (*state.config).clone();
    if let Some(tag) = non_empty(query.tag) {
        config.tag = Some(tag);
    }
    if let Some(tag) = non_empty(query.deployment_tag) {
        config.deployment_tag = Some(tag);
    }

    let factory = match Factory::with_tool(config, state.tool) {
        Ok(factory) => factory,
        Err(e) => return error_response(e),
    };

    tokio::spawn(async move {
        match factory.build_deployment(&name).await {
            Ok(_) => tracing::info!(deployment = %name, "Background deployment build finished"),
            Err(e) => {
                tracing::error!(deployment = %name, error = %e, "Background deployment build failed")
            }
        }
    });

    (StatusCode::OK, BUILD_STARTED).into_response()
}

async fn list_base_images(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let format = parse_format(query.format);
    let rendered = Factory::with_tool((*state.config).clone(), state.tool)
        .and_then(|factory| factory.image_inventory())
        .and_then(|inventory| inventory.render(format));
    render_response(format, rendered)
}

async fn list_deployments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let format = parse_format(query.format);
    let rendered = Factory::with_tool((*state.config).clone(), state.tool)
        .and_then(|factory| factory.deployment_inventory())
        .and_then(|inventory| inventory.render(format));
    render_response(format, rendered)
}

/// Unknown formats fall back to text.
fn parse_format(format: Option<String>) -> OutputFormat {
    format
        .and_then(|f| f.parse().ok())
        .unwrap_or_default()
}

fn render_response(format: OutputFormat, rendered: Result<String>) -> Response {
    match rendered {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, format.content_type())],
            body,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: container_factory_core::FactoryError) -> Response {
    tracing::error!(error = %e, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
