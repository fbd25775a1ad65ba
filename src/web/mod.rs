pub mod handlers;
pub mod middleware;
pub mod extractors;
pub mod ui;

use crate::{classify::ClassifyPipeline, Config, Result};
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};

/// 处理器之间共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ClassifyPipeline>,
}

pub async fn serve(config: Config) -> Result<()> {
    // 初始化核心流水线（存储 + 模型注册表）
    let pipeline = Arc::new(ClassifyPipeline::new(config.clone())?);
    tracing::info!("Configured models: {:?}", pipeline.list_models());

    let state = AppState {
        config: config.clone(),
        pipeline,
    };

    // 构建应用路由
    let app = create_app(state);

    // 解析绑定地址
    let addr: SocketAddr = config.bind_addr
        .parse()
        .map_err(|e| crate::utils::error::ClassifyError::Config(
            format!("Invalid bind address {}: {}", config.bind_addr, e)
        ))?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /                     - Web UI");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  GET  /api/info             - Models and images");
    tracing::info!("  GET  /api/images/:id       - Raw image content");
    tracing::info!("  POST /api/classifications  - Classify a stored image");
    tracing::info!("  POST /api/editor           - Edit (and optionally classify) an image");
    tracing::info!("  POST /api/upload           - Multipart file upload");
    tracing::info!("  POST /api/upload/base64    - JSON base64 upload");

    // 启动服务器
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| crate::utils::error::ClassifyError::Internal(
            format!("Failed to bind to address {}: {}", addr, e)
        ))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::utils::error::ClassifyError::Internal(
            format!("Server failed to start: {}", e)
        ))?;

    Ok(())
}

fn create_app(state: AppState) -> Router {
    Router::new()
        // 分类API路由
        .route("/api/info", get(handlers::info_handler))
        .route("/api/images/:image_id", get(handlers::image_handler))
        .route("/api/classifications", post(handlers::classify_handler))
        .route("/api/editor", post(handlers::edit_handler))
        .route("/api/upload", post(handlers::upload_handler))
        .route("/api/upload/base64", post(handlers::upload_base64_handler))

        // Web UI路由
        .route("/", get(ui::index_handler))

        // 系统路由
        .route("/health", get(health_handler))

        // 添加中间件 - 使用分层模式避免复杂类型嵌套
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(RequestBodyLimitLayer::new(state.config.server_config.max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.server_config.request_timeout)))
        .layer(CorsLayer::permissive())
        // 传递状态到处理器
        .with_state(state)
}

/// 健康检查端点
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
