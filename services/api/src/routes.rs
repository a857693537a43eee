//! API service routes

use auth::{LoginCredentials, NewUser, UserProfile};
use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info};

use crate::{
    config::CorsOrigins,
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        DataResponse, HealthResponse, LoginResponse, MessageResponse, ProductInput, ProductQuery,
        RegisterResponse,
    },
    state::AppState,
};

/// Create the router for the API service.
///
/// Everything is mounted under `api_prefix`; `/health` is also served at
/// the root for load balancers. CORS wraps the whole router so preflight
/// requests are answered before authentication.
pub fn create_router(state: AppState, api_prefix: &str, cors_origins: CorsOrigins) -> Router {
    let protected_routes = Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/export/csv", get(export_csv))
        .route("/barcode/:sku", get(barcode))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .merge(protected_routes);

    let prefix = api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        api_routes
    } else {
        Router::new()
            .route("/health", get(health_check))
            .nest(prefix, api_routes)
    };

    router.with_state(state).layer(cors_layer(cors_origins))
}

/// Browser access policy for the web frontend
pub fn cors_layer(origins: CorsOrigins) -> CorsLayer {
    // Credentials forbid a literal `*`, so any-origin echoes the caller
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::mirror_request(),
        CorsOrigins::List(list) => AllowOrigin::list(list),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_LENGTH])
        .allow_credentials(true)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Warehouse Management API is running".to_string(),
    })
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(credentials) = payload?;

    let user = state.users.authenticate(&credentials).await?;
    let token = state.jwt.issue(user.id, &user.username)?;

    Ok(Json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(new_user) = payload?;

    let user = state.users.register(&new_user).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserProfile::from(&user),
        }),
    ))
}

/// List products, optionally filtered by status or low stock
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let filter = query.into_filter().map_err(ApiError::Validation)?;

    let products = state.products.list(filter).await?;

    Ok(Json(DataResponse { data: products }))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;
    let product = state.products.get(id).await?;

    Ok(Json(DataResponse { data: product }))
}

/// Create a new product
pub async fn create_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload?;

    let product = state.products.create(&input).await?;
    info!(user_id = user.id, product_id = product.id, "Product created via API");

    Ok((StatusCode::CREATED, Json(DataResponse { data: product })))
}

/// Replace a product's fields
pub async fn update_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;
    let Json(input) = payload?;

    let product = state.products.update(id, &input).await?;
    info!(user_id = user.id, product_id = product.id, "Product updated via API");

    Ok(Json(DataResponse { data: product }))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = product_id(id)?;

    state.products.delete(id).await?;
    info!(user_id = user.id, product_id = id, "Product deleted via API");

    Ok(Json(MessageResponse {
        message: "Product deleted successfully".to_string(),
    }))
}

/// Dashboard statistics
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = state.reports.dashboard_stats().await?;

    Ok(Json(stats))
}

/// Download every product as a CSV attachment
pub async fn export_csv(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let csv = state.reports.export_csv().await?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=products.csv"),
            ),
        ],
        csv,
    ))
}

/// Render a Code 128 barcode for a SKU
pub async fn barcode(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let png = state.reports.barcode_png(&sku)?;

    let disposition = HeaderValue::from_str(&format!("inline; filename=barcode-{}.png", sku))
        .map_err(|e| {
            error!("Failed to build Content-Disposition header: {}", e);
            ApiError::Internal
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    ))
}

/// Non-numeric ids can never name a product
fn product_id(id: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Product not found".to_string()))
}
