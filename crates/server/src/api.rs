use aimana_core::{ApplicationError, FormOptions, InterfaceError, QuoteRequest, SelectionResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bootstrap::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/options", get(options))
        .route("/predict", post(predict))
        .with_state(state)
}

async fn index() -> Json<Banner> {
    Json(Banner {
        message: "API for margin and conversion-rate prediction with discounted price \
                  suggestions. POST a quote to /predict."
            .to_string(),
    })
}

async fn options(State(state): State<AppState>) -> Json<FormOptions> {
    Json(state.history.form_options())
}

async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<SelectionResult>, ApiFailure> {
    let correlation_id = correlation_id(&headers);

    let Json(request) = payload.map_err(|rejection| {
        warn!(
            event_name = "api.predict.rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "quote request body rejected"
        );
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "bad_request".to_string(),
                message: rejection.body_text(),
                correlation_id: correlation_id.clone(),
            }),
        )
    })?;

    let product = request.product_description.clone();
    let task_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        task_state.optimizer.optimize(&request, &task_state.history)
    })
    .await;

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => {
            let class = error.class();
            let interface = ApplicationError::from(error).into_interface(correlation_id.clone());
            return Err(failure(interface, class, &product));
        }
        Err(join_error) => {
            let interface = InterfaceError::Internal {
                message: format!("optimization task failed: {join_error}"),
                correlation_id,
            };
            return Err(failure(interface, "task_join", &product));
        }
    };

    info!(
        event_name = "api.predict.completed",
        correlation_id = %correlation_id,
        product = %product,
        max_margin = result.max_margin,
        discounts = result.discounts.len(),
        "discount recommendation produced"
    );
    Ok(Json(result))
}

fn failure(interface: InterfaceError, class: &str, product: &str) -> ApiFailure {
    let status = status_for(&interface);
    if status.is_server_error() {
        error!(
            event_name = "api.predict.failed",
            correlation_id = %interface.correlation_id(),
            error_class = class,
            product = %product,
            error = %interface,
            "discount optimization failed"
        );
    } else {
        warn!(
            event_name = "api.predict.unresolved",
            correlation_id = %interface.correlation_id(),
            error_class = class,
            product = %product,
            error = %interface,
            "discount optimization produced no recommendation"
        );
    }

    // server-side detail stays in the logs
    let message = if status.is_server_error() {
        interface.user_message().to_string()
    } else {
        interface.message().to_string()
    };

    (
        status,
        Json(ApiError {
            error: interface.error_class().to_string(),
            message,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::NoFeasibleDiscount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ApiError, Banner, CORRELATION_HEADER};
    use crate::bootstrap::fixtures;

    fn app() -> Router {
        router(fixtures::state())
    }

    fn quote(product: &str, limite: f64) -> Value {
        json!({
            "limite": limite,
            "Year": 2025,
            "day_of_year": 168,
            "FaixaPeso": "0-50kg",
            "ProdutoFamilia": "TUBOS",
            "ProdutoDescricao": product,
            "ProdutoGrupoSOP": "TUBO CONDUCAO",
            "Canal": "INSIDE SALES",
            "EmpresaNome": "ACOTUBO SP",
            "ClienteCNPJCPF": "12345678000190",
            "nuPrecoGerenciaTotal": 1000.0,
        })
    }

    async fn post_predict(body: String, correlation_id: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json");
        if let Some(id) = correlation_id {
            builder = builder.header(CORRELATION_HEADER, id);
        }
        let response = app()
            .oneshot(builder.body(Body::from(body)).expect("request"))
            .await
            .expect("router responds");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn index_returns_the_service_banner() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let banner: Banner = serde_json::from_slice(&bytes).expect("banner json");
        assert!(banner.message.contains("/predict"));
    }

    #[tokio::test]
    async fn predict_returns_the_recommendation_under_wire_keys() {
        let (status, body) =
            post_predict(quote("TUBO CONDUCAO 1/2\" SCH40", 0.8).to_string(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Margem Máxima encontrada"], json!(8.0));
        assert_eq!(body["Conversion Rate encontrado"], json!(40.0));
        assert_eq!(body["Desconto(s) encontrado(s)"], json!([12.0]));
        assert_eq!(body["Preço original"], json!(1000.0));

        let prices: Vec<Decimal> =
            serde_json::from_value(body["Preço(s) encontrado(s)"].clone()).expect("prices");
        assert_eq!(prices, vec![Decimal::new(880, 0)]);
    }

    #[tokio::test]
    async fn unknown_product_is_404_with_correlation_id() {
        let (status, body) =
            post_predict(quote("VIGA W200", 0.8).to_string(), Some("req-404")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ApiError = serde_json::from_value(body).expect("error body");
        assert_eq!(error.error, "not_found");
        assert_eq!(error.correlation_id, "req-404");
        assert!(error.message.contains("VIGA W200"));
    }

    #[tokio::test]
    async fn unreachable_limit_is_422() {
        let (status, body) =
            post_predict(quote("TUBO CONDUCAO 1/2' SCH40", 1.0).to_string(), None).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], json!("no_feasible_discount"));
        assert!(!body["correlation_id"].as_str().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_limit_and_malformed_json_are_400() {
        let (status, body) =
            post_predict(quote("TUBO CONDUCAO 1/2' SCH40", 1.5).to_string(), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("bad_request"));

        let (status, body) = post_predict("{\"limite\": 0.8".to_string(), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("bad_request"));
    }

    #[tokio::test]
    async fn options_lists_distinct_form_values() {
        let response = app()
            .oneshot(Request::builder().uri("/options").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let options: Value = serde_json::from_slice(&bytes).expect("options json");
        assert_eq!(
            options["ProdutoDescricao"],
            json!(["CHAPA FINA 3MM", "TUBO CONDUCAO 1/2' SCH40"])
        );
        assert_eq!(options["Canal"], json!(["INSIDE SALES"]));
    }
}
