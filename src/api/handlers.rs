use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::logic::{
    self, validate, BatchImporter, CatalogError, SubtreeQuery,
};
use crate::model::{CatalogNode, HistoryRecord, Id, ImportRequest, NodeTree};
use crate::store::traits::CatalogStore;

pub type AppState<S> = Arc<S>;

type Rejection = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Map the core failure taxonomy to the externally visible signals. The
/// specific validation reason is logged, not leaked.
fn reject(error: CatalogError) -> Rejection {
    match error {
        CatalogError::Validation(reason) => {
            log::warn!("request rejected: {}", reason);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    code: 400,
                    message: "Validation Failed".to_string(),
                }),
            )
        }
        CatalogError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: 404,
                message: "Item not found".to_string(),
            }),
        ),
        CatalogError::Storage(error) => {
            log::error!("storage failure: {:#}", error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: 500,
                    message: "Internal Server Error".to_string(),
                }),
            )
        }
    }
}

/// Undecodable bodies and query strings are validation failures too, so
/// they get the same envelope instead of the framework's plain-text reply.
fn reject_body(rejection: JsonRejection) -> Rejection {
    reject(CatalogError::validation(rejection.to_string()))
}

fn reject_query(rejection: QueryRejection) -> Rejection {
    reject(CatalogError::validation(rejection.to_string()))
}

fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub price: Option<i64>,
    pub parent_id: Option<Id>,
    pub date: String,
}

impl From<&CatalogNode> for NodeResponse {
    fn from(node: &CatalogNode) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind.as_str(),
            price: node.kind.price(),
            parent_id: node.parent_id,
            date: format_date(node.updated_at),
        }
    }
}

impl From<&HistoryRecord> for NodeResponse {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: record.node_id,
            name: record.name.clone(),
            kind: record.kind.as_str(),
            price: record.kind.price(),
            parent_id: record.parent_id,
            date: format_date(record.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTreeResponse {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub price: Option<i64>,
    pub parent_id: Option<Id>,
    pub date: String,
    pub children: Option<Vec<NodeTreeResponse>>,
}

impl From<NodeTree> for NodeTreeResponse {
    fn from(tree: NodeTree) -> Self {
        Self {
            id: tree.id,
            name: tree.name,
            kind: tree.kind.as_str(),
            price: tree.kind.price(),
            parent_id: tree.parent_id,
            date: format_date(tree.updated_at),
            children: tree
                .children
                .map(|children| children.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct SalesParams {
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticParams {
    pub date_start: String,
    pub date_end: String,
}

pub async fn imports<S: CatalogStore>(
    State(store): State<AppState<S>>,
    body: Result<RequestJson<ImportRequest>, JsonRejection>,
) -> Result<StatusCode, Rejection> {
    let RequestJson(request) = body.map_err(reject_body)?;
    BatchImporter::run(store.as_ref(), request)
        .await
        .map_err(reject)?;
    Ok(StatusCode::OK)
}

pub async fn delete_node<S: CatalogStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let id = validate::parse_node_id(&id).map_err(reject)?;
    logic::delete_node(store.as_ref(), id).await.map_err(reject)?;
    Ok(StatusCode::OK)
}

pub async fn get_nodes<S: CatalogStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<NodeTreeResponse>, Rejection> {
    let id = validate::parse_node_id(&id).map_err(reject)?;
    let tree = SubtreeQuery::fetch(store.as_ref(), id)
        .await
        .map_err(reject)?;
    Ok(Json(tree.into()))
}

pub async fn sales<S: CatalogStore>(
    State(store): State<AppState<S>>,
    params: Result<Query<SalesParams>, QueryRejection>,
) -> Result<Json<ItemsResponse<NodeResponse>>, Rejection> {
    let Query(params) = params.map_err(reject_query)?;
    let date = validate::parse_timestamp(&params.date).map_err(reject)?;
    let offers = logic::sales_window(store.as_ref(), date)
        .await
        .map_err(reject)?;
    Ok(Json(ItemsResponse {
        items: offers.iter().map(Into::into).collect(),
    }))
}

pub async fn node_statistic<S: CatalogStore>(
    State(store): State<AppState<S>>,
    Path(id): Path<String>,
    params: Result<Query<StatisticParams>, QueryRejection>,
) -> Result<Json<ItemsResponse<NodeResponse>>, Rejection> {
    let Query(params) = params.map_err(reject_query)?;
    let id = validate::parse_node_id(&id).map_err(reject)?;
    let start = validate::parse_timestamp(&params.date_start).map_err(reject)?;
    let end = validate::parse_timestamp(&params.date_end).map_err(reject)?;
    let records = logic::node_statistic(store.as_ref(), id, start, end)
        .await
        .map_err(reject)?;
    Ok(Json(ItemsResponse {
        items: records.iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::create_router;
    use crate::store::memory::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        create_router::<MemoryStore>().with_state(Arc::new(MemoryStore::new()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn malformed_import_body_uses_the_error_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/imports")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "items": [{
                        "id": "069cb8d7-bbdd-47d3-ad8f-82ef4c269df1",
                        "name": "jPhone 13",
                        "type": "OFFER",
                        "price": "not-a-number"
                    }],
                    "updateDate": "2022-02-01T12:00:00.000Z"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "Validation Failed"})
        );
    }

    #[tokio::test]
    async fn missing_statistic_params_use_the_error_envelope() {
        let request = Request::builder()
            .uri("/node/069cb8d7-bbdd-47d3-ad8f-82ef4c269df1/statistic")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "Validation Failed"})
        );
    }

    #[tokio::test]
    async fn missing_sales_date_uses_the_error_envelope() {
        let request = Request::builder()
            .uri("/sales")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "Validation Failed"})
        );
    }

    #[tokio::test]
    async fn missing_node_is_reported_as_item_not_found() {
        let request = Request::builder()
            .uri("/nodes/069cb8d7-bbdd-47d3-ad8f-82ef4c269df1")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"code": 404, "message": "Item not found"})
        );
    }
}
