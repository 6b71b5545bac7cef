//! Entity CRUD handlers: list, read, create, replace, patch, delete.

use crate::error::AppError;
use crate::response::{success_one, success_one_ok, success_page};
use crate::service::query::parse_with;
use crate::service::{CrudService, ListQuery};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::{Map, Value};

/// Non-integer ids can never match a row.
fn parse_id(service: &CrudService, id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::NotFound(format!("{} {}", service.entity().entity_name, id_str)))
}

fn body_to_map(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(m)) => Ok(m),
        _ => Err(AppError::BadRequest("Invalid JSON body".into())),
    }
}

/// A malformed body for a missing row reports the missing row.
async fn update_body(service: &CrudService, id: i64, body: &Bytes) -> Result<Map<String, Value>, AppError> {
    match body_to_map(body) {
        Ok(map) => Ok(map),
        Err(e) => {
            service.get(id, &[]).await?;
            Err(e)
        }
    }
}

fn with_param(params: &[(String, String)]) -> Vec<String> {
    parse_with(params.iter().find(|(k, _)| k == "with").map(|(_, v)| v.as_str()))
}

pub async fn list(
    State(service): State<CrudService>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::from_params(service.entity(), &params);
    let page = service.list(&query).await?;
    Ok(success_page(page.data, page.meta))
}

pub async fn read(
    State(service): State<CrudService>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&service, &id)?;
    let row = service.get(id, &with_param(&params)).await?;
    Ok(success_one_ok(row))
}

pub async fn create(
    State(service): State<CrudService>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(&body)?;
    let row = service.create(&body).await?;
    Ok(success_one(row))
}

pub async fn replace(
    State(service): State<CrudService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&service, &id)?;
    let body = update_body(&service, id, &body).await?;
    let row = service.replace(id, &body).await?;
    Ok(success_one_ok(row))
}

pub async fn patch(
    State(service): State<CrudService>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&service, &id)?;
    let body = update_body(&service, id, &body).await?;
    let row = service.patch(id, &body).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(service): State<CrudService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&service, &id)?;
    let deleted = service.delete(id).await?;
    Ok(success_one_ok(deleted))
}
