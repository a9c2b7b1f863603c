//! Wrappers around axum's extractors whose rejections go through `AppError`,
//! so malformed requests get a 400 with a JSON error body.

use crate::errors::AppError;
use axum::extract::{FromRequest, FromRequestParts, Path, Query};

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
