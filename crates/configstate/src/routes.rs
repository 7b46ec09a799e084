// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions for the services API.

use crate::entity::Service;
use crate::respond;
use crate::store::SnapshotStore;
use axum::{extract::State, response::Response, routing::get, Router};
use serde::Serialize;

/// List-services route.
pub const SERVICES_PATH: &str = "/services";

#[derive(Serialize)]
struct ServiceList<'a> {
    services: &'a [Service],
}

/// Services routes, bound to `store`.
pub fn service_routes<S>(store: SnapshotStore) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(SERVICES_PATH, get(list_services))
        .with_state(store)
}

/// GET /services
async fn list_services(State(store): State<SnapshotStore>) -> Response {
    let snapshot = store.snapshot();
    respond::objects(&ServiceList {
        services: &snapshot,
    })
}
