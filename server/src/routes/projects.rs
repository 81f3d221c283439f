use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use gadbatch::model::{
    BridgeCrossSection, BridgeParameters, BridgeProject, DesignProject, DesignProjectPatch,
    NewBridgeProject, NewDesignProject,
};
use gadbatch::parser::DrawingConstants;
use gadbatch::BridgeInput;

use crate::error::{ApiError, ApiResult};
use crate::routes::blocking;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBridgeProjectRequest {
    pub name: String,
    pub input_data: String,
    /// Either a JSON string or any JSON value, stored as text.
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeProjectDetail {
    pub project: BridgeProject,
    pub parameters: Option<BridgeParameters>,
    pub cross_sections: Vec<BridgeCrossSection>,
    pub drawing_constants: Option<DrawingConstants>,
}

// GET /api/bridge/projects
pub async fn list_bridge_projects(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BridgeProject>>> {
    let projects = blocking(&state, |state| {
        Ok(state.store.list_bridge_projects(&state.default_user_id)?)
    })
    .await?;
    Ok(Json(projects))
}

// POST /api/bridge/projects
pub async fn create_bridge_project(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateBridgeProjectRequest>, JsonRejection>,
) -> ApiResult<Json<BridgeProject>> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("Rejected project body: {}", e);
        ApiError::bad_request("Invalid project data")
    })?;

    let parameters = match request.parameters {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    let project = blocking(&state, move |state| {
        Ok(state.store.create_bridge_project(NewBridgeProject {
            name: request.name,
            user_id: Some(state.default_user_id.clone()),
            input_data: request.input_data,
            parameters,
        })?)
    })
    .await?;
    Ok(Json(project))
}

// GET /api/bridge/projects/:id
pub async fn get_bridge_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BridgeProjectDetail>> {
    let detail = blocking(&state, move |state| {
        let project = state
            .store
            .get_bridge_project(&id)?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
        let parameters = state.store.get_bridge_parameters(&project.id)?;
        let cross_sections = state.store.list_cross_sections(&project.id)?;
        let drawing_constants = drawing_constants(&project, parameters.as_ref());
        Ok(BridgeProjectDetail {
            project,
            parameters,
            cross_sections,
            drawing_constants,
        })
    })
    .await?;
    Ok(Json(detail))
}

/// Prefers the stored parameter JSON, then the parameter record.
fn drawing_constants(
    project: &BridgeProject,
    parameters: Option<&BridgeParameters>,
) -> Option<DrawingConstants> {
    serde_json::from_str::<BridgeInput>(&project.parameters)
        .ok()
        .or_else(|| parameters.map(BridgeParameters::to_input))
        .map(|input| input.drawing_constants())
}

// GET /api/projects
pub async fn list_design_projects(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<DesignProject>>> {
    let projects = blocking(&state, |state| Ok(state.store.list_design_projects()?)).await?;
    Ok(Json(projects))
}

// GET /api/projects/:id
pub async fn get_design_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DesignProject>> {
    blocking(&state, move |state| {
        state
            .store
            .get_design_project(&id)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Project not found"))
    })
    .await
}

// POST /api/projects
pub async fn create_design_project(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewDesignProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DesignProject>)> {
    let Json(new) = payload.map_err(|e| {
        tracing::debug!("Rejected design project body: {}", e);
        ApiError::bad_request("Invalid data")
    })?;
    let project = blocking(&state, move |state| {
        Ok(state.store.create_design_project(new)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

// PATCH /api/projects/:id
pub async fn update_design_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<DesignProjectPatch>, JsonRejection>,
) -> ApiResult<Json<DesignProject>> {
    let Json(patch) = payload.map_err(|e| {
        tracing::debug!("Rejected design project patch: {}", e);
        ApiError::bad_request("Invalid data")
    })?;
    blocking(&state, move |state| {
        state
            .store
            .update_design_project(&id, &patch)?
            .map(Json)
            .ok_or_else(|| ApiError::not_found("Project not found"))
    })
    .await
}

// DELETE /api/projects/:id
pub async fn delete_design_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = blocking(&state, move |state| {
        Ok(state.store.delete_design_project(&id)?)
    })
    .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Project not found"))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{app, send, send_json};

    const VALID: &str = "100\n50\n0\n100\n105\n0\n50\n5\n1\n11\n0\n101.5\n5\n101.2\n";

    #[tokio::test]
    async fn test_create_and_list_bridge_projects() {
        let (app, _) = app();

        let (status, project) = send_json(
            &app,
            Method::POST,
            "/api/bridge/projects",
            Some(json!({
                "name": "Span A",
                "inputData": "raw text",
                "parameters": { "scale1": 100 },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(project["name"], "Span A");
        assert_eq!(project["userId"], "dummy-user");
        assert_eq!(project["parameters"], r#"{"scale1":100}"#);

        let (_, projects) = send_json(&app, Method::GET, "/api/bridge/projects", None).await;
        assert_eq!(projects.as_array().unwrap().len(), 1);
        assert_eq!(projects[0]["id"], project["id"]);
    }

    #[tokio::test]
    async fn test_create_bridge_project_rejects_bad_body() {
        let (app, _) = app();

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/bridge/projects",
            Some(json!({ "name": "Span A" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid project data");
    }

    #[tokio::test]
    async fn test_uploaded_project_detail() {
        let (app, _) = app();

        let (_, upload) = send_json(
            &app,
            Method::POST,
            "/api/bridge/batch-upload",
            Some(json!({
                "files": [{ "name": "span_a.txt", "content": VALID, "size": VALID.len() }]
            })),
        )
        .await;
        let project_id = upload["jobFiles"][0]["projectId"].as_str().unwrap();

        let (status, detail) = send_json(
            &app,
            Method::GET,
            &format!("/api/bridge/projects/{}", project_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["project"]["name"], "span_a");
        assert_eq!(detail["parameters"]["noch"], 11);
        assert_eq!(detail["crossSections"].as_array().unwrap().len(), 2);
        assert_eq!(detail["crossSections"][1]["level"], 101.2);
        assert_eq!(detail["drawingConstants"]["sc"], 2.0);
        assert_eq!(detail["drawingConstants"]["cos"], 1.0);
    }

    #[tokio::test]
    async fn test_bridge_project_not_found() {
        let (app, _) = app();
        let (status, body) =
            send_json(&app, Method::GET, "/api/bridge/projects/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project not found");
    }

    #[tokio::test]
    async fn test_design_project_lifecycle() {
        let (app, _) = app();

        let (status, created) = send_json(
            &app,
            Method::POST,
            "/api/projects",
            Some(json!({ "name": "Span A", "parameters": { "skew": 15 } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["crossSectionData"], json!([]));
        let uri = format!("/api/projects/{}", created["id"].as_str().unwrap());

        let (status, fetched) = send_json(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Span A");

        let (status, patched) = send_json(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "description": "left bank" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["name"], "Span A");
        assert_eq!(patched["description"], "left bank");

        let (_, all) = send_json(&app, Method::GET, "/api/projects", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = send_json(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send_json(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_design_project_validation() {
        let (app, _) = app();

        let (status, body) = send_json(
            &app,
            Method::POST,
            "/api/projects",
            Some(json!({ "description": "no name" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid data");

        let (status, _) = send_json(
            &app,
            Method::PATCH,
            "/api/projects/missing",
            Some(json!({ "name": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
