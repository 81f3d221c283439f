//! Users, bridge projects and the legacy design-project records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::BridgeInput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    /// Explicit id, or `None` to generate one.
    pub id: Option<String>,
    pub username: String,
    pub password: String,
}

/// A bridge design derived from one uploaded parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeProject {
    pub id: String,
    pub name: String,
    pub user_id: Option<String>,
    /// Raw uploaded text.
    pub input_data: String,
    /// Validated parameters serialized as JSON.
    pub parameters: String,
    pub generated_drawing: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBridgeProject {
    pub name: String,
    pub user_id: Option<String>,
    pub input_data: String,
    pub parameters: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeParameters {
    pub id: String,
    pub project_id: String,
    pub scale1: f64,
    pub scale2: f64,
    pub skew: f64,
    pub datum: f64,
    pub toprl: f64,
    pub left: f64,
    pub right: f64,
    pub xincr: f64,
    pub yincr: f64,
    pub noch: i64,
}

impl BridgeParameters {
    pub fn from_input(id: String, project_id: &str, input: &BridgeInput) -> Self {
        Self {
            id,
            project_id: project_id.to_string(),
            scale1: input.scale1,
            scale2: input.scale2,
            skew: input.skew,
            datum: input.datum,
            toprl: input.toprl,
            left: input.left,
            right: input.right,
            xincr: input.xincr,
            yincr: input.yincr,
            noch: input.noch,
        }
    }

    /// Header values as a [`BridgeInput`] without cross-sections.
    pub fn to_input(&self) -> BridgeInput {
        BridgeInput {
            scale1: self.scale1,
            scale2: self.scale2,
            skew: self.skew,
            datum: self.datum,
            toprl: self.toprl,
            left: self.left,
            right: self.right,
            xincr: self.xincr,
            yincr: self.yincr,
            noch: self.noch,
            cross_sections: Vec::new(),
        }
    }
}

/// Ground level at one chainage of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCrossSection {
    pub id: String,
    pub project_id: String,
    pub chainage: f64,
    pub level: f64,
    /// Position of the pair in the uploaded file, starting at 0.
    pub sequence: u32,
}

/// Free-form project record served by the `/api/projects` routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parameters: serde_json::Value,
    pub cross_section_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDesignProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
    #[serde(default = "empty_array")]
    pub cross_section_data: serde_json::Value,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

/// Partial update for a design project; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub cross_section_data: Option<serde_json::Value>,
}

impl DesignProjectPatch {
    pub fn apply(&self, project: &mut DesignProject) {
        if let Some(ref name) = self.name {
            project.name = name.clone();
        }
        if let Some(ref description) = self.description {
            project.description = Some(description.clone());
        }
        if let Some(ref parameters) = self.parameters {
            project.parameters = parameters.clone();
        }
        if let Some(ref data) = self.cross_section_data {
            project.cross_section_data = data.clone();
        }
        project.updated_at = Utc::now();
    }
}
