//! Community project submissions
//!
//! The project endpoints speak Spanish field names on the wire; the Rust side
//! keeps English names and maps them with serde.

use serde::{Deserialize, Serialize};

use crate::errors::{CivicDeskError, Result};
use crate::impl_domain_status_conversions;

/// Lifecycle of a submitted project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "aprobado")]
    Approved,
    #[serde(rename = "rechazado")]
    Rejected,
    #[serde(rename = "en-progreso")]
    InProgress,
    #[serde(rename = "completado")]
    Completed,
}

impl_domain_status_conversions!(ProjectStatus {
    Pending => "pendiente",
    Approved => "aprobado",
    Rejected => "rechazado",
    InProgress => "en-progreso",
    Completed => "completado",
});

impl ProjectStatus {
    /// Lenient parse over the English and Spanish spellings the backend
    /// emits. Unknown or missing values are pending.
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("approved" | "aprobado") => Self::Approved,
            Some("rejected" | "rechazado") => Self::Rejected,
            Some("in-progress" | "en-progreso" | "progress" | "progreso") => Self::InProgress,
            Some("completed" | "completado" | "finished" | "terminado") => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// Submission payload for a new project
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewProject {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "responsable", skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(rename = "presupuesto", skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cedula: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), ..Self::default() }
    }

    /// # Errors
    /// Returns `CivicDeskError::InvalidInput` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CivicDeskError::InvalidInput("nombre is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(CivicDeskError::InvalidInput("descripcion is required".into()));
        }
        if self.budget.is_some_and(|budget| !budget.is_finite() || budget < 0.0) {
            return Err(CivicDeskError::InvalidInput(
                "presupuesto must be a positive amount".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update; only the fields that are set are sent
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "responsable", skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(rename = "presupuesto", skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProjectUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.responsible.is_none()
            && self.budget.is_none()
            && self.category.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

/// Page plus the optional filters of the project listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFilter {
    pub page: u32,
    pub size: u32,
    pub status: Option<ProjectStatus>,
    pub search: Option<String>,
}

impl Default for ProjectFilter {
    fn default() -> Self {
        Self { page: 0, size: 10, status: None, search: None }
    }
}

impl ProjectFilter {
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size, status: None, search: None }
    }

    #[must_use]
    pub const fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Blank search terms are left out.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_normalize_aliases() {
        assert_eq!(ProjectStatus::normalize(Some("APPROVED")), ProjectStatus::Approved);
        assert_eq!(ProjectStatus::normalize(Some("progreso")), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::normalize(Some("terminado")), ProjectStatus::Completed);
        assert_eq!(ProjectStatus::normalize(Some("archivado")), ProjectStatus::Pending);
        assert_eq!(ProjectStatus::normalize(None), ProjectStatus::Pending);
        assert_eq!(ProjectStatus::InProgress.to_string(), "en-progreso");
    }

    #[test]
    fn test_new_project_wire_names() {
        let project = NewProject {
            budget: Some(1500.0),
            phone: Some("0991234567".into()),
            ..NewProject::new("Huerto comunitario", "Parcela en el barrio norte")
        };
        let value = serde_json::to_value(&project).unwrap();

        assert_eq!(value["nombre"], json!("Huerto comunitario"));
        assert_eq!(value["descripcion"], json!("Parcela en el barrio norte"));
        assert_eq!(value["presupuesto"], json!(1500.0));
        assert_eq!(value["telefono"], json!("0991234567"));
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_new_project_validation() {
        assert!(NewProject::new("Huerto", "Parcela").validate().is_ok());
        assert_eq!(
            NewProject::new(" ", "Parcela").validate(),
            Err(CivicDeskError::InvalidInput("nombre is required".into()))
        );
        let negative = NewProject { budget: Some(-1.0), ..NewProject::new("Huerto", "Parcela") };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_update_sends_only_set_fields() {
        assert!(ProjectUpdate::default().is_empty());

        let update =
            ProjectUpdate { description: Some("Nueva fase".into()), ..ProjectUpdate::default() };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"descripcion": "Nueva fase"}));
    }

    #[test]
    fn test_filter_query_pairs() {
        let filter =
            ProjectFilter::new(1, 20).with_status(ProjectStatus::Approved).with_search("  ");
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("page", "1".to_string()),
                ("size", "20".to_string()),
                ("status", "aprobado".into())
            ]
        );
    }
}
