//! Domain types and models

pub mod auth;
pub mod body;
pub mod business;
pub mod deletion;
pub mod project;

pub use auth::{AdminPermissions, Credentials, LoginOutcome, UserInfo, UserProfile};
pub use body::ResponseBody;
pub use business::{
    BusinessFiles, BusinessStats, DashboardStats, DeliveryService, FileAttachment, NewBusiness,
    PageRequest, SalePlace, ValidationStatus,
};
pub use deletion::{
    deletion_requests, request_matches, DeletionQuery, DeletionStats, DeletionStatus,
};
pub use project::{NewProject, ProjectFilter, ProjectStatus, ProjectUpdate};
