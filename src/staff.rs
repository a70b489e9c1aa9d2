//! Staff directory
//!
//! The lookup side of the staff store that authentication depends on:
//! find by email at login, find by id on refresh and auth checks, and a
//! password update for the change-password flow.

use crate::auth::{hash_password, Role};
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Staff record as held by the store
#[derive(Debug, Clone)]
pub struct StaffRecord {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub agent_id: String,
    pub profile_photo: String,
    pub position: String,
    pub department: String,
    pub role: Role,
    pub must_change_password: bool,
}

/// Profile returned to clients (never the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffProfile {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub agent_id: String,
    pub profile_photo: String,
    pub position: String,
    pub department: String,
    pub role: Role,
    pub must_change_password: bool,
}

impl From<&StaffRecord> for StaffProfile {
    fn from(staff: &StaffRecord) -> Self {
        Self {
            id: staff.id,
            first_name: staff.first_name.clone(),
            middle_name: staff.middle_name.clone(),
            last_name: staff.last_name.clone(),
            email: staff.email.clone(),
            agent_id: staff.agent_id.clone(),
            profile_photo: staff.profile_photo.clone(),
            position: staff.position.clone(),
            department: staff.department.clone(),
            role: staff.role,
            must_change_password: staff.must_change_password,
        }
    }
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<StaffRecord>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<StaffRecord>, AppError>;

    /// Replace the stored hash. Returns `NotFound` for an unknown id.
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;
}

/// In-memory staff directory
pub struct InMemoryStaffDirectory {
    staff: Arc<RwLock<HashMap<i64, StaffRecord>>>,
    email_index: Arc<RwLock<HashMap<String, i64>>>,
}

impl InMemoryStaffDirectory {
    pub fn new() -> Self {
        Self {
            staff: Arc::new(RwLock::new(HashMap::new())),
            email_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a record
    pub async fn insert(&self, record: StaffRecord) {
        let mut staff = self.staff.write().await;
        let mut email_index = self.email_index.write().await;

        if let Some(previous) = staff.get(&record.id) {
            email_index.remove(&previous.email);
        }
        email_index.insert(record.email.clone(), record.id);
        staff.insert(record.id, record);
    }

    /// Seed a single administrator account
    pub async fn seed_admin(&self, email: &str, password: &str, cost: u32) -> Result<(), AppError> {
        if self.find_by_email(email).await?.is_some() {
            info!("Admin account already exists; skipping seeding");
            return Ok(());
        }

        let next_id = self.staff.read().await.keys().max().copied().unwrap_or(0) + 1;
        self.insert(StaffRecord {
            id: next_id,
            first_name: "Admin".to_string(),
            middle_name: String::new(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password, cost)?,
            agent_id: "ADMIN001".to_string(),
            profile_photo: String::new(),
            position: "IT".to_string(),
            department: "Homeland Security".to_string(),
            role: Role::Admin,
            must_change_password: true,
        })
        .await;

        info!(email = %email, "Admin account seeded");
        Ok(())
    }
}

impl Default for InMemoryStaffDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StaffDirectory for InMemoryStaffDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<StaffRecord>, AppError> {
        let email_index = self.email_index.read().await;
        let staff = self.staff.read().await;

        Ok(email_index.get(email).and_then(|id| staff.get(id).cloned()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StaffRecord>, AppError> {
        Ok(self.staff.read().await.get(&id).cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut staff = self.staff.write().await;
        let record = staff
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        record.password_hash = password_hash.to_string();
        Ok(())
    }
}
