use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec!["system".into()],
        }
    }

    pub fn new_guest() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec![],
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|x| x == role)
    }
}
