use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),
}

impl AccessError {
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::Forbidden(_) => "forbidden",
            AccessError::NotFound(_) => "not_found",
        }
    }
}

/// Resolved caller identity. Admins and moderators collapse into `AdminOverride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Teacher { teacher_id: i64 },
    Student { student_id: i64 },
    AdminOverride,
}

impl Role {
    /// Reads `{"role": ..., "teacherId"/"studentId": ...}`.
    pub fn from_json(caller: &Value) -> Result<Role, String> {
        let role = caller
            .get("role")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "caller.role is required".to_string())?;
        let id = |key: &str| {
            caller
                .get(key)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| format!("caller.{} is required for role {}", key, role))
        };
        match role {
            "admin" | "moderator" => Ok(Role::AdminOverride),
            "teacher" => Ok(Role::Teacher {
                teacher_id: id("teacherId")?,
            }),
            "student" => Ok(Role::Student {
                student_id: id("studentId")?,
            }),
            other => Err(format!("unknown caller role: {}", other)),
        }
    }

    fn is_staff(self) -> bool {
        matches!(self, Role::Teacher { .. } | Role::AdminOverride)
    }
}

pub fn can_access_student(role: Role, student_id: i64) -> Result<(), AccessError> {
    match role {
        Role::Student { student_id: own } if own != student_id => {
            Err(AccessError::Forbidden("students may only access their own records"))
        }
        Role::Student { .. } | Role::Teacher { .. } | Role::AdminOverride => Ok(()),
    }
}

pub fn can_view_teacher(role: Role, teacher_id: i64) -> Result<(), AccessError> {
    match role {
        Role::Student { .. } => Err(AccessError::Forbidden("teacher role required")),
        Role::Teacher { teacher_id: own } if own != teacher_id => Err(AccessError::Forbidden(
            "teachers may only view their own statistics",
        )),
        Role::Teacher { .. } | Role::AdminOverride => Ok(()),
    }
}

pub fn require_staff(role: Role) -> Result<(), AccessError> {
    if role.is_staff() {
        Ok(())
    } else {
        Err(AccessError::Forbidden("teacher role required"))
    }
}

pub fn require_admin(role: Role) -> Result<(), AccessError> {
    match role {
        Role::AdminOverride => Ok(()),
        Role::Teacher { .. } | Role::Student { .. } => {
            Err(AccessError::Forbidden("admin or moderator role required"))
        }
    }
}
