use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Teacher;

#[derive(Debug, Serialize)]
pub(crate) struct TeacherResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl TeacherResponse {
    pub(crate) fn from_db(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            email: teacher.email,
            full_name: teacher.full_name,
            is_active: teacher.is_active,
            created_at: format_primitive(teacher.created_at),
        }
    }
}
