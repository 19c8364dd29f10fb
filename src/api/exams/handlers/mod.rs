mod create;
mod manage;
mod questions;

pub(super) use create::{create_exam, generate_questions, quick_save};
pub(super) use manage::{get_exam, update_exam};
pub(super) use questions::{add_question, update_question};
