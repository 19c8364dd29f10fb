mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_exam))
        .route("/questions", post(handlers::generate_questions))
        .route("/quick-save", post(handlers::quick_save))
        .route("/:exam_id", get(handlers::get_exam).patch(handlers::update_exam))
        .route("/:exam_id/questions", post(handlers::add_question))
        .route("/questions/:question_id", put(handlers::update_question))
}
