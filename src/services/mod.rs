pub(crate) mod distribution;
pub(crate) mod errors;
pub(crate) mod exam_commands;
pub(crate) mod exam_queries;
pub(crate) mod question_generation;
pub(crate) mod question_rules;
pub(crate) mod quick_save;
