pub mod infrastructure;
pub mod pipeline_logger;
pub mod recognize_emotions_use_case;
