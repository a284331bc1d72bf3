//! HTTP API exposed to the presentation layer

pub mod error;
pub mod health;
pub mod media;
pub mod session;
pub mod steps;

pub use error::ApiError;
pub use health::{health_check, health_routes};
pub use media::item_audio;
pub use session::{create_participant, resume_session};
pub use steps::{
    confirm_step, current_step, list_steps, reveal_item, submit_calibration, submit_item_responses,
    submit_screening,
};
