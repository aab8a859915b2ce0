//! Core identifier types.
//!
//! - `UserId`: a person detected by the robot's camera
//! - `GestureId`: a named physical gesture the robot can perform

mod gesture_id;
mod user_id;

pub use gesture_id::{GestureId, InvalidGestureId};
pub use user_id::{InvalidUserId, UserId};
