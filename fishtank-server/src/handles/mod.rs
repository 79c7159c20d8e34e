mod fish_handle;
mod task_handle;

pub use fish_handle::*;
pub use task_handle::*;

use axum::extract::rejection::FormRejection;
use axum::Form;

use crate::errors::{ApiError, TaskError};

/// Unwraps a form body, reporting a missing or malformed field as a bad request.
fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, ApiError> {
    form.map(|Form(body)| body)
        .map_err(|e| TaskError::InvalidParameter(e.body_text()).into())
}
