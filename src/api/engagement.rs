//! Like and comment endpoints
//!
//! Both answer JSON to `Accept: application/json` clients and redirect back
//! to the artwork page otherwise.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::guard::{login_url, post_login_target};
use crate::api::middleware::{redirect_with_flash, wants_json, ApiError, AppState, Page};
use crate::models::RecordId;
use crate::services::{EngagementError, LikeState};
use crate::theme::Flash;

/// Where to land after a like; the artwork page when absent
#[derive(Debug, Default, Deserialize)]
pub struct LikeForm {
    #[serde(default)]
    pub return_to: Option<String>,
}

impl LikeForm {
    fn target(&self, id: &RecordId) -> String {
        match self.return_to.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => post_login_target(Some(path)),
            _ => artwork_path(id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeResponse {
    pub liked: bool,
    pub count: u64,
}

impl From<LikeState> for LikeResponse {
    fn from(state: LikeState) -> Self {
        Self {
            liked: state.liked,
            count: state.count,
        }
    }
}

fn artwork_path(id: &RecordId) -> String {
    format!("/gallery/{}", id)
}

fn login_required(json: bool, return_to: &str) -> Response {
    if json {
        ApiError::login_required(return_to).into_response()
    } else {
        Redirect::to(&login_url(return_to)).into_response()
    }
}

/// POST /gallery/{id}/like - Toggle the viewer's like
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    page: Page,
    form: Result<Form<LikeForm>, FormRejection>,
) -> Response {
    let id = RecordId::from(id);
    let json = wants_json(&headers);
    let form = form.map(|Form(form)| form).unwrap_or_default();

    match state.engagement.toggle_like(page.session.as_ref(), &id).await {
        Ok(next) => {
            tracing::debug!("Like on {} is now {:?}", id, next);
            if json {
                Json(LikeResponse::from(next)).into_response()
            } else {
                Redirect::to(&form.target(&id)).into_response()
            }
        }
        Err(EngagementError::LoginRequired { return_to }) => login_required(json, &return_to),
        Err(e) => {
            tracing::error!("Failed to toggle like on {}: {}", id, e);
            if json {
                ApiError::upstream_error(e.to_string()).into_response()
            } else {
                redirect_with_flash(&form.target(&id), Flash::error("Could not update your like."))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// POST /gallery/{id}/comments - Add a comment
pub async fn post_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    page: Page,
    Form(form): Form<CommentForm>,
) -> Response {
    let id = RecordId::from(id);
    let json = wants_json(&headers);

    match state.engagement.post_comment(page.session.as_ref(), &id, &form.text).await {
        Ok(comment) => {
            tracing::info!("Comment {} added to {}", comment.comment.id, id);
            if json {
                (StatusCode::CREATED, Json(comment)).into_response()
            } else {
                Redirect::to(&format!("{}#comments", artwork_path(&id))).into_response()
            }
        }
        Err(EngagementError::LoginRequired { return_to }) => login_required(json, &return_to),
        Err(EngagementError::EmptyComment) => {
            if json {
                ApiError::validation_error(EngagementError::EmptyComment.to_string()).into_response()
            } else {
                redirect_with_flash(&artwork_path(&id), Flash::error("Comment cannot be empty"))
            }
        }
        Err(e) => {
            tracing::error!("Failed to post comment on {}: {}", id, e);
            if json {
                ApiError::upstream_error(e.to_string()).into_response()
            } else {
                redirect_with_flash(&artwork_path(&id), Flash::error("Could not post your comment."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_returns_to_artwork_by_default() {
        let id = RecordId::from("42");
        assert_eq!(LikeForm::default().target(&id), "/gallery/42");

        let blank = LikeForm {
            return_to: Some("  ".into()),
        };
        assert_eq!(blank.target(&id), "/gallery/42");
    }

    #[test]
    fn test_like_returns_to_filtered_gallery() {
        let id = RecordId::from("42");
        let form = LikeForm {
            return_to: Some("/gallery?search=naga&category=mitologi&page=2".into()),
        };
        assert_eq!(form.target(&id), "/gallery?search=naga&category=mitologi&page=2");

        let foreign = LikeForm {
            return_to: Some("//evil.example".into()),
        };
        assert_eq!(foreign.target(&id), "/");
    }
}
