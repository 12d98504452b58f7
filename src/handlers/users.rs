use crate::error::AppError;
use crate::extractors::{AuthUser, Filtered, Pagination, Sorted, StaffUser, ValidatedJson};
use crate::handlers::{found, parse_id};
use crate::mapper::user::{self as user_mapper, AdminUpdateUserRequest, UpdateProfileRequest};
use crate::model::User;
use crate::response::{success_message, success_one_ok, success_page};
use crate::service::UserService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

pub async fn list(
    State(state): State<AppState>,
    _staff: StaffUser,
    page: Pagination,
    sort: Sorted<User>,
    filter: Filtered<User>,
) -> Result<impl IntoResponse, AppError> {
    let (users, total) = UserService::list(&state.pool, &filter.spec, &sort.spec, &page).await?;
    Ok(success_page(user_mapper::to_responses(&users), &page, total))
}

pub async fn me(State(state): State<AppState>, caller: AuthUser) -> Result<impl IntoResponse, AppError> {
    let user = found(UserService::find(&state.pool, caller.id).await?, "user")?;
    Ok(success_one_ok(user_mapper::to_response(Some(&user))))
}

pub async fn update_me(
    State(state): State<AppState>,
    caller: AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = found(UserService::update(&state.pool, caller.id, body.into_changes()).await?, "user")?;
    Ok(success_one_ok(user_mapper::to_response(Some(&user))))
}

pub async fn get(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    caller.require_self_or_staff(Some(id))?;
    let user = found(UserService::find(&state.pool, id).await?, "user")?;
    Ok(success_one_ok(user_mapper::to_response(Some(&user))))
}

pub async fn update(
    State(state): State<AppState>,
    StaffUser(caller): StaffUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    if body.role.is_some() {
        caller.require_user_manager()?;
    }
    let user = found(UserService::update(&state.pool, id, body.into_changes()).await?, "user")?;
    tracing::info!(user_id = %id, by = %caller.id, role = %user.role, "user updated");
    Ok(success_one_ok(user_mapper::to_response(Some(&user))))
}

pub async fn delete(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    caller.require_user_manager()?;
    if !UserService::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("user".into()));
    }
    tracing::info!(user_id = %id, by = %caller.id, "user deleted");
    Ok(success_message("user deleted"))
}
