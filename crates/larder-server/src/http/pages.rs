use crate::http::handlers::{finalize_response, propagated_request_id, run_store};
use crate::{session, AppState};
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use larder_model::{FoodItem, RawMaterial, Role};
use serde::Deserialize;
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    password: String,
}

fn html_response(status: StatusCode, html: String) -> Response {
    let mut resp = Response::new(Body::from(html));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    resp
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_login_page(error: Option<&str>) -> String {
    let notice = match error {
        Some(msg) => format!("<p class=\"error\">{}</p>\n", escape_html(msg)),
        None => String::new(),
    };
    format!(
        "<!doctype html>\n<html>\n<head><title>Larder</title></head>\n<body>\n\
         <h1>Larder sign-in</h1>\n{notice}\
         <form method=\"post\" action=\"/login\">\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" autofocus>\n\
         <button type=\"submit\">Sign in</button>\n\
         </form>\n</body>\n</html>\n"
    )
}

fn render_dashboard_page(role: Role, raw: &[RawMaterial], food: &[FoodItem]) -> String {
    let mut raw_rows = String::new();
    for item in raw {
        raw_rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&item.name),
            item.quantity,
            escape_html(&item.unit),
            escape_html(&item.last_updated)
        ));
    }
    let mut food_rows = String::new();
    for item in food {
        food_rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&item.name),
            item.quantity,
            escape_html(&item.category),
            escape_html(&item.last_updated)
        ));
    }
    format!(
        "<!doctype html>\n<html>\n<head><title>Larder dashboard</title></head>\n<body>\n\
         <h1>Larder dashboard</h1>\n\
         <p>Signed in as {} | <a href=\"/logout\">Log out</a></p>\n\
         <h2>Raw materials</h2>\n\
         <table>\n<tr><th>Name</th><th>Quantity</th><th>Unit</th><th>Last updated</th></tr>\n\
         {raw_rows}</table>\n\
         <h2>Food items</h2>\n\
         <table>\n<tr><th>Name</th><th>Quantity</th><th>Category</th><th>Last updated</th></tr>\n\
         {food_rows}</table>\n\
         </body>\n</html>\n",
        role.as_str()
    )
}

fn caller_role(state: &AppState, headers: &HeaderMap) -> Option<Role> {
    session::role_from_headers(
        headers,
        state.config.session_secret.as_bytes(),
        session::unix_now_secs(),
    )
}

pub(crate) async fn landing_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = if caller_role(&state, &headers).is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Redirect::to("/login").into_response()
    };
    finalize_response(&state, "/", started, &request_id, resp).await
}

pub(crate) async fn login_form_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = html_response(StatusCode::OK, render_login_page(None));
    finalize_response(&state, "/login", started, &request_id, resp).await
}

pub(crate) async fn login_submit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let role = if form.password == state.config.admin_password {
        Some(Role::Admin)
    } else if form.password == state.config.user_password {
        Some(Role::User)
    } else {
        None
    };
    let resp = match role {
        Some(role) => {
            match session::issue_session_cookie(
                role,
                state.config.session_secret.as_bytes(),
                session::unix_now_secs(),
                state.config.session_ttl.as_secs(),
            ) {
                Ok(cookie) => {
                    info!(
                        target: "larder_audit",
                        request_id = %request_id,
                        role = role.as_str(),
                        "login succeeded"
                    );
                    let mut resp = Redirect::to("/dashboard").into_response();
                    if let Ok(v) = HeaderValue::from_str(&cookie) {
                        resp.headers_mut().insert("set-cookie", v);
                    }
                    resp
                }
                Err(e) => {
                    error!("session issue failed: {e}");
                    html_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        render_login_page(Some("internal error")),
                    )
                }
            }
        }
        None => {
            warn!(target: "larder_audit", request_id = %request_id, "login failed");
            html_response(
                StatusCode::UNAUTHORIZED,
                render_login_page(Some("Invalid password")),
            )
        }
    };
    finalize_response(&state, "/login", started, &request_id, resp).await
}

pub(crate) async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    info!(target: "larder_audit", request_id = %request_id, "logout");
    let mut resp = Redirect::to("/login").into_response();
    if let Ok(v) = HeaderValue::from_str(&session::clear_session_cookie()) {
        resp.headers_mut().insert("set-cookie", v);
    }
    finalize_response(&state, "/logout", started, &request_id, resp).await
}

pub(crate) async fn dashboard_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let Some(role) = caller_role(&state, &headers) else {
        let resp = Redirect::to("/login").into_response();
        return finalize_response(&state, "/dashboard", started, &request_id, resp).await;
    };
    let raw = run_store(&state, |store| store.list_raw_materials()).await;
    let food = run_store(&state, |store| store.list_food_items()).await;
    let resp = match (raw, food) {
        (Ok(raw), Ok(food)) => {
            html_response(StatusCode::OK, render_dashboard_page(role, &raw, &food))
        }
        _ => html_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<!doctype html>\n<html><body><p>internal error</p></body></html>\n".to_string(),
        ),
    };
    finalize_response(&state, "/dashboard", started, &request_id, resp).await
}
