//! The unified sign-in / sign-up form.
//!
//! Every submission is validated server-side with the schema that drives the
//! rendered fields. Failures re-render the form with the submit control
//! enabled, the non-secret values the user typed and the reason.

use super::{Pages, SharedPages};
use crate::{
    Error,
    api::handlers::{
        auth::{
            AuthRelay,
            session::{end_session, extract_session_secret, set_cookie_headers},
            types::{SignInRequest, SignUpRequest},
            validation::{AuthMode, Field, FieldSource, ValidationErrors, schema},
        },
        error::{log_error, status_for},
    },
};
use axum::{
    Form,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

/// Where a successful sign-up continues.
pub const AFTER_SIGN_UP: &str = "/link-bank";
/// Where a successful sign-in continues.
pub const AFTER_SIGN_IN: &str = "/";

#[derive(Serialize, Debug)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub input_type: &'static str,
    /// Always empty for secrets.
    pub value: String,
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct FormView {
    pub mode: AuthMode,
    pub title: &'static str,
    pub action: &'static str,
    pub fields: Vec<FieldView>,
    pub banner: Option<String>,
    pub loading: bool,
    pub switch_prompt: &'static str,
    pub switch_href: &'static str,
    pub switch_label: &'static str,
}

impl FormView {
    #[must_use]
    pub fn new(mode: AuthMode, values: &impl FieldSource, errors: Option<&ValidationErrors>) -> Self {
        let fields = schema(mode)
            .iter()
            .map(|rules| {
                let field = rules.field;
                FieldView {
                    name: field.name(),
                    label: field.label(),
                    placeholder: field.placeholder(),
                    input_type: input_type(field),
                    value: if field.is_secret() {
                        String::new()
                    } else {
                        values.value(field).to_string()
                    },
                    error: errors.and_then(|e| e.get(field)).map(str::to_string),
                }
            })
            .collect();
        let other = mode.other();
        Self {
            mode,
            title: mode.title(),
            action: mode.path(),
            fields,
            banner: None,
            loading: false,
            switch_prompt: match mode {
                AuthMode::SignIn => "Don't have an account?",
                AuthMode::SignUp => "Already have an account?",
            },
            switch_href: other.path(),
            switch_label: other.title(),
        }
    }

    #[must_use]
    pub fn with_banner(mut self, banner: String) -> Self {
        self.banner = Some(banner);
        self
    }

    /// Form view for a failed relay call.
    #[must_use]
    pub fn from_error(mode: AuthMode, values: &impl FieldSource, err: &Error) -> Self {
        match err {
            Error::Validation(errors) => Self::new(mode, values, Some(errors)),
            // the account exists; continue on the sign-in form
            Error::PartialSignUp { .. } => {
                Self::new(AuthMode::SignIn, values, None).with_banner(err.user_message())
            }
            _ => Self::new(mode, values, None).with_banner(err.user_message()),
        }
    }
}

fn input_type(field: Field) -> &'static str {
    match field {
        Field::Email => "email",
        Field::Password => "password",
        Field::DateOfBirth => "date",
        _ => "text",
    }
}

impl Pages {
    pub(crate) fn render_form(&self, status: StatusCode, view: &FormView) -> Response {
        self.render(status, "form.html", view)
    }
}

/// Render a relay failure that happened outside a form submission.
pub(crate) fn render_failure(pages: &Pages, err: &Error) -> Response {
    log_error(err);
    let view = FormView::from_error(AuthMode::SignIn, &SignInRequest::default(), err);
    pages.render_form(status_for(err.kind()), &view)
}

async fn show(mode: AuthMode, headers: &HeaderMap, relay: &AuthRelay, pages: &Pages) -> Response {
    // a valid session skips the form
    let secret = extract_session_secret(headers);
    if let Ok(Some(_)) = relay.logged_in_user(secret.as_ref()).await {
        return Redirect::to(AFTER_SIGN_IN).into_response();
    }
    let view = match mode {
        AuthMode::SignIn => FormView::new(mode, &SignInRequest::default(), None),
        AuthMode::SignUp => FormView::new(mode, &SignUpRequest::default(), None),
    };
    pages.render_form(StatusCode::OK, &view)
}

/// GET `/sign-in`
pub async fn sign_in_page(
    headers: HeaderMap,
    relay: Extension<AuthRelay>,
    pages: SharedPages,
) -> Response {
    show(AuthMode::SignIn, &headers, &relay, &pages).await
}

/// GET `/sign-up`
pub async fn sign_up_page(
    headers: HeaderMap,
    relay: Extension<AuthRelay>,
    pages: SharedPages,
) -> Response {
    show(AuthMode::SignUp, &headers, &relay, &pages).await
}

/// POST `/sign-in`
pub async fn sign_in_submit(
    relay: Extension<AuthRelay>,
    pages: SharedPages,
    Form(request): Form<SignInRequest>,
) -> Response {
    match relay.sign_in(&request).await {
        Ok(session) => match set_cookie_headers(&session.secret) {
            Ok(headers) => (headers, Redirect::to(AFTER_SIGN_IN)).into_response(),
            Err(response) => response,
        },
        Err(err) => {
            log_error(&err);
            let view = FormView::from_error(AuthMode::SignIn, &request, &err);
            pages.render_form(status_for(err.kind()), &view)
        }
    }
}

/// POST `/sign-up`
pub async fn sign_up_submit(
    relay: Extension<AuthRelay>,
    pages: SharedPages,
    Form(request): Form<SignUpRequest>,
) -> Response {
    match relay.sign_up(&request).await {
        Ok((_, session)) => match set_cookie_headers(&session.secret) {
            Ok(headers) => (headers, Redirect::to(AFTER_SIGN_UP)).into_response(),
            Err(response) => response,
        },
        Err(err) => {
            log_error(&err);
            let view = FormView::from_error(AuthMode::SignUp, &request, &err);
            pages.render_form(status_for(err.kind()), &view)
        }
    }
}

/// POST `/logout`
pub async fn logout(headers: HeaderMap, relay: Extension<AuthRelay>) -> Response {
    let response_headers = end_session(&headers, &relay).await;
    (response_headers, Redirect::to("/sign-in")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn sign_in_view_has_only_credentials() {
        let view = FormView::new(AuthMode::SignIn, &SignInRequest::default(), None);
        let names: Vec<&str> = view.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["email", "password"]);
        assert_eq!(view.switch_href, "/sign-up");
        assert!(!view.loading);
    }

    #[test]
    fn secrets_are_never_echoed() {
        let request = SignUpRequest {
            email: "a@b.com".to_string(),
            ssn: SecretString::from("123-45-6789".to_string()),
            password: SecretString::from("secret123".to_string()),
            ..SignUpRequest::default()
        };
        let view = FormView::new(AuthMode::SignUp, &request, None);
        for field in &view.fields {
            if field.name == "ssn" || field.name == "password" {
                assert!(field.value.is_empty());
            }
        }
        let email = view.fields.iter().find(|f| f.name == "email");
        assert_eq!(email.map(|f| f.value.as_str()), Some("a@b.com"));
    }

    #[test]
    fn partial_sign_up_moves_to_sign_in() {
        let request = SignUpRequest {
            email: "a@b.com".to_string(),
            ..SignUpRequest::default()
        };
        let err = Error::PartialSignUp {
            account_id: "acc-1".to_string(),
            source: Box::new(Error::Unavailable("timeout".to_string())),
        };
        let view = FormView::from_error(AuthMode::SignUp, &request, &err);
        assert_eq!(view.mode, AuthMode::SignIn);
        assert!(view.banner.is_some());
        assert_eq!(view.fields[0].value, "a@b.com");
    }

    async fn body(response: Response) -> anyhow::Result<String> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    #[tokio::test]
    async fn rendered_form_disables_submit_on_submit_only() -> anyhow::Result<()> {
        let pages = Pages::new()?;
        let view = FormView::new(AuthMode::SignIn, &SignInRequest::default(), None)
            .with_banner("Invalid email or password".to_string());
        let response = pages.render_form(StatusCode::UNAUTHORIZED, &view);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let html = body(response).await?;
        assert!(html.contains("onsubmit="));
        assert!(html.contains("b.disabled=true"));
        assert!(html.contains(r#"<button type="submit">Sign In</button>"#));
        assert!(html.contains("Invalid email or password"));

        let mut loading = FormView::new(AuthMode::SignIn, &SignInRequest::default(), None);
        loading.loading = true;
        let html = body(pages.render_form(StatusCode::OK, &loading)).await?;
        assert!(html.contains(r#"<button type="submit" disabled>Sign In</button>"#));
        Ok(())
    }
}
