use super::handlers::{auth, bank, health};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router for the JSON endpoints; it also drives the `OpenAPI` document.
///
/// HTML pages are mounted in [`super::app`] and stay undocumented.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::sign_in::sign_in))
        .routes(routes!(auth::sign_up::sign_up))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::session::user))
        .routes(routes!(bank::link_token))
        .routes(routes!(bank::exchange))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![
            tag("auth", "Sign-in, sign-up and session cookie"),
            tag("bank", "Link tokens and public-token exchange"),
            tag("health", "Build and backend information"),
        ]))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // authors are `;` separated, "Name <email>"
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end_matches('>'))),
        None => (non_empty(primary), None),
    };
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Horizon"));
            assert_eq!(contact.email.as_deref(), Some("team@horizon.finance"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_documents_json_endpoints_only() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "bank", "health"]);
        assert!(tags.iter().all(|tag| tag.description.is_some()));
        for path in [
            "/health",
            "/v1/auth/sign-in",
            "/v1/auth/sign-up",
            "/v1/auth/logout",
            "/v1/auth/user",
            "/v1/bank/link-token",
            "/v1/bank/exchange",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert!(!doc.paths.paths.contains_key("/sign-in"));
    }

    #[test]
    fn request_fields_are_optional_in_schema() {
        use utoipa::openapi::{RefOr, schema::Schema};

        let doc = openapi();
        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        for name in ["SignInRequest", "SignUpRequest", "ExchangeRequest"] {
            let Some(RefOr::T(Schema::Object(object))) = schemas.get(name) else {
                panic!("{name} is not documented as an object");
            };
            assert!(object.required.is_empty(), "{name} has required fields");
            assert!(object.properties.contains_key(
                if name == "ExchangeRequest" { "public_token" } else { "email" }
            ));
        }
    }
}
