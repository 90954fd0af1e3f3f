use utoipa::OpenApi;
use utoipa::openapi::{Contact, InfoBuilder, License};

use super::handlers;

/// Registry of documented routes and schemas.
///
/// Add new endpoints here so the generated document and the served router
/// stay in step; `/openapi.json` and the `openapi` binary both render it.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::login::login,
        handlers::logout::logout,
        handlers::profile::get_profile,
        handlers::profile::update_profile,
        handlers::delete_account::delete_account,
        handlers::roles::list_roles,
        handlers::elements::list_elements,
        handlers::business_data::business_data,
    ),
    components(schemas(
        handlers::MessageResponse,
        handlers::health::Health,
        handlers::register::RegisterRequest,
        handlers::register::RegisterResponse,
        handlers::login::LoginRequest,
        handlers::login::LoginUser,
        handlers::login::LoginResponse,
        handlers::profile::ProfileResponse,
        handlers::profile::UpdateProfileRequest,
        handlers::roles::RoleResponse,
        handlers::elements::ElementResponse,
        handlers::business_data::BusinessDataResponse,
    )),
    tags(
        (name = "accounts", description = "Registration and profile lifecycle"),
        (name = "auth", description = "Login, logout, and sessions"),
        (name = "access", description = "Authorization-gated resources"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Rajtigi"));
            assert_eq!(contact.email.as_deref(), Some("team@rajtigi.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Rajtigi <team@rajtigi.dev>"),
            (Some("Team Rajtigi"), Some("team@rajtigi.dev"))
        );
        assert_eq!(parse_author("Only Name"), (Some("Only Name"), None));
        assert_eq!(
            parse_author("<only@email.dev>"),
            (None, Some("only@email.dev"))
        );
    }
}
