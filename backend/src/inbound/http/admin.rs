//! Admin surface: list and add short links.

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::domain::{
    DomainError, LinkValidationError, NewLink, Sentinel, ShortName, TargetUrl, UserName,
};

use super::cache_control::private_no_cache_header;
use super::{Outcome, RequestContext, admin_page};

/// Path of the admin page; successful submissions redirect back here.
pub const ADMIN_PATH: &str = "/_admin";

/// Form posted to the admin page. Missing fields read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminForm {
    /// Requested short name.
    pub name: String,
    /// Redirect target.
    pub url: String,
    /// Owner of the new link.
    pub user: String,
}

impl AdminForm {
    /// Fill fields the body left empty from the query string.
    ///
    /// # Examples
    /// ```
    /// use urlredir::inbound::http::admin::AdminForm;
    ///
    /// let body = AdminForm { name: "baz".into(), ..AdminForm::default() };
    /// let query = AdminForm { name: "ignored".into(), url: "http://example.com".into(), ..AdminForm::default() };
    /// let form = body.or_query(query);
    /// assert_eq!(form.name, "baz");
    /// assert_eq!(form.url, "http://example.com");
    /// ```
    pub fn or_query(self, query: Self) -> Self {
        fn pick(body: String, query: String) -> String {
            if body.is_empty() { query } else { body }
        }
        Self {
            name: pick(self.name, query.name),
            url: pick(self.url, query.url),
            user: pick(self.user, query.user),
        }
    }
}

/// Validate a submission.
///
/// Checks run in a fixed order so a form with several problems always
/// reports the same one: name, then URL presence, then URL syntax, then user.
///
/// # Examples
/// ```
/// use urlredir::domain::Sentinel;
/// use urlredir::inbound::http::admin::{AdminForm, validate_admin_form};
///
/// let err = validate_admin_form(&AdminForm::default()).unwrap_err();
/// assert_eq!(err.sentinel(), Some(Sentinel::MissingName));
/// ```
pub fn validate_admin_form(form: &AdminForm) -> Result<NewLink, DomainError> {
    let name = ShortName::new(form.name.as_str())
        .map_err(|_| DomainError::bad_request(Sentinel::MissingName))?;
    let target = TargetUrl::parse(&form.url).map_err(|err| match err {
        LinkValidationError::EmptyUrl => DomainError::bad_request(Sentinel::MissingUrl),
        _ => DomainError::bad_request(Sentinel::InvalidUrl),
    })?;
    let owner = UserName::new(form.user.as_str())
        .ok_or_else(|| DomainError::bad_request(Sentinel::MissingUser))?;
    Ok(NewLink {
        name,
        target,
        owner,
    })
}

/// `GET /_admin`: the caller's links.
pub async fn list(context: RequestContext) -> Outcome {
    Outcome::from_result(list_links(&context).await)
}

/// `POST /_admin`: register a link and go back to the list.
///
/// Fields may arrive in the urlencoded body or the query string; the body
/// wins where both are set.
pub async fn add(
    context: RequestContext,
    form: Option<web::Form<AdminForm>>,
    query: Option<web::Query<AdminForm>>,
) -> Outcome {
    let body = form.map(web::Form::into_inner).unwrap_or_default();
    let query = query.map(web::Query::into_inner).unwrap_or_default();
    Outcome::from_result(add_link(&context, &body.or_query(query)).await)
}

async fn list_links(context: &RequestContext) -> Result<HttpResponse, DomainError> {
    let handle = context.require_transaction()?;
    let identity = context.require_identity()?;
    let links = match identity.user_name() {
        Some(owner) => handle.lease().await?.list_mappings_for_user(owner).await?,
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .content_type(ContentType::html())
        .body(admin_page::render(identity, &links)))
}

async fn add_link(context: &RequestContext, form: &AdminForm) -> Result<HttpResponse, DomainError> {
    let handle = context.require_transaction()?;
    context.require_identity()?;
    let link = validate_admin_form(form)?;
    handle.lease().await?.insert_mapping(&link).await?;
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, ADMIN_PATH))
        .finish())
}
