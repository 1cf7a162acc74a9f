//! Redirect and delete handlers for `/{name}`.

use std::time::SystemTime;

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse, web};

use crate::domain::{DomainError, NewHit, Sentinel, ShortName, TargetUrl, parse_remote_ip};
use crate::middleware::real_ip::ClientAddr;

use super::admin_page::escape_html;
use super::cache_control::{private_redirect_header, redirect_expires};
use super::{Outcome, RequestContext};

/// Follow a short link: count the hit, record it and answer 301.
pub async fn redirect(
    req: HttpRequest,
    context: RequestContext,
    name: web::Path<String>,
) -> Outcome {
    Outcome::from_result(follow(&req, &context, name.into_inner()).await)
}

/// Remove a short link owned by the caller.
pub async fn delete(context: RequestContext, name: web::Path<String>) -> Outcome {
    Outcome::from_result(remove(&context, name.into_inner()).await)
}

async fn follow(
    req: &HttpRequest,
    context: &RequestContext,
    raw_name: String,
) -> Result<HttpResponse, DomainError> {
    let handle = context.require_transaction()?;
    let name = ShortName::new(raw_name).map_err(|_| DomainError::not_found())?;

    let mut tx = handle.lease().await?;
    let (target, link) = tx.lookup_and_increment_hit(&name).await?;
    let response = moved_permanently(&target, SystemTime::now());

    let remote = parse_remote_ip(&ClientAddr::of(req).unwrap_or_default())?;
    let hit = NewHit {
        link,
        remote,
        user_agent: header_text(req, &header::USER_AGENT).unwrap_or_default(),
        referrer: header_text(req, &header::REFERER).filter(|referrer| !referrer.is_empty()),
    };
    tx.record_hit(&hit).await?;
    Ok(response)
}

async fn remove(context: &RequestContext, raw_name: String) -> Result<HttpResponse, DomainError> {
    let handle = context.require_transaction()?;
    let caller = context
        .require_identity()?
        .user_name()
        .cloned()
        .ok_or_else(|| DomainError::bad_request(Sentinel::MissingUser))?;
    let name = ShortName::new(raw_name).map_err(|_| DomainError::not_found())?;

    let mut tx = handle.lease().await?;
    let (_, owner) = tx.lookup_owner(&name).await?;
    if owner != caller {
        return Err(DomainError::forbidden());
    }
    tx.delete_mapping(&name).await?;
    Ok(HttpResponse::Ok().finish())
}

fn moved_permanently(target: &TargetUrl, now: SystemTime) -> HttpResponse {
    HttpResponse::MovedPermanently()
        .insert_header(private_redirect_header())
        .insert_header(redirect_expires(now))
        .insert_header((header::LOCATION, target.as_str()))
        .content_type(ContentType::html())
        .body(format!(
            "<a href=\"{}\">Moved Permanently</a>.\n\n",
            escape_html(target.as_str())
        ))
}

fn header_text(req: &HttpRequest, name: &header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
