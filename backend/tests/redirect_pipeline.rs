//! End-to-end behaviour of the admin and redirect routes over the in-memory
//! store.

use std::sync::Arc;

use actix_http::Request;
use actix_web::{
    App,
    body::BoxBody,
    dev::{Service, ServiceResponse},
    http::{StatusCode, header},
    test::{self, TestRequest},
};
use futures_util::future::join_all;
use rstest::{fixture, rstest};
use urlredir::domain::Identity;
use urlredir::inbound::http::router::{Pipeline, configure};
use urlredir::middleware::IdentitySource;
use urlredir::outbound::InMemoryTransactionStore;

const REMOTE_USER: &str = "x-remote-user";
const CLIENT: &str = "192.0.2.10:51000";

#[fixture]
fn store() -> InMemoryTransactionStore {
    InMemoryTransactionStore::default()
}

async fn init_app(
    store: &InMemoryTransactionStore,
    identity: IdentitySource,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    let pipeline = Pipeline::new(Arc::new(store.clone()), identity);
    test::init_service(App::new().configure(configure(pipeline))).await
}

async fn static_app(
    store: &InMemoryTransactionStore,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    init_app(store, IdentitySource::Static(Identity::from_raw("test"))).await
}

fn client(req: TestRequest) -> TestRequest {
    req.peer_addr(CLIENT.parse().expect("client address"))
}

fn add_link(name: &str, url: &str, user: &str) -> Request {
    client(TestRequest::post().uri("/_admin"))
        .set_form([("name", name), ("url", url), ("user", user)])
        .to_request()
}

async fn body_text(res: ServiceResponse<BoxBody>) -> String {
    let bytes = test::read_body(res).await;
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[rstest]
#[actix_web::test]
async fn added_links_redirect_with_cache_headers(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;

    let res = test::call_service(&app, add_link("baz", "http://example.com", "test")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get(header::LOCATION).expect("location"), "/_admin");

    let res = test::call_service(
        &app,
        client(TestRequest::get().uri("/baz"))
            .insert_header((header::USER_AGENT, "curl/8.0"))
            .insert_header((header::REFERER, "http://referrer.example/"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    let headers = res.headers();
    assert_eq!(
        headers.get(header::LOCATION).expect("location"),
        "http://example.com"
    );
    assert_eq!(
        headers.get(header::CACHE_CONTROL).expect("cache-control"),
        "private, max-age=90"
    );
    assert!(headers.contains_key(header::EXPIRES));
    assert!(
        body_text(res)
            .await
            .contains("<a href=\"http://example.com\">Moved Permanently</a>")
    );

    assert_eq!(store.link("baz").await.expect("link").hits, 1);
    let hits = store.hits_for("baz").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].hit.remote.to_string(), "192.0.2.10");
    assert_eq!(hits[0].hit.user_agent, "curl/8.0");
    assert_eq!(
        hits[0].hit.referrer.as_deref(),
        Some("http://referrer.example/")
    );
}

#[rstest]
#[actix_web::test]
async fn unknown_names_are_not_found_and_leave_no_hits(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;
    test::call_service(&app, add_link("baz", "http://example.com", "test")).await;

    let res = test::call_service(&app, client(TestRequest::get().uri("/nope")).to_request()).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(res).await, "Not Found");
    assert!(store.link("nope").await.is_none());
    assert_eq!(store.link("baz").await.expect("link").hits, 0);
    assert!(store.hits_for("baz").await.is_empty());
}

#[rstest]
#[case("example.com")]
#[case("www.example.com/landing?ref=short")]
#[case("/internal/path")]
#[actix_web::test]
async fn relative_targets_are_accepted_verbatim(
    store: InMemoryTransactionStore,
    #[case] target: &str,
) {
    let app = static_app(&store).await;

    let res = test::call_service(&app, add_link("rel", target, "test")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = test::call_service(&app, client(TestRequest::get().uri("/rel")).to_request()).await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers().get(header::LOCATION).expect("location"), target);
}

#[rstest]
#[actix_web::test]
async fn admin_fields_may_come_from_the_query_string(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;

    let res = test::call_service(
        &app,
        client(TestRequest::post().uri("/_admin?name=q&url=http://example.com/q&user=test"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        store.link("q").await.expect("link").target.as_str(),
        "http://example.com/q"
    );

    let res = test::call_service(
        &app,
        client(TestRequest::post().uri("/_admin?name=ignored&user=test"))
            .set_form([("name", "mixed"), ("url", "http://example.com/m")])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(store.link("ignored").await.is_none());
    assert_eq!(
        store.link("mixed").await.expect("link").owner.as_str(),
        "test"
    );
}

#[rstest]
#[actix_web::test]
async fn concurrent_hits_are_all_counted(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;
    test::call_service(&app, add_link("baz", "http://example.com", "test")).await;

    let responses = join_all((0..25).map(|_| {
        test::call_service(&app, client(TestRequest::get().uri("/baz")).to_request())
    }))
    .await;

    assert!(
        responses
            .iter()
            .all(|res| res.status() == StatusCode::MOVED_PERMANENTLY)
    );
    assert_eq!(store.link("baz").await.expect("link").hits, 25);
    assert_eq!(store.hits_for("baz").await.len(), 25);
}

#[rstest]
#[actix_web::test]
async fn only_the_owner_may_delete(store: InMemoryTransactionStore) {
    let header = header::HeaderName::from_static(REMOTE_USER);
    let app = init_app(&store, IdentitySource::Header(header)).await;
    let res = test::call_service(
        &app,
        client(TestRequest::post().uri("/_admin"))
            .insert_header((REMOTE_USER, "ada"))
            .set_form([("name", "baz"), ("url", "http://example.com"), ("user", "ada")])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let delete_as = |user: &str| {
        client(TestRequest::delete().uri("/baz"))
            .insert_header((REMOTE_USER, user.to_owned()))
            .to_request()
    };

    let res = test::call_service(&app, delete_as("bob")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(store.link("baz").await.is_some());

    let res = test::call_service(&app, delete_as("ada")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(store.link("baz").await.is_none());

    let res = test::call_service(&app, client(TestRequest::get().uri("/baz")).to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn anonymous_deletes_are_rejected(store: InMemoryTransactionStore) {
    let header = header::HeaderName::from_static(REMOTE_USER);
    let app = init_app(&store, IdentitySource::Header(header)).await;
    test::call_service(&app, add_link("baz", "http://example.com", "ada")).await;

    let res = test::call_service(&app, client(TestRequest::delete().uri("/baz")).to_request()).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(res).await, "missing user");
    assert!(store.link("baz").await.is_some());
}

#[rstest]
#[case(&[], "missing name")]
#[case(&[("name", "baz")], "missing URL")]
#[case(&[("name", "baz"), ("url", ":foo/bar")], "invalid URL")]
#[case(&[("name", "baz"), ("url", "http://example.com")], "missing user")]
#[case(&[("url", ":foo/bar"), ("user", "test")], "missing name")]
#[actix_web::test]
async fn form_problems_are_reported_in_a_fixed_order(
    store: InMemoryTransactionStore,
    #[case] fields: &[(&str, &str)],
    #[case] expected: &str,
) {
    let app = static_app(&store).await;

    let res = test::call_service(
        &app,
        client(TestRequest::post().uri("/_admin"))
            .set_form(fields)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(res).await, expected);
    assert!(store.link("baz").await.is_none());
}

#[rstest]
#[actix_web::test]
async fn admin_page_lists_the_callers_links(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;
    test::call_service(&app, add_link("mine", "http://example.com/a", "test")).await;
    test::call_service(&app, add_link("theirs", "http://example.com/b", "other")).await;
    test::call_service(&app, client(TestRequest::get().uri("/mine")).to_request()).await;

    let res = test::call_service(&app, client(TestRequest::get().uri("/_admin")).to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CACHE_CONTROL).expect("cache-control"),
        "private, no-cache, must-revalidate"
    );
    let page = body_text(res).await;
    assert!(page.contains("http://example.com/a"));
    assert!(!page.contains("http://example.com/b"));
}

#[rstest]
#[case(TestRequest::put().uri("/baz"))]
#[case(TestRequest::patch().uri("/_admin"))]
#[case(TestRequest::delete().uri("/_admin"))]
#[actix_web::test]
async fn unsupported_methods_are_bad_requests(
    store: InMemoryTransactionStore,
    #[case] req: TestRequest,
) {
    let app = static_app(&store).await;

    let res = test::call_service(&app, client(req).to_request()).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(res).await, "Bad method");
}

#[rstest]
#[actix_web::test]
async fn duplicate_names_fail_without_touching_the_original(store: InMemoryTransactionStore) {
    let app = static_app(&store).await;
    test::call_service(&app, add_link("baz", "http://example.com", "test")).await;

    let res = test::call_service(&app, add_link("baz", "http://example.org", "test")).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(res).await, "Internal Server Error");
    assert_eq!(
        store.link("baz").await.expect("link").target.as_str(),
        "http://example.com"
    );
}
