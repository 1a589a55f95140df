//! End-to-end session lifecycle tests.
//!
//! These tests drive complete login, call, pagination and logout sequences against
//! a mock appliance through the public API only.

use appliance_core::{
    scoped, Appliance, CookieAuth, DualAuth, Error, JsonCodec, PageQuery, RequestOptions,
    Session, SessionConfig, SessionState, XmlCodec, XmlElement,
};
use futures_util::TryStreamExt;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const V2_NS: &str = "v2.ers.ise.cisco.com";
const ERS_NS: &str = "ers.ise.cisco.com";

fn config(server: &MockServer) -> SessionConfig {
    SessionConfig::new(server.uri())
        .unwrap()
        .with_credentials("user", "pass".to_string())
}

fn search_page(ids: &[&str], next: Option<u32>) -> String {
    let next_page = next.map_or_else(String::new, |page| {
        format!(r#"<ns3:nextPage rel="next" href="/ers/config/endpoint?page={page}"/>"#)
    });
    let resources: String = ids
        .iter()
        .map(|id| format!(r#"<ns5:resource id="{id}" name="host-{id}" description=""/>"#))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><ns3:searchResult total="5" xmlns:ns5="{ERS_NS}" xmlns:ns3="{V2_NS}">{next_page}<ns3:resources>{resources}</ns3:resources></ns3:searchResult>"#
    )
}

#[tokio::test]
async fn test_dual_auth_lifecycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tokenservices"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(body_string("{}"))
        .respond_with(ResponseTemplate::new(204).insert_header("x-auth-token", "ABC123"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/objects/networkobjects"))
        .and(header("x-auth-token", "ABC123"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "collection#NetworkObj",
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/tokenservices/ABC123"))
        .and(header("x-auth-token", "ABC123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let auth = DualAuth::new(Appliance::Asa, "/api/tokenservices")
        .with_logout_template("/api/tokenservices/{token}");
    let session = Session::connect(&config(&server), auth, JsonCodec::new())
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);

    let objects = scoped(session, |s| {
        Box::pin(async move {
            s.get("/api/objects/networkobjects")
                .await?
                .into_result()
        })
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(objects["items"], json!([]));
}

#[tokio::test]
async fn test_dual_auth_login_rejected() {
    let server = MockServer::start().await;

    // a 200 is not the 204 this appliance answers on success
    Mock::given(method("POST"))
        .and(path("/api/tokenservices"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-auth-token", "ABC123"))
        .mount(&server)
        .await;

    let auth = DualAuth::new(Appliance::Asa, "/api/tokenservices");
    let err = Session::connect(&config(&server), auth, JsonCodec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LoginRejected { status: 200, .. }));
}

#[tokio::test]
async fn test_cookie_auth_paginated_search() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ers/sdk/"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "JSESSIONID=xyz; Path=/; Secure; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pages = [
        ("1", search_page(&["a", "b"], Some(2))),
        ("2", search_page(&["c", "d"], Some(3))),
        ("3", search_page(&["e"], None)),
    ];
    for (page, body) in pages {
        Mock::given(method("GET"))
            .and(path("/ers/config/endpoint"))
            .and(query_param("page", page))
            .and(query_param("filter", "mac.STARTSW.00"))
            .and(header("cookie", "JSESSIONID=xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let auth = CookieAuth::new(Appliance::Ise, "/ers/sdk/");
    let mut session = Session::connect(&config(&server), auth, XmlCodec::new())
        .await
        .unwrap();

    let mut query = appliance_core::QueryParams::new();
    query.push("filter", "mac.STARTSW.00");
    let search = PageQuery::new("/ers/config/endpoint")
        .with_options(RequestOptions::new().with_query(query));

    let pages: Vec<XmlElement> = session
        .pages(search, |page| page.has_child(Some(V2_NS), "nextPage"))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    let ids: Vec<&str> = pages
        .iter()
        .flat_map(|page| page.descendants(Some(ERS_NS), "resource"))
        .filter_map(|resource| resource.attribute("id"))
        .collect();
    assert_eq!(ids, ["a", "b", "c", "d", "e"]);

    // no logout endpoint: closing the session sends nothing more
    session.logout().await;
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}
