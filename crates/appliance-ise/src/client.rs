//! ISE session and ERS operations.

use appliance_core::{
    Appliance, ApplianceClient, CookieAuth, HttpConfig, PageQuery, QueryParams, RequestOptions,
    Session, SessionConfig, XmlCodec, XmlElement,
};
use futures_util::{Stream, TryStreamExt};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::models::{
    has_next_page, is_empty_page, resources, NewEndpoint, NewInternalUser, ResourceRef, ResourceType,
    SEARCH_RESULT_MEDIA_TYPE,
};
use crate::Result;

const USER_AGENT: &str = concat!("appliance-ise/", env!("CARGO_PKG_VERSION"));

/// Login endpoint
pub const LOGIN_PATH: &str = "/ers/sdk/";

/// Session type used by [`Ise`].
pub type IseSession = Session<CookieAuth, XmlCodec>;

/// ISE authentication: Basic auth login, session cookies replayed on every call,
/// no logout endpoint.
#[must_use]
pub fn ise_auth() -> CookieAuth {
    CookieAuth::new(Appliance::Ise, LOGIN_PATH)
}

fn search_options(resource: ResourceType, query: QueryParams) -> RequestOptions {
    RequestOptions::new()
        .with_header(ACCEPT, HeaderValue::from_static(SEARCH_RESULT_MEDIA_TYPE))
        .with_header(CONTENT_TYPE, HeaderValue::from_static(resource.media_type()))
        .with_query(query)
}

fn resource_options(resource: ResourceType) -> Result<RequestOptions> {
    RequestOptions::new()
        .with_accept(resource.media_type())?
        .with_content_type(&format!("{}; charset=utf-8", resource.media_type()))
}

/// Client for the ISE External RESTful Services API.
#[derive(Debug)]
pub struct Ise {
    session: IseSession,
}

impl Ise {
    /// Connect and log in when credentials are configured.
    ///
    /// # Errors
    ///
    /// Returns configuration and authentication errors from the session.
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        Self::connect_with(config, HttpConfig::new().with_user_agent(USER_AGENT)).await
    }

    /// Connect with custom transport settings.
    ///
    /// # Errors
    ///
    /// Returns configuration and authentication errors from the session.
    pub async fn connect_with(config: &SessionConfig, http_config: HttpConfig) -> Result<Self> {
        let session = Session::builder(config, ise_auth(), XmlCodec::new())
            .with_http_config(http_config)
            .connect()
            .await?;
        Ok(Self { session })
    }

    /// Wrap an existing session.
    #[must_use]
    pub const fn from_session(session: IseSession) -> Self {
        Self { session }
    }

    /// Return the underlying session.
    #[must_use]
    pub fn into_session(self) -> IseSession {
        self.session
    }

    /// Stream search result pages of a collection, optionally filtered.
    ///
    /// Filters use the ERS syntax, e.g. `mac.EQ.00:11:22:33:44:55`.
    pub fn search(
        &self,
        resource: ResourceType,
        filter: Option<&str>,
    ) -> impl Stream<Item = Result<XmlElement>> + '_ {
        let mut query = QueryParams::new();
        query.push_opt("filter", filter);
        self.search_with(resource, query)
    }

    /// Stream search result pages with arbitrary query parameters.
    ///
    /// Use this for combined filters (`filter` repeated plus `filtertype=OR`).
    pub fn search_with(
        &self,
        resource: ResourceType,
        query: QueryParams,
    ) -> impl Stream<Item = Result<XmlElement>> + '_ {
        debug!(%resource, "searching");
        let search = PageQuery::new(resource.collection_path())
            .with_options(search_options(resource, query));
        self.session.pages_with(search, has_next_page, is_empty_page)
    }

    /// Collect every search result entry across all pages.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while paging.
    pub async fn find(
        &self,
        resource: ResourceType,
        filter: Option<&str>,
    ) -> Result<Vec<ResourceRef>> {
        let found: Vec<ResourceRef> = self
            .search(resource, filter)
            .map_ok(|page| resources(&page))
            .try_concat()
            .await?;
        debug!(%resource, count = found.len(), "search complete");
        Ok(found)
    }

    async fn find_one(
        &self,
        resource: ResourceType,
        filter: &str,
    ) -> Result<Option<ResourceRef>> {
        let found = self.find(resource, Some(filter)).await?.into_iter().next();
        if found.is_none() {
            warn!(%resource, filter, "no match");
        }
        Ok(found)
    }

    /// Fetch one resource by id; `None` when ISE returns no body.
    ///
    /// # Errors
    ///
    /// Returns request errors and [`appliance_core::Error::UnexpectedStatus`] for an
    /// unacceptable status (404 for an unknown id).
    pub async fn get_resource(
        &self,
        resource: ResourceType,
        id: &str,
    ) -> Result<Option<XmlElement>> {
        let options = resource_options(resource)?;
        self.session
            .request(Method::GET, &resource.resource_path(id), None, &options)
            .await?
            .into_result()
    }

    async fn create_resource(
        &self,
        resource: ResourceType,
        document: &XmlElement,
    ) -> Result<Option<XmlElement>> {
        let options = resource_options(resource)?;
        let created = self
            .session
            .request(
                Method::POST,
                &resource.collection_path(),
                Some(document),
                &options,
            )
            .await?
            .into_result()?;
        info!(%resource, name = document.attribute("name").unwrap_or_default(), "created");
        Ok(created)
    }

    /// List endpoints, optionally filtered.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn list_endpoints(&self, filter: Option<&str>) -> Result<Vec<ResourceRef>> {
        self.find(ResourceType::Endpoint, filter).await
    }

    /// Look an endpoint up by MAC address.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn find_endpoint(&self, mac: &str) -> Result<Option<ResourceRef>> {
        self.find_one(ResourceType::Endpoint, &format!("mac.EQ.{mac}"))
            .await
    }

    /// Fetch an endpoint by id.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn get_endpoint(&self, id: &str) -> Result<Option<XmlElement>> {
        self.get_resource(ResourceType::Endpoint, id).await
    }

    /// Create an endpoint.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn create_endpoint(&self, endpoint: &NewEndpoint) -> Result<Option<XmlElement>> {
        self.create_resource(ResourceType::Endpoint, &endpoint.to_element())
            .await
    }

    /// Replace an endpoint with `document`.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn update_endpoint(
        &self,
        id: &str,
        document: &XmlElement,
    ) -> Result<Option<XmlElement>> {
        let resource = ResourceType::Endpoint;
        let options = resource_options(resource)?;
        let updated = self
            .session
            .request(Method::PUT, &resource.resource_path(id), Some(document), &options)
            .await?
            .into_result()?;
        info!(%resource, id, "updated");
        Ok(updated)
    }

    /// List endpoint identity groups, optionally filtered.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn list_endpoint_groups(&self, filter: Option<&str>) -> Result<Vec<ResourceRef>> {
        self.find(ResourceType::EndpointGroup, filter).await
    }

    /// Fetch an endpoint identity group by id.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn get_endpoint_group(&self, id: &str) -> Result<Option<XmlElement>> {
        self.get_resource(ResourceType::EndpointGroup, id).await
    }

    /// Look an endpoint identity group up by name.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn find_endpoint_group(&self, name: &str) -> Result<Option<ResourceRef>> {
        self.find_one(ResourceType::EndpointGroup, &format!("name.EQ.{name}"))
            .await
    }

    /// List internal users, optionally filtered.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn list_internal_users(&self, filter: Option<&str>) -> Result<Vec<ResourceRef>> {
        self.find(ResourceType::InternalUser, filter).await
    }

    /// Look an internal user up by name.
    ///
    /// # Errors
    ///
    /// See [`Ise::find`].
    pub async fn find_internal_user(&self, name: &str) -> Result<Option<ResourceRef>> {
        self.find_one(ResourceType::InternalUser, &format!("name.EQ.{name}"))
            .await
    }

    /// Fetch an internal user by id.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn get_internal_user(&self, id: &str) -> Result<Option<XmlElement>> {
        self.get_resource(ResourceType::InternalUser, id).await
    }

    /// Create an internal user.
    ///
    /// # Errors
    ///
    /// See [`Ise::get_resource`].
    pub async fn create_internal_user(&self, user: &NewInternalUser) -> Result<Option<XmlElement>> {
        self.create_resource(ResourceType::InternalUser, &user.to_element())
            .await
    }

    /// End the session. ISE has no logout endpoint; the cookie is dropped locally.
    pub async fn logout(&mut self) {
        self.session.logout().await;
    }
}

impl ApplianceClient for Ise {
    type Auth = CookieAuth;
    type Codec = XmlCodec;

    fn session(&self) -> &IseSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut IseSession {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ERS_NS, ERS_V2_NS, IDENTITY_NS};
    use appliance_core::{scoped, Error, SessionState};
    use futures_util::StreamExt;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COOKIE: &str = "JSESSIONID=9F2A; APPSESSIONID=77B1";

    async fn logged_in(server: &MockServer) -> Ise {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "JSESSIONID=9F2A; Path=/; Secure; HttpOnly")
                    .append_header("set-cookie", "APPSESSIONID=77B1; Path=/"),
            )
            .expect(1)
            .mount(server)
            .await;

        let config = SessionConfig::new(server.uri())
            .unwrap()
            .with_credentials("user", "pass".to_string());
        Ise::connect(&config).await.unwrap()
    }

    fn search_page(entries: &[(&str, &str)], next: bool) -> String {
        let next_page = if next {
            r#"<ns3:nextPage rel="next" href="next" type="application/xml"/>"#
        } else {
            ""
        };
        let entries: String = entries
            .iter()
            .map(|(id, name)| {
                format!(r#"<ns5:resource id="{id}" name="{name}" description="lab"/>"#)
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><ns3:searchResult total="3" xmlns:ns5="{ERS_NS}" xmlns:ns3="{ERS_V2_NS}">{next_page}<ns3:resources>{entries}</ns3:resources></ns3:searchResult>"#
        )
    }

    async fn mount_search(server: &MockServer, resource: ResourceType, page: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(resource.collection_path()))
            .and(query_param("page", page))
            .and(header("cookie", COOKIE))
            .and(header("accept", SEARCH_RESULT_MEDIA_TYPE))
            .and(header("content-type", resource.media_type()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_endpoints_across_pages() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        mount_search(
            &server,
            ResourceType::Endpoint,
            "1",
            search_page(&[("id-1", "00:00:00:00:00:01"), ("id-2", "00:00:00:00:00:02")], true),
        )
        .await;
        mount_search(
            &server,
            ResourceType::Endpoint,
            "2",
            search_page(&[("id-3", "00:00:00:00:00:03")], false),
        )
        .await;

        let endpoints = ise.list_endpoints(None).await.unwrap();
        let ids: Vec<&str> = endpoints.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["id-1", "id-2", "id-3"]);
    }

    #[tokio::test]
    async fn test_search_stream_yields_pages() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        mount_search(
            &server,
            ResourceType::InternalUser,
            "1",
            search_page(&[("u-1", "jdoe")], false),
        )
        .await;

        let pages: Vec<Result<XmlElement>> = ise
            .search(ResourceType::InternalUser, None)
            .collect()
            .await;
        assert_eq!(pages.len(), 1);
        let page = pages[0].as_ref().unwrap();
        assert_eq!(crate::models::total(page), Some(3));
    }

    #[tokio::test]
    async fn test_search_without_matches_yields_no_page() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        mount_search(
            &server,
            ResourceType::NetworkDevice,
            "1",
            format!(r#"<ns3:searchResult total="0" xmlns:ns3="{ERS_V2_NS}"/>"#),
        )
        .await;

        let pages: Vec<Result<XmlElement>> = ise
            .search(ResourceType::NetworkDevice, None)
            .collect()
            .await;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_find_endpoint_by_mac() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/ers/config/endpoint"))
            .and(query_param("filter", "mac.EQ.00:11:22:33:44:55"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(search_page(&[("ep-1", "00:11:22:33:44:55")], false)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let found = ise.find_endpoint("00:11:22:33:44:55").await.unwrap().unwrap();
        assert_eq!(found.id, "ep-1");
        assert_eq!(found.description.as_deref(), Some("lab"));
    }

    #[tokio::test]
    async fn test_find_internal_user_without_match() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/ers/config/internaluser"))
            .and(query_param("filter", "name.EQ.ghost"))
            .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[], false)))
            .mount(&server)
            .await;

        assert!(ise.find_internal_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_endpoint_group() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><ns4:endpointgroup id="g-1" name="Printers" description="lab printers" xmlns:ns4="{IDENTITY_NS}"><systemDefined>false</systemDefined></ns4:endpointgroup>"#
        );
        Mock::given(method("GET"))
            .and(path("/ers/config/endpointgroup/g-1"))
            .and(header("cookie", COOKIE))
            .and(header("accept", ResourceType::EndpointGroup.media_type()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let group = ise.get_endpoint_group("g-1").await.unwrap().unwrap();
        assert!(group.is_named(Some(IDENTITY_NS), "endpointgroup"));
        assert_eq!(group.attribute("name"), Some("Printers"));
        assert_eq!(group.child_text(None, "systemDefined"), Some("false"));
    }

    #[tokio::test]
    async fn test_get_unknown_endpoint_is_error() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        Mock::given(method("GET"))
            .and(path("/ers/config/endpoint/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = ise.get_endpoint("missing").await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_create_internal_user() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        Mock::given(method("POST"))
            .and(path("/ers/config/internaluser"))
            .and(header(
                "content-type",
                "application/vnd.com.cisco.ise.identity.internaluser.1.2+xml; charset=utf-8",
            ))
            .and(body_string_contains(
                r#"<ns0:internaluser xmlns:ns0="identity.ers.ise.cisco.com" name="jdoe" description="">"#,
            ))
            .and(body_string_contains("<password>S3cret!</password><passwordIDStore>Internal Users</passwordIDStore>"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let user = NewInternalUser::new("jdoe", "a1740510", "S3cret!".to_string());
        assert!(ise.create_internal_user(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_and_update_endpoint() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        Mock::given(method("POST"))
            .and(path("/ers/config/endpoint"))
            .and(body_string_contains(
                "<mac>00:11:22:33:44:55</mac><portalUser/><profileId/><staticGroupAssignment>true</staticGroupAssignment>",
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/ers/config/endpoint/ep-1"))
            .and(body_string_contains("<groupId>new-group</groupId>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ns2:updatedFields xmlns:ns2="ers.ise.cisco.com"><updatedField field="groupId"/></ns2:updatedFields>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = NewEndpoint::new("00:11:22:33:44:55", "printer", "c5b18110");
        assert!(ise.create_endpoint(&endpoint).await.unwrap().is_none());

        let updated = NewEndpoint::new("00:11:22:33:44:55", "printer", "new-group").to_element();
        let reply = ise.update_endpoint("ep-1", &updated).await.unwrap().unwrap();
        assert!(reply.is_named(Some(ERS_NS), "updatedFields"));
    }

    #[tokio::test]
    async fn test_patch_is_not_supported() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        let err = ise
            .session()
            .patch("/ers/config/endpoint/ep-1", &XmlElement::new("endpoint"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MethodNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_scoped_exit_sends_no_logout() {
        let server = MockServer::start().await;
        let ise = logged_in(&server).await;

        mount_search(
            &server,
            ResourceType::EndpointGroup,
            "1",
            search_page(&[("g-1", "Printers")], false),
        )
        .await;

        let group = scoped(ise, |i| {
            Box::pin(async move { i.find_endpoint_group("Printers").await })
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(group.id, "g-1");
        // login and one search page only
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_logout_closes_session() {
        let server = MockServer::start().await;
        let mut ise = logged_in(&server).await;

        ise.logout().await;
        assert_eq!(ise.session().state(), SessionState::LoggedOut);
        assert!(matches!(
            ise.list_endpoints(None).await,
            Err(Error::SessionClosed)
        ));
    }
}
