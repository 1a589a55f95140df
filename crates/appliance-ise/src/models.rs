//! ERS resource types, search results and creation payloads.
//!
//! ERS validates XML element order, so the creation payloads here build their
//! element skeletons field by field in the order the server expects.

use std::fmt;

use appliance_core::{XmlElement, XmlValue};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

/// Namespace of search result entries
pub const ERS_NS: &str = "ers.ise.cisco.com";
/// Namespace of search result pages
pub const ERS_V2_NS: &str = "v2.ers.ise.cisco.com";
/// Namespace of identity resources
pub const IDENTITY_NS: &str = "identity.ers.ise.cisco.com";
/// Namespace of network resources
pub const NETWORK_NS: &str = "network.ers.ise.cisco.com";

/// Media type of search results
pub const SEARCH_RESULT_MEDIA_TYPE: &str = "application/vnd.com.cisco.ise.ers.searchresult.2.0+xml";

/// Local name of the next-page marker in search results
pub const NEXT_PAGE: &str = "nextPage";
/// Local name of a search result entry
pub const RESOURCE: &str = "resource";

/// ERS resource collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Endpoints (MAC addresses)
    Endpoint,
    /// Endpoint identity groups
    EndpointGroup,
    /// Internal users
    InternalUser,
    /// User identity groups
    IdentityGroup,
    /// Guest users
    GuestUser,
    /// Network access devices
    NetworkDevice,
    /// Network device groups
    NetworkDeviceGroup,
}

impl ResourceType {
    /// Collection path segment under `/ers/config/`.
    #[must_use]
    pub const fn segment(&self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::EndpointGroup => "endpointgroup",
            Self::InternalUser => "internaluser",
            Self::IdentityGroup => "identitygroup",
            Self::GuestUser => "guestuser",
            Self::NetworkDevice => "networkdevice",
            Self::NetworkDeviceGroup => "networkdevicegroup",
        }
    }

    /// Vendor media type of a single resource.
    #[must_use]
    pub const fn media_type(&self) -> &'static str {
        match self {
            Self::Endpoint => "application/vnd.com.cisco.ise.identity.endpoint.1.1+xml",
            Self::EndpointGroup => "application/vnd.com.cisco.ise.identity.endpointgroup.1.0+xml",
            Self::InternalUser => "application/vnd.com.cisco.ise.identity.internaluser.1.2+xml",
            Self::IdentityGroup => "application/vnd.com.cisco.ise.identity.identitygroup.1.0+xml",
            Self::GuestUser => "application/vnd.com.cisco.ise.identity.guestuser.2.0+xml",
            Self::NetworkDevice => "application/vnd.com.cisco.ise.network.networkdevice.1.1+xml",
            Self::NetworkDeviceGroup => {
                "application/vnd.com.cisco.ise.network.networkdevicegroup.1.0+xml"
            }
        }
    }

    /// Namespace of the resource's root element.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        match self {
            Self::NetworkDevice | Self::NetworkDeviceGroup => NETWORK_NS,
            _ => IDENTITY_NS,
        }
    }

    /// Collection path, e.g. `/ers/config/endpoint`.
    #[must_use]
    pub fn collection_path(&self) -> String {
        format!("/ers/config/{}", self.segment())
    }

    /// Path of one resource.
    #[must_use]
    pub fn resource_path(&self, id: &str) -> String {
        format!("/ers/config/{}/{id}", self.segment())
    }

    /// Returns all resource types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Endpoint,
            Self::EndpointGroup,
            Self::InternalUser,
            Self::IdentityGroup,
            Self::GuestUser,
            Self::NetworkDevice,
            Self::NetworkDeviceGroup,
        ]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A search result entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// Resource id
    pub id: String,
    /// Resource name (a MAC address for endpoints)
    pub name: Option<String>,
    /// Free-form description
    pub description: Option<String>,
}

impl ResourceRef {
    /// Parse an entry; `None` when it has no id.
    #[must_use]
    pub fn from_element(element: &XmlElement) -> Option<Self> {
        let id = element.attribute("id")?.to_string();
        Some(Self {
            id,
            name: element.attribute("name").map(ToString::to_string),
            description: element
                .attribute("description")
                .filter(|description| !description.is_empty())
                .map(ToString::to_string),
        })
    }

    /// The id as a UUID, when it is one.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}

/// Entries of one search result page, in document order.
#[must_use]
pub fn resources(page: &XmlElement) -> Vec<ResourceRef> {
    page.descendants(Some(ERS_NS), RESOURCE)
        .into_iter()
        .filter_map(ResourceRef::from_element)
        .collect()
}

/// Returns true if another search result page follows `page`.
#[must_use]
pub fn has_next_page(page: &XmlElement) -> bool {
    page.has_child(Some(ERS_V2_NS), NEXT_PAGE)
}

/// Returns true if `page` carries no elements at all, which ISE sends for a
/// search without matches.
#[must_use]
pub fn is_empty_page(page: &XmlElement) -> bool {
    page.children.is_empty()
}

/// Total number of matches reported by a search result page.
#[must_use]
pub fn total(page: &XmlElement) -> Option<u64> {
    page.attribute("total")?.parse().ok()
}

fn flag(value: bool) -> XmlValue {
    XmlValue::text(if value { "true" } else { "false" })
}

/// Payload for creating an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEndpoint {
    /// MAC address, also used as the resource name
    pub mac: String,
    /// Description
    pub description: String,
    /// Endpoint identity group id
    pub group_id: String,
    /// Profiling policy id
    pub profile_id: Option<String>,
    /// Portal user
    pub portal_user: Option<String>,
    /// Identity store name
    pub identity_store: Option<String>,
    /// Identity store id
    pub identity_store_id: Option<String>,
    /// Pin the endpoint to `group_id`
    pub static_group_assignment: bool,
    /// Pin the endpoint to `profile_id`
    pub static_profile_assignment: bool,
}

impl NewEndpoint {
    /// Endpoint statically assigned to `group_id`.
    pub fn new(
        mac: impl Into<String>,
        description: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            mac: mac.into(),
            description: description.into(),
            group_id: group_id.into(),
            profile_id: None,
            portal_user: None,
            identity_store: None,
            identity_store_id: None,
            static_group_assignment: true,
            static_profile_assignment: false,
        }
    }

    /// Set the profiling policy and pin it.
    #[must_use]
    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self.static_profile_assignment = true;
        self
    }

    /// Build the `endpoint` document.
    #[must_use]
    pub fn to_element(&self) -> XmlElement {
        XmlElement::skeleton(
            Some(IDENTITY_NS),
            ResourceType::Endpoint.segment(),
            &self.mac,
            &self.description,
        )
        .with_fields([
            (
                "customAttributes",
                XmlValue::map([("customAttributes", XmlValue::Empty)]),
            ),
            ("groupId", XmlValue::text(self.group_id.as_str())),
            ("identityStore", XmlValue::optional(self.identity_store.as_deref())),
            (
                "identityStoreId",
                XmlValue::optional(self.identity_store_id.as_deref()),
            ),
            ("mac", XmlValue::text(self.mac.as_str())),
            ("portalUser", XmlValue::optional(self.portal_user.as_deref())),
            ("profileId", XmlValue::optional(self.profile_id.as_deref())),
            ("staticGroupAssignment", flag(self.static_group_assignment)),
            ("staticProfileAssignment", flag(self.static_profile_assignment)),
        ])
    }
}

/// Payload for creating an internal user.
#[derive(Debug, Clone)]
pub struct NewInternalUser {
    /// Login name
    pub name: String,
    /// Description
    pub description: String,
    /// Comma-separated user identity group ids
    pub identity_groups: String,
    /// Login password
    pub password: SecretString,
    /// Enable password for network devices
    pub enable_password: Option<SecretString>,
    /// E-mail address
    pub email: Option<String>,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// Account enabled
    pub enabled: bool,
    /// Force a password change on first login
    pub change_password: bool,
    /// Password expiry enforced
    pub expiry_date_enabled: bool,
    /// Store validating the password
    pub password_id_store: String,
    /// Custom attributes as key/value entries
    pub custom_attributes: Vec<(String, Option<String>)>,
}

impl NewInternalUser {
    /// Enabled user in the internal store.
    pub fn new(
        name: impl Into<String>,
        identity_groups: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            identity_groups: identity_groups.into(),
            password: password.into(),
            enable_password: None,
            email: None,
            first_name: None,
            last_name: None,
            enabled: true,
            change_password: false,
            expiry_date_enabled: false,
            password_id_store: "Internal Users".to_string(),
            custom_attributes: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set e-mail and names.
    #[must_use]
    pub fn with_contact(
        mut self,
        email: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        self.email = email;
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    /// Add a custom attribute.
    #[must_use]
    pub fn with_custom_attribute(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.custom_attributes.push((key.into(), value));
        self
    }

    /// Set the password store.
    #[must_use]
    pub fn with_password_store(mut self, store: impl Into<String>) -> Self {
        self.password_id_store = store.into();
        self
    }

    /// Build the `internaluser` document.
    #[must_use]
    pub fn to_element(&self) -> XmlElement {
        let custom_attributes = self.custom_attributes.iter().map(|(key, value)| {
            (
                "entry",
                XmlValue::map([
                    ("key", XmlValue::text(key.as_str())),
                    ("value", XmlValue::optional(value.as_deref())),
                ]),
            )
        });

        XmlElement::skeleton(
            Some(IDENTITY_NS),
            ResourceType::InternalUser.segment(),
            &self.name,
            &self.description,
        )
        .with_fields([
            ("changePassword", flag(self.change_password)),
            ("customAttributes", XmlValue::map(custom_attributes)),
            ("email", XmlValue::optional(self.email.as_deref())),
            (
                "enablePassword",
                XmlValue::optional(
                    self.enable_password
                        .as_ref()
                        .map(|secret| secret.expose_secret()),
                ),
            ),
            ("enabled", flag(self.enabled)),
            ("expiryDateEnabled", flag(self.expiry_date_enabled)),
            ("firstName", XmlValue::optional(self.first_name.as_deref())),
            ("identityGroups", XmlValue::text(self.identity_groups.as_str())),
            ("lastName", XmlValue::optional(self.last_name.as_deref())),
            ("password", XmlValue::text(self.password.expose_secret())),
            ("passwordIDStore", XmlValue::text(self.password_id_store.as_str())),
        ])
    }
}
