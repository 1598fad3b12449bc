//! Versioned controller endpoint paths.

use serde::Serialize;

/// Path prefix of DCNM 11 REST endpoints.
const V11_PREFIX: &str = "/rest";

/// Path prefix of NDFC 12 REST endpoints.
const V12_PREFIX: &str = "/appcenter/cisco/ndfc/api/v1/lan-fabric/rest";

/// Version endpoint of NDFC 12.
pub const V12_VERSION_PATH: &str = "/appcenter/cisco/ndfc/api/about/version";

/// Version endpoint of DCNM 11.
pub const V11_VERSION_PATH: &str = "/fm/fmrest/about/version";

/// Controller API release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// DCNM 11.
    V11,
    /// NDFC 12 and later.
    V12,
}

/// Builds fabric-scoped endpoint paths for one API release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiPaths {
    prefix: &'static str,
}

impl ApiPaths {
    /// Returns the paths for a release.
    #[must_use]
    pub const fn for_version(version: ApiVersion) -> Self {
        match version {
            ApiVersion::V11 => Self { prefix: V11_PREFIX },
            ApiVersion::V12 => Self { prefix: V12_PREFIX },
        }
    }

    /// Fabric existence check.
    #[must_use]
    pub fn fabric(&self, fabric: &str) -> String {
        format!("{}/control/fabrics/{fabric}", self.prefix)
    }

    /// Switch inventory of a fabric.
    #[must_use]
    pub fn inventory(&self, fabric: &str) -> String {
        format!("{}/control/fabrics/{fabric}/inventory/switchesByFabric", self.prefix)
    }

    /// VRF collection of a fabric.
    #[must_use]
    pub fn vrfs(&self, fabric: &str) -> String {
        format!("{}/top-down/fabrics/{fabric}/vrfs", self.prefix)
    }

    /// One VRF. The name is percent-encoded as a path segment.
    #[must_use]
    pub fn vrf(&self, fabric: &str, vrf_name: &str) -> String {
        format!("{}/{}", self.vrfs(fabric), urlencoding::encode(vrf_name))
    }

    /// Attachment collection of a fabric.
    #[must_use]
    pub fn attachments(&self, fabric: &str) -> String {
        format!("{}/attachments", self.vrfs(fabric))
    }

    /// Attachments of the named VRFs. Each name is percent-encoded; the
    /// separating commas are not.
    #[must_use]
    pub fn attachments_for(&self, fabric: &str, vrf_names: &[&str]) -> String {
        let names: Vec<_> = vrf_names.iter().map(|name| urlencoding::encode(name)).collect();
        format!("{}?vrf-names={}", self.attachments(fabric), names.join(","))
    }

    /// Deployment trigger.
    #[must_use]
    pub fn deployments(&self, fabric: &str) -> String {
        format!("{}/deployments", self.vrfs(fabric))
    }

    /// Next free VRF id.
    #[must_use]
    pub fn vrf_info(&self, fabric: &str) -> String {
        format!("{}/top-down/fabrics/{fabric}/vrfinfo", self.prefix)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::V11 => "v11",
            Self::V12 => "v12",
        };
        write!(f, "{s}")
    }
}
