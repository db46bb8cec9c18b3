//! User-Agent string shared by the HTTP and object-storage transports.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/artifact-fetch";

/// Default User-Agent for artifact requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("artifact-fetch/{version} (+{PROJECT_UA_URL})")
}
