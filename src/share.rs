use url::Url;

const QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: &str = "120x120";

/// builds the public links handed out for files and sessions
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    domain: String,
}

impl LinkBuilder {
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            domain: domain.trim_end_matches('/').to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// stable for a given record id
    pub fn file_link(&self, record_id: &str) -> String {
        format!("https://{}/file/{}", self.domain, record_id)
    }

    pub fn session_link(&self, token: &str) -> String {
        format!("https://{}/share/{}", self.domain, token)
    }

    /// fresh link for a newly aggregated session
    pub fn new_session_link(&self) -> String {
        self.session_link(&uuid::Uuid::new_v4().simple().to_string())
    }
}

/// image url for the external qr generator, link passed url-encoded
pub fn qr_code_url(link: &str) -> String {
    match Url::parse_with_params(QR_ENDPOINT, &[("size", QR_SIZE), ("data", link)]) {
        Ok(url) => url.to_string(),
        Err(e) => {
            // the endpoint is a constant, this only trips if someone edits it badly
            tracing::error!("Invalid qr endpoint {}: {}", QR_ENDPOINT, e);
            String::new()
        }
    }
}
