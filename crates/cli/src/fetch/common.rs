//! Blocking HTTP client shared by every feed and the URL resolver.
//!
//! Unlike most HTTP clients there is no retry here: a non-200 on a
//! candidate URL means "not published yet" and the resolver moves on,
//! and a failed payload fetch ends the run.

use std::time::Duration;

use super::FetchError;
use crate::config::HttpConfig;

/// Anything that can answer "what status does a GET of this URL return".
pub trait Probe {
    fn status(&self, provider: &str, url: &str) -> Result<u16, FetchError>;
}

pub struct FetchClient {
    http: reqwest::blocking::Client,
}

impl FetchClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    /// GET `url` and return the body. Anything but 200 is an error.
    pub fn get_text(&self, provider: &str, url: &str) -> Result<String, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            provider: provider.to_string(),
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.http.get(url).send().map_err(transport)?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(FetchError::Status {
                provider: provider.to_string(),
                url: url.to_string(),
                status,
            });
        }

        let text = resp.text().map_err(transport)?;
        // Some S3 objects are served with a BOM.
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }
}

impl Probe for FetchClient {
    fn status(&self, provider: &str, url: &str) -> Result<u16, FetchError> {
        let resp = self.http.get(url).send().map_err(|e| FetchError::Transport {
            provider: provider.to_string(),
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(resp.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> FetchClient {
        FetchClient::new(&HttpConfig::default()).unwrap()
    }

    #[test]
    fn get_text_strips_bom() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/data.js");
            then.status(200).body("\u{feff}var data = [];");
        });

        let body = client().get_text("Co-op", &server.url("/data.js")).unwrap();
        assert_eq!(body, "var data = [];");
    }

    #[test]
    fn get_text_non_200_is_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(403);
        });

        let err = client().get_text("Co-op", &server.url("/missing")).unwrap_err();
        match err {
            FetchError::Status { status, .. } => assert_eq!(status, 403),
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn probe_reports_status_without_failing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/a");
            then.status(404);
        });
        assert_eq!(client().status("Co-op", &server.url("/a")).unwrap(), 404);
    }

    #[test]
    fn probe_transport_error_names_the_provider() {
        // Nothing listens on port 9 (discard) on a test host.
        let err = client()
            .status("American Electric Power", "http://127.0.0.1:9/report.json")
            .unwrap_err();
        assert!(
            err.to_string().starts_with("American Electric Power: request to http://127.0.0.1:9/"),
            "{err}"
        );
    }
}
