use reqwest::multipart::{Form, Part};
use shared::{
    error::SubmitError,
    protocol::{AnalyzeResponse, MatchResult},
};
use tracing::{info, warn};

/// Client for the remote analysis endpoint.
pub struct AnalyzeClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalyzeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Submit one photo and return the ranked matches.
    ///
    /// A non-success status carries the HTTP code into the error so the
    /// surface can show it; everything else degrades to the generic network
    /// failure. `results` defaults to empty when the body omits it.
    pub async fn analyze(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<MatchResult>, SubmitError> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(format!("{}/analyze", self.base_url.trim_end_matches('/')))
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!("analysis request failed to send: {err}");
                SubmitError::Network(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "analysis request rejected");
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|err| SubmitError::Network(err.to_string()))?;
        info!(results = body.results.len(), "analysis completed");
        Ok(body.results)
    }
}

#[cfg(test)]
#[path = "tests/analyze_tests.rs"]
mod tests;
