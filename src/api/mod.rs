//! REST client for the question service
//!
//! One method per backend endpoint. Every response goes through
//! [`ApiClient::check`], which turns a 401 into [`AppError::Unauthorized`] and
//! any other non-2xx into the body's `detail`/`error` message.

pub mod models;

pub use models::*;

use models::{
    AssignmentRequest, GenStatsRequest, QueriesResponse, SpeakerStatsRequest,
    SpeakerStatsResponse, SuggestRequest, ToggleFeaturedResponse,
};

use crate::config::ClientConfig;
use crate::error::AppError;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    base_path: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        // No client-wide timeout: only the ask request carries one.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            base_path: config.resolved_base_path(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Scheme and host, used to build absolute share links
    pub fn origin(&self) -> &str {
        &self.base_url
    }

    /// Site path for `endpoint`, prefixed with the mount point
    pub fn api_path(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_path, endpoint)
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, self.api_path(endpoint))
    }

    pub fn login_url(&self) -> String {
        self.url("/admin/login")
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(endpoint));
        match &self.session_cookie {
            Some(cookie) => builder.header(reqwest::header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn check(&self, response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            log::warn!("{} returned 401, login required", response.url().path());
            return Err(AppError::Unauthorized {
                login_url: self.login_url(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
        log::warn!("Backend error {}: {}", status, message);
        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        let response = self.request(Method::GET, endpoint).send().await?;
        Ok(self.check(response).await?.json().await?)
    }

    async fn send_json<B, T>(&self, method: Method, endpoint: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(method, endpoint).json(body).send().await?;
        Ok(self.check(response).await?.json().await?)
    }

    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<(), AppError> {
        let mut builder = self.request(method, endpoint);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        self.check(response).await?;
        Ok(())
    }

    // ── Ask ────────────────────────────────────────────────────────────────

    pub async fn ask(&self, request: &AskRequest) -> Result<AskResponse, AppError> {
        log::info!(
            "Asking (lang={}, skip_similarity_check={}): {} chars",
            request.language,
            request.skip_similarity_check,
            request.question.len()
        );
        self.send_json(Method::POST, "/api/ask", request).await
    }

    pub async fn saved_query(&self, uuid: &str) -> Result<AskResponse, AppError> {
        self.get_json(&format!("/api/savedquery/{}", uuid)).await
    }

    // ── Admin: queries ─────────────────────────────────────────────────────

    pub async fn admin_queries(&self) -> Result<Vec<Query>, AppError> {
        let data: QueriesResponse = self.get_json("/api/admin/queries").await?;
        Ok(data.queries)
    }

    pub async fn toggle_featured(&self, uuid: &str) -> Result<bool, AppError> {
        let response = self
            .request(Method::POST, &format!("/api/admin/toggle_featured/{}", uuid))
            .send()
            .await?;
        let data: ToggleFeaturedResponse = self.check(response).await?.json().await?;
        Ok(data.featured)
    }

    // ── Admin: categories ──────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<CategoriesResponse, AppError> {
        self.get_json("/api/admin/categories").await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<(), AppError> {
        log::info!("Creating category {} ({})", input.name, input.slug);
        self.send_unit(Method::POST, "/api/admin/categories", Some(input))
            .await
    }

    pub async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<(), AppError> {
        log::info!("Updating category {}: {} ({})", id, input.name, input.slug);
        self.send_unit(Method::PUT, &format!("/api/admin/categories/{}", id), Some(input))
            .await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        log::info!("Deleting category {}", id);
        self.send_unit::<()>(Method::DELETE, &format!("/api/admin/categories/{}", id), None)
            .await
    }

    pub async fn assign_category(&self, query_id: i64, category_id: i64) -> Result<(), AppError> {
        log::info!("Assigning category {} to query {}", category_id, query_id);
        let body = AssignmentRequest {
            query_id,
            category_id,
        };
        self.send_unit(Method::POST, "/api/admin/assign_category", Some(&body))
            .await
    }

    pub async fn remove_category_assignment(
        &self,
        query_id: i64,
        category_id: i64,
    ) -> Result<(), AppError> {
        log::info!("Removing category {} from query {}", category_id, query_id);
        let body = AssignmentRequest {
            query_id,
            category_id,
        };
        self.send_unit(Method::POST, "/api/admin/remove_category_assignment", Some(&body))
            .await
    }

    // ── Admin: LLM categorisation ──────────────────────────────────────────

    pub async fn suggest_categories(&self, model: &str) -> Result<LlmProposal, AppError> {
        log::info!("Requesting category proposal from model {}", model);
        self.send_json(
            Method::POST,
            "/api/admin/suggest_categories",
            &SuggestRequest { model },
        )
        .await
    }

    pub async fn apply_categories(&self, request: &ApplyRequest) -> Result<ApplyResult, AppError> {
        log::info!(
            "Applying proposal: {} categories, {} assignments, {} reparents",
            request.categories.len(),
            request.assignments.len(),
            request.reparents.len()
        );
        self.send_json(Method::POST, "/api/admin/apply_categories", request)
            .await
    }

    // ── Speaker statistics ─────────────────────────────────────────────────

    pub async fn gen_stats(&self, from: &str, to: &str) -> Result<GenStats, AppError> {
        log::info!("Loading speakers for {} .. {}", from, to);
        let body = GenStatsRequest {
            fromdate: from.to_string(),
            todate: to.to_string(),
        };
        self.send_json(Method::POST, "/api/gen_stats", &body).await
    }

    pub async fn speaker_stats(
        &self,
        tags: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<SpeakerStat>, AppError> {
        log::info!("Requesting stats for {} speakers ({} .. {})", tags.len(), from, to);
        let body = SpeakerStatsRequest {
            tags,
            fromdate: from.to_string(),
            todate: to.to_string(),
        };
        let data: SpeakerStatsResponse =
            self.send_json(Method::POST, "/api/speaker_stats", &body).await?;
        data.stats
            .ok_or_else(|| AppError::Json("Response does not contain a stats array".into()))
    }
}

/// Pull the user-facing message out of an error body (`detail`, then `error`)
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error"].iter().find_map(|key| match value.get(*key)? {
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    })
}
