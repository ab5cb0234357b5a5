//! HTTP implementation of [`DashboardBackend`] against the dashboard
//! execution API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use dashboard_protocol::backend::{
    DashboardBackend, WidgetCreate, WidgetOrderItem, WidgetUpdate,
};
use dashboard_protocol::error::{DashboardApiError, DashboardApiResult};
use dashboard_protocol::ids::{DashboardId, WidgetId};
use dashboard_protocol::model::{Dashboard, ExecutionResultMap, Widget};

const DEFAULT_DASHBOARD_API_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_DASHBOARD_REQUEST_TIMEOUT_SECS: u64 = 30;
const ENV_DASHBOARD_API_URL: &str = "DASHBOARD_API_URL";
const ENV_DASHBOARD_API_TOKEN: &str = "DASHBOARD_API_TOKEN";
const ENV_DASHBOARD_API_TIMEOUT_SECS: &str = "DASHBOARD_API_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct DashboardApiConfig {
    pub api_url: String,
    pub api_token: String,
    pub request_timeout: Duration,
}

impl Default for DashboardApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_DASHBOARD_API_URL.to_owned(),
            api_token: String::new(),
            request_timeout: Duration::from_secs(DEFAULT_DASHBOARD_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl DashboardApiConfig {
    pub fn from_env() -> DashboardApiResult<Self> {
        let api_token = std::env::var(ENV_DASHBOARD_API_TOKEN).map_err(|_| {
            DashboardApiError::Configuration(
                "DASHBOARD_API_TOKEN is not set. Export a valid API token before using dashboard-http."
                    .to_owned(),
            )
        })?;
        let api_token = api_token.trim().to_owned();
        if api_token.is_empty() {
            return Err(DashboardApiError::Configuration(
                "DASHBOARD_API_TOKEN is empty. Provide a non-empty API token.".to_owned(),
            ));
        }

        let api_url = std::env::var(ENV_DASHBOARD_API_URL)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DASHBOARD_API_URL.to_owned());

        let request_timeout = std::env::var(ENV_DASHBOARD_API_TIMEOUT_SECS)
            .ok()
            .and_then(|raw| {
                let value = raw.trim();
                if value.is_empty() {
                    return None;
                }
                Some(value.to_owned())
            })
            .map(|raw| {
                let seconds = raw.parse::<u64>().map_err(|_| {
                    DashboardApiError::Configuration(
                        "DASHBOARD_API_TIMEOUT_SECS must be a non-zero integer.".to_owned(),
                    )
                })?;
                if seconds == 0 {
                    return Err(DashboardApiError::Configuration(
                        "DASHBOARD_API_TIMEOUT_SECS must be greater than zero.".to_owned(),
                    ));
                }
                Ok(Duration::from_secs(seconds))
            })
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_DASHBOARD_REQUEST_TIMEOUT_SECS));

        Ok(Self {
            api_url,
            api_token,
            request_timeout,
        })
    }
}

#[derive(Clone)]
pub struct HttpDashboardBackend {
    config: DashboardApiConfig,
    client: Client,
}

impl HttpDashboardBackend {
    pub fn from_env() -> DashboardApiResult<Self> {
        Self::with_config(DashboardApiConfig::from_env()?)
    }

    pub fn with_config(config: DashboardApiConfig) -> DashboardApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        let token = header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .map_err(|error| {
                DashboardApiError::Configuration(format!(
                    "DASHBOARD_API_TOKEN is invalid: {error}"
                ))
            })?;
        headers.insert(header::AUTHORIZATION, token);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| {
                DashboardApiError::Configuration(format!(
                    "failed to build dashboard HTTP client: {error}"
                ))
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.api_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> DashboardApiResult<T> {
        let body = self.request_text(request).await?;
        serde_json::from_str(&body).map_err(|error| {
            DashboardApiError::DependencyUnavailable(format!(
                "dashboard API response was malformed JSON: {error}"
            ))
        })
    }

    async fn request_status_only(
        &self,
        request: reqwest::RequestBuilder,
    ) -> DashboardApiResult<()> {
        self.request_text(request).await.map(|_| ())
    }

    async fn request_text(&self, request: reqwest::RequestBuilder) -> DashboardApiResult<String> {
        let response = request.send().await.map_err(|error| {
            DashboardApiError::DependencyUnavailable(format!(
                "dashboard API request failed: {error}"
            ))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            DashboardApiError::DependencyUnavailable(format!(
                "dashboard API response read failed: {error}"
            ))
        })?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(status_error(status, &body))
        }
    }
}

#[async_trait]
impl DashboardBackend for HttpDashboardBackend {
    async fn get_dashboard(&self, dashboard_id: &DashboardId) -> DashboardApiResult<Dashboard> {
        let request = self
            .client
            .get(self.endpoint(&format!("dashboards/{}", dashboard_id.as_str())));
        self.request_json(request).await
    }

    async fn create_widget(
        &self,
        dashboard_id: &DashboardId,
        request: WidgetCreate,
    ) -> DashboardApiResult<Widget> {
        let request = self
            .client
            .post(self.endpoint(&format!("dashboards/{}/widgets", dashboard_id.as_str())))
            .json(&request);
        self.request_json(request).await
    }

    async fn update_widget(
        &self,
        widget_id: &WidgetId,
        request: WidgetUpdate,
    ) -> DashboardApiResult<Widget> {
        let request = self
            .client
            .put(self.endpoint(&format!("widgets/{}", widget_id.as_str())))
            .json(&request);
        self.request_json(request).await
    }

    async fn delete_widget(&self, widget_id: &WidgetId) -> DashboardApiResult<()> {
        let request = self
            .client
            .delete(self.endpoint(&format!("widgets/{}", widget_id.as_str())));
        self.request_status_only(request).await
    }

    async fn reorder_widgets(
        &self,
        dashboard_id: &DashboardId,
        items: &[WidgetOrderItem],
    ) -> DashboardApiResult<()> {
        let request = self
            .client
            .put(self.endpoint(&format!(
                "dashboards/{}/widgets/order",
                dashboard_id.as_str()
            )))
            .json(&items);
        self.request_status_only(request).await
    }

    async fn restore_default_dashboard(&self) -> DashboardApiResult<Dashboard> {
        let request = self
            .client
            .post(self.endpoint("dashboards/default/restore"));
        self.request_json(request).await
    }

    async fn refresh_execution(
        &self,
        dashboard_id: &DashboardId,
        params: &BTreeMap<String, String>,
    ) -> DashboardApiResult<ExecutionResultMap> {
        let request = self
            .client
            .post(self.endpoint(&format!(
                "dashboards/{}/execution",
                dashboard_id.as_str()
            )))
            .json(params);
        self.request_json(request).await
    }
}

fn status_error(status: StatusCode, body: &str) -> DashboardApiError {
    let detail = error_detail(body).unwrap_or_else(|| body.to_owned());
    let message = format!("dashboard API request failed with status {status}: {detail}");
    if status == StatusCode::NOT_FOUND {
        DashboardApiError::NotFound(message)
    } else if status.is_client_error() {
        DashboardApiError::Rejected(message)
    } else {
        DashboardApiError::DependencyUnavailable(message)
    }
}

/// Error bodies carry a human-readable `detail` field; anything else is
/// passed through verbatim.
fn error_detail(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    payload
        .get("detail")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
