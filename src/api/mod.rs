use crate::config::EnvConfig;
use crate::models::{
    GetNotesResponse, SaveNotesRequest, SaveNotesResponse, StoredNote,
};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Network,
    Http,
    Parse,
    /// The backend answered 2xx but with `success: false`.
    Rejected,
    /// No browser environment to issue the request from.
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn network(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub fn http(status: u16, body: &str, ctx: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("{ctx}: HTTP error! status: {status}")
        } else {
            format!("{ctx}: HTTP error! status: {status} {body}")
        };
        Self {
            kind: ApiErrorKind::Http,
            message,
        }
    }

    pub fn rejected(reason: Option<String>, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Rejected,
            message: format!("{ctx}: {}", reason.unwrap_or_else(|| "rejected".to_string())),
        }
    }

    pub fn unavailable(what: &str) -> Self {
        Self {
            kind: ApiErrorKind::Unavailable,
            message: format!("{what} is not available"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// The notes backend.
///
/// `write` and `read` are the normal async paths. `write_blocking` is only
/// for page teardown, where an async request may never be sent.
pub(crate) trait RemoteStore {
    async fn write(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<DateTime<Utc>>;

    async fn read(&self, resource_id: &str) -> ApiResult<StoredNote>;

    fn write_blocking(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<()>;
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) csrf_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: None,
        }
    }

    pub fn from_config(cfg: &EnvConfig) -> Self {
        let mut client = Self::new(cfg.api_url.clone());
        client.csrf_token = cfg.csrf_token.clone();
        client
    }

    pub(crate) fn save_url(&self, resource_id: &str) -> String {
        format!(
            "{}/api/save_notes/{}",
            self.base_url,
            urlencoding::encode(resource_id)
        )
    }

    pub(crate) fn load_url(&self, resource_id: &str) -> String {
        format!(
            "{}/api/get_notes/{}",
            self.base_url,
            urlencoding::encode(resource_id)
        )
    }

    // reqwest needs an absolute URL; an empty base means same-origin.
    fn absolute(url: String) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url;
        }
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        format!("{origin}{url}")
    }

    fn with_csrf(mut req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        if let Some(token) = token {
            req = req.header("X-CSRFToken", token);
        }
        req
    }

    async fn check_status(res: reqwest::Response, ctx: &str) -> ApiResult<reqwest::Response> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::http(status, &body, ctx))
    }

    pub async fn save_notes(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<SaveNotesResponse> {
        let client = reqwest::Client::new();
        let req = client
            .post(Self::absolute(self.save_url(resource_id)))
            .json(&SaveNotesRequest {
                notes: content.to_string(),
                timestamp,
                is_autosave: None,
            });
        let req = Self::with_csrf(req, self.csrf_token.as_deref());

        let res = req.send().await.map_err(ApiError::network)?;
        let res = Self::check_status(res, "Save failed").await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn get_notes(&self, resource_id: &str) -> ApiResult<GetNotesResponse> {
        let client = reqwest::Client::new();
        let res = client
            .get(Self::absolute(self.load_url(resource_id)))
            .send()
            .await
            .map_err(ApiError::network)?;
        let res = Self::check_status(res, "Load failed").await?;
        res.json().await.map_err(ApiError::parse)
    }

    /// Synchronous `XMLHttpRequest`; the only request a browser reliably
    /// sends while the page is going away.
    pub fn save_notes_blocking(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<()> {
        if web_sys::window().is_none() {
            return Err(ApiError::unavailable("window"));
        }

        let body = serde_json::to_string(&SaveNotesRequest {
            notes: content.to_string(),
            timestamp,
            is_autosave: Some(true),
        })
        .map_err(ApiError::parse)?;

        let js_err = |e: wasm_bindgen::JsValue| ApiError::network(format!("{e:?}"));
        let xhr = web_sys::XmlHttpRequest::new().map_err(js_err)?;
        xhr.open_with_async("POST", &self.save_url(resource_id), false)
            .map_err(js_err)?;
        xhr.set_request_header("Content-Type", "application/json")
            .map_err(js_err)?;
        if let Some(token) = &self.csrf_token {
            xhr.set_request_header("X-CSRFToken", token).map_err(js_err)?;
        }
        xhr.send_with_opt_str(Some(&body)).map_err(js_err)?;

        let status = xhr.status().map_err(js_err)?;
        if (200..300).contains(&status) {
            Ok(())
        } else {
            let text = xhr.response_text().ok().flatten().unwrap_or_default();
            Err(ApiError::http(status, &text, "Save on exit failed"))
        }
    }
}

impl RemoteStore for ApiClient {
    async fn write(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<DateTime<Utc>> {
        let res = self.save_notes(resource_id, content, timestamp).await?;
        if !res.success {
            return Err(ApiError::rejected(res.error, "Save failed"));
        }
        Ok(res.timestamp.unwrap_or(timestamp))
    }

    async fn read(&self, resource_id: &str) -> ApiResult<StoredNote> {
        let res = self.get_notes(resource_id).await?;
        if !res.success {
            return Err(ApiError::rejected(
                res.error.or_else(|| Some("Failed to load notes".to_string())),
                "Load failed",
            ));
        }
        Ok(StoredNote {
            content: res.notes.unwrap_or_default(),
            last_updated: res.last_updated.or(res.updated_at),
        })
    }

    fn write_blocking(
        &self,
        resource_id: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> ApiResult<()> {
        self.save_notes_blocking(resource_id, content, timestamp)
    }
}
