use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{ApiError, ApiResult, HttpRequest, HttpResponse, Transport};
use ripple_types::*;

/// Callback invoked for errors that need an app-wide reaction (forced
/// logout, redirect to login). Injected at construction; at most one
/// invocation per failed logical call.
pub type FatalErrorHook = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Per-call flags. Both default to off.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Treat a refreshable 401 as a plain error instead of refreshing
    /// and retrying. Used by the auth endpoints themselves.
    pub skip_refresh: bool,
    /// Never forward this call's errors to the fatal hook.
    pub skip_dispatch: bool,
}

impl RequestOptions {
    pub fn no_refresh() -> Self {
        Self {
            skip_refresh: true,
            ..Default::default()
        }
    }

    /// Options for the auth endpoints themselves: a 401 there is a
    /// credential failure for the caller to handle, never an expired
    /// session to refresh or a fatal error to dispatch.
    pub fn credential_call() -> Self {
        Self {
            skip_refresh: true,
            skip_dispatch: true,
        }
    }
}

/// Outcome of a failed session refresh. Classified failures carry the
/// refresh endpoint's own error envelope; unclassified ones (network
/// drop, unparseable body) mean the original 401 is surfaced instead.
#[derive(Debug, Clone)]
enum RefreshFailure {
    Classified {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    Unclassified,
}

#[derive(Default)]
struct RefreshGate {
    /// Bumped once per completed refresh attempt. Read without the lock
    /// at 401 time, so callers whose 401 predates an in-flight refresh
    /// coalesce onto it instead of issuing their own.
    epoch: std::sync::atomic::AtomicU64,
    last_failure: tokio::sync::Mutex<Option<RefreshFailure>>,
}

/// API client for the Ripple backend.
///
/// Wraps every outgoing call with session-expiry recovery: a 401
/// carrying a refreshable error code triggers one single-flight refresh
/// and one retry of the original request. Unrecoverable auth failures
/// are forwarded to the injected [`FatalErrorHook`]; everything else is
/// returned to the caller for local handling.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    refresh: Arc<RefreshGate>,
    fatal_hook: Option<FatalErrorHook>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            refresh: Arc::new(RefreshGate::default()),
            fatal_hook: None,
        }
    }

    /// Registers the single fatal-error subscriber.
    pub fn with_fatal_hook(mut self, hook: FatalErrorHook) -> Self {
        self.fatal_hook = Some(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Issues a request and decodes the success envelope into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        self.request_with(method, path, body, RequestOptions::default())
            .await
    }

    pub async fn request_with<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let response = self.perform(method, path, body, options).await?;
        Self::decode_success(&response)
    }

    /// Issues a GET against a cursor-paged list endpoint.
    pub async fn request_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        cursor: Option<&str>,
    ) -> ApiResult<Page<T>> {
        let path = match cursor {
            Some(cursor) => {
                let sep = if path.contains('?') { '&' } else { '?' };
                format!("{}{}cursor={}", path, sep, urlencoding::encode(cursor))
            }
            None => path.to_string(),
        };
        let response = self
            .perform(Method::GET, &path, None, RequestOptions::default())
            .await?;
        Self::decode_page(&response)
    }

    /// The request state machine: issue, refresh-and-retry once on a
    /// refreshable 401, dispatch terminal failures. Returns the final
    /// raw response; decoding is the caller's concern.
    async fn perform(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> ApiResult<HttpResponse> {
        let request = HttpRequest {
            method,
            url: self.url(path),
            body,
        };

        // Network-level failures propagate unchanged from here and from
        // the retry below: no retry, no classification, no dispatch.
        let response = self.transport.send(request.clone()).await?;
        if response.is_success() {
            return Ok(response);
        }

        let error = Self::parse_error(&response);
        if !error.is_refreshable_auth() || options.skip_refresh {
            if error.is_auto_handleable() {
                self.dispatch(&error, options);
            }
            return Err(error);
        }

        log::info!(
            "session expired on {} {}, refreshing",
            request.method,
            request.url
        );

        match self.refresh_session().await {
            Ok(()) => {
                let retried = self.transport.send(request).await?;
                if retried.is_success() {
                    return Ok(retried);
                }
                // A second failure after the one retry is terminal; in
                // particular a second 401 is never refreshed again.
                let retry_error = Self::parse_error(&retried);
                if retry_error.status() == Some(401) || retry_error.is_auto_handleable() {
                    self.dispatch(&retry_error, options);
                }
                Err(retry_error)
            }
            Err(RefreshFailure::Classified {
                status,
                code,
                message,
            }) => {
                let surfaced = ApiError::Server {
                    status,
                    code,
                    message,
                };
                self.dispatch(&surfaced, options);
                Err(surfaced)
            }
            Err(RefreshFailure::Unclassified) => {
                // The refresh itself died without a usable error body;
                // fall back to surfacing the original 401.
                self.dispatch(&error, options);
                Err(error)
            }
        }
    }

    fn dispatch(&self, error: &ApiError, options: RequestOptions) {
        if options.skip_dispatch {
            return;
        }
        if let Some(hook) = &self.fatal_hook {
            log::warn!("dispatching to fatal error hook: {}", error);
            hook(error);
        }
    }

    /// Single-flight session refresh.
    ///
    /// Callers that hit a 401 under the same epoch coalesce onto one
    /// `POST /auth/refresh`: the first to acquire the lock issues it,
    /// later arrivals observe the bumped epoch and adopt its outcome.
    async fn refresh_session(&self) -> Result<(), RefreshFailure> {
        use std::sync::atomic::Ordering;

        let observed_epoch = self.refresh.epoch.load(Ordering::SeqCst);

        let mut last_failure = self.refresh.last_failure.lock().await;
        if self.refresh.epoch.load(Ordering::SeqCst) != observed_epoch {
            // A refresh completed while we waited for the lock; adopt
            // its outcome rather than issuing another.
            return match &*last_failure {
                None => Ok(()),
                Some(failure) => Err(failure.clone()),
            };
        }

        log::info!("issuing session refresh");
        let request = HttpRequest {
            method: Method::POST,
            url: self.url("/auth/refresh"),
            body: None,
        };

        let outcome = match self.transport.send(request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => match serde_json::from_slice::<ErrorBody>(&response.body) {
                Ok(body) => Err(RefreshFailure::Classified {
                    status: response.status,
                    code: ErrorCode::parse(&body.code),
                    message: body.message,
                }),
                Err(_) => Err(RefreshFailure::Unclassified),
            },
            Err(error) => {
                log::warn!("session refresh failed at network level: {}", error);
                Err(RefreshFailure::Unclassified)
            }
        };

        *last_failure = outcome.as_ref().err().cloned();
        self.refresh.epoch.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// Maps a non-2xx response to an [`ApiError::Server`].
    fn parse_error(response: &HttpResponse) -> ApiError {
        match serde_json::from_slice::<ErrorBody>(&response.body) {
            Ok(body) => ApiError::Server {
                status: response.status,
                code: ErrorCode::parse(&body.code),
                message: body.message,
            },
            Err(_) => {
                let text = String::from_utf8_lossy(&response.body);
                // Clean up HTML error pages (e.g. from a proxy 404)
                let message = if text.contains("<html>") || text.contains("<!DOCTYPE") {
                    format!(
                        "Server returned {} error. Please check the server URL.",
                        response.status
                    )
                } else {
                    text.trim().to_string()
                };
                ApiError::Server {
                    status: response.status,
                    code: ErrorCode::parse("UNKNOWN"),
                    message,
                }
            }
        }
    }

    fn decode_success<T: DeserializeOwned>(response: &HttpResponse) -> ApiResult<T> {
        let envelope: ApiEnvelope = serde_json::from_slice(&response.body)?;
        if !envelope.success {
            return Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "request reported failure".to_string()),
            ));
        }
        Ok(serde_json::from_value(envelope.data)?)
    }

    fn decode_page<T: DeserializeOwned>(response: &HttpResponse) -> ApiResult<Page<T>> {
        let envelope: ApiEnvelope = serde_json::from_slice(&response.body)?;
        if !envelope.success {
            return Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "request reported failure".to_string()),
            ));
        }
        let items: Vec<T> = serde_json::from_value(envelope.data)?;
        let next_cursor = envelope
            .pagination
            .and_then(|p| if p.has_more { p.next_cursor } else { None });
        Ok(Page::new(items, next_cursor))
    }

    async fn post_unit(&self, path: &str) -> ApiResult<()> {
        self.request::<serde_json::Value>(Method::POST, path, None)
            .await?;
        Ok(())
    }

    async fn delete_unit(&self, path: &str) -> ApiResult<()> {
        self.request::<serde_json::Value>(Method::DELETE, path, None)
            .await?;
        Ok(())
    }

    // Authentication endpoints. These suppress auto-refresh: a 401 from
    // login is a login failure, not an expired session.

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<User> {
        self.request_with(
            Method::POST,
            "/auth/login",
            Some(serde_json::to_value(request)?),
            RequestOptions::credential_call(),
        )
        .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        self.request_with(
            Method::POST,
            "/auth/register",
            Some(serde_json::to_value(request)?),
            RequestOptions::credential_call(),
        )
        .await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.request_with::<serde_json::Value>(
            Method::POST,
            "/auth/logout",
            None,
            RequestOptions::credential_call(),
        )
        .await?;
        Ok(())
    }

    /// Current session's user. Refresh applies here: an expired cookie
    /// session recovers transparently.
    pub async fn me(&self) -> ApiResult<User> {
        self.request(Method::GET, "/auth/me", None).await
    }

    // Feed, reels, stories

    pub async fn get_feed(&self, cursor: Option<&str>) -> ApiResult<Page<Post>> {
        self.request_paged("/feed", cursor).await
    }

    pub async fn get_reels(&self, cursor: Option<&str>) -> ApiResult<Page<Reel>> {
        self.request_paged("/reels", cursor).await
    }

    pub async fn get_stories(&self) -> ApiResult<Vec<Story>> {
        self.request(Method::GET, "/stories", None).await
    }

    pub async fn mark_story_viewed(&self, story_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/stories/{}/view", story_id)).await
    }

    // Post endpoints

    pub async fn get_post(&self, post_id: &str) -> ApiResult<Post> {
        self.request(Method::GET, &format!("/posts/{}", post_id), None)
            .await
    }

    pub async fn create_post(&self, request: &CreatePostRequest) -> ApiResult<Post> {
        self.request(Method::POST, "/posts", Some(serde_json::to_value(request)?))
            .await
    }

    pub async fn like_post(&self, post_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/posts/{}/like", post_id)).await
    }

    pub async fn unlike_post(&self, post_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/posts/{}/like", post_id)).await
    }

    pub async fn save_post(&self, post_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/posts/{}/save", post_id)).await
    }

    pub async fn unsave_post(&self, post_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/posts/{}/save", post_id)).await
    }

    pub async fn delete_post(&self, post_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/posts/{}", post_id)).await
    }

    // Reel endpoints

    pub async fn like_reel(&self, reel_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/reels/{}/like", reel_id)).await
    }

    pub async fn unlike_reel(&self, reel_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/reels/{}/like", reel_id)).await
    }

    pub async fn save_reel(&self, reel_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/reels/{}/save", reel_id)).await
    }

    pub async fn unsave_reel(&self, reel_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/reels/{}/save", reel_id)).await
    }

    // Comment endpoints

    pub async fn get_comments(
        &self,
        post_id: &str,
        cursor: Option<&str>,
    ) -> ApiResult<Page<Comment>> {
        self.request_paged(&format!("/posts/{}/comments", post_id), cursor)
            .await
    }

    pub async fn create_comment(
        &self,
        post_id: &str,
        request: &CreateCommentRequest,
    ) -> ApiResult<CreateCommentResponse> {
        self.request(
            Method::POST,
            &format!("/posts/{}/comments", post_id),
            Some(serde_json::to_value(request)?),
        )
        .await
    }

    pub async fn edit_comment(
        &self,
        comment_id: &str,
        request: &EditCommentRequest,
    ) -> ApiResult<()> {
        self.request::<serde_json::Value>(
            Method::PUT,
            &format!("/comments/{}", comment_id),
            Some(serde_json::to_value(request)?),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_comment(&self, comment_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/comments/{}", comment_id)).await
    }

    pub async fn like_comment(&self, comment_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/comments/{}/like", comment_id))
            .await
    }

    pub async fn unlike_comment(&self, comment_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/comments/{}/like", comment_id))
            .await
    }

    // Profile and social endpoints

    pub async fn get_profile(&self, user_id: &str) -> ApiResult<UserProfile> {
        self.request(Method::GET, &format!("/users/{}/profile", user_id), None)
            .await
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> ApiResult<UserProfile> {
        self.request(
            Method::PUT,
            "/users/me/profile",
            Some(serde_json::to_value(request)?),
        )
        .await
    }

    pub async fn follow_user(&self, user_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/users/{}/follow", user_id)).await
    }

    pub async fn unfollow_user(&self, user_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/users/{}/follow", user_id)).await
    }

    // Search endpoints

    pub async fn search_users(&self, query: &str, cursor: Option<&str>) -> ApiResult<Page<User>> {
        self.request_paged(
            &format!("/search/users?q={}", urlencoding::encode(query)),
            cursor,
        )
        .await
    }

    pub async fn get_hashtag_posts(
        &self,
        hashtag: &str,
        cursor: Option<&str>,
    ) -> ApiResult<Page<Post>> {
        self.request_paged(
            &format!("/hashtags/{}/posts", urlencoding::encode(hashtag)),
            cursor,
        )
        .await
    }

    // Messaging endpoints

    pub async fn get_conversations(&self, cursor: Option<&str>) -> ApiResult<Page<Conversation>> {
        self.request_paged("/conversations", cursor).await
    }

    pub async fn get_messages(
        &self,
        conversation_id: &str,
        cursor: Option<&str>,
    ) -> ApiResult<Page<Message>> {
        self.request_paged(
            &format!("/conversations/{}/messages", conversation_id),
            cursor,
        )
        .await
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        request: &SendMessageRequest,
    ) -> ApiResult<SendMessageResponse> {
        self.request(
            Method::POST,
            &format!("/conversations/{}/messages", conversation_id),
            Some(serde_json::to_value(request)?),
        )
        .await
    }

    pub async fn mark_conversation_read(&self, conversation_id: &str) -> ApiResult<()> {
        self.post_unit(&format!("/conversations/{}/read", conversation_id))
            .await
    }

    pub async fn delete_message(&self, message_id: &str) -> ApiResult<()> {
        self.delete_unit(&format!("/messages/{}", message_id)).await
    }

    // Notifications

    pub async fn get_notifications(&self, cursor: Option<&str>) -> ApiResult<Page<Notification>> {
        self.request_paged("/notifications", cursor).await
    }
}
