//! HTTP client for the API with transparent access-token renewal.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use super::error::ClientError;
use super::session::Session;
use super::types::{
    CredentialsBody, MetricBatchBody, MetricInput, MetricRecord, MetricResponse, MetricsResponse,
    RefreshResponse, SignInResponse, SignUpResponse,
};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client holding the session context.
/// Clone is cheap; clones share the session, cookie jar and renewal lock.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base: Url,
    session: RwLock<Session>,
    /// Held for the duration of a refresh call so concurrent 401s renew once
    renewal: Mutex<()>,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:7291`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base,
                session: RwLock::new(Session::default()),
                renewal: Mutex::new(()),
            }),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base.join(path)?)
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> Session {
        self.inner.session.read().await.clone()
    }

    /// Replace the session, e.g. with one persisted from an earlier run.
    pub async fn restore_session(&self, session: Session) {
        *self.inner.session.write().await = session;
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ClientError::from_response(response).await)
        }
    }

    /// Create an account. Returns the registered email.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .inner
            .http
            .post(self.url("api/signup")?)
            .json(&CredentialsBody { email, password })
            .send()
            .await?;

        let body: SignUpResponse = Self::check(response).await?.json().await?;
        Ok(body.email)
    }

    /// Sign in. The access token goes into the session, the refresh cookie
    /// into the cookie jar.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .inner
            .http
            .post(self.url("api/signin")?)
            .json(&CredentialsBody { email, password })
            .send()
            .await?;

        let body: SignInResponse = Self::check(response).await?.json().await?;
        *self.inner.session.write().await =
            Session::authenticated(body.access_token, Some(body.email));
        debug!("Signed in");
        Ok(())
    }

    /// Sign out. The local session is cleared even if the server call fails.
    pub async fn log_out(&self) -> Result<(), ClientError> {
        let result: Result<(), ClientError> = async {
            let response = self
                .inner
                .http
                .post(self.url("api/logout")?)
                .send()
                .await?;
            Self::check(response).await.map(|_| ())
        }
        .await;

        self.inner.session.write().await.clear();
        result
    }

    pub async fn submit_metric(&self, metric: &MetricInput) -> Result<MetricRecord, ClientError> {
        let response = self.send(Method::POST, "api/metrix", Some(metric)).await?;
        let body: MetricResponse = response.json().await?;
        Ok(body.metric)
    }

    /// Submit several metrics at once. The server stores all or none.
    pub async fn submit_metrics(
        &self,
        metrics: &[MetricInput],
    ) -> Result<Vec<MetricRecord>, ClientError> {
        let response = self
            .send(Method::POST, "api/metrix", Some(&MetricBatchBody { metrics }))
            .await?;
        let body: MetricsResponse = response.json().await?;
        Ok(body.metrics)
    }

    pub async fn list_metrics(&self) -> Result<Vec<MetricRecord>, ClientError> {
        let response = self.send::<()>(Method::GET, "api/metrix", None).await?;
        let body: MetricsResponse = response.json().await?;
        Ok(body.metrics)
    }

    /// Send an authenticated request.
    ///
    /// On a 401 the access token is renewed once and the request retried
    /// once. If renewal fails the session is cleared, unless another task
    /// has already installed a different token, and
    /// `ClientError::SignInRequired` wraps the renewal error. Non-success
    /// responses become `ClientError::Api`.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ClientError> {
        let url = self.url(path)?;
        let token = self
            .inner
            .session
            .read()
            .await
            .access_token()
            .map(str::to_owned);

        let response = self
            .execute(method.clone(), url.clone(), body, token.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Self::check(response).await;
        }

        debug!(path = %path, "Access token rejected, renewing");
        let fresh = match self.renew(token.as_deref()).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "Session renewal failed, sign-in required");
                self.inner
                    .session
                    .write()
                    .await
                    .clear_if_current(token.as_deref());
                return Err(ClientError::SignInRequired(Box::new(e)));
            }
        };

        let retry = self.execute(method, url, body, Some(&fresh)).await?;
        Self::check(retry).await
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self.inner.http.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Obtain a fresh access token. `stale` is the token that was rejected;
    /// if another task already replaced it while we waited for the lock,
    /// that replacement is returned without calling the server.
    async fn renew(&self, stale: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.inner.renewal.lock().await;

        if let Some(current) = self.inner.session.read().await.access_token() {
            if Some(current) != stale {
                return Ok(current.to_string());
            }
        }

        let response = self
            .inner
            .http
            .post(self.url("api/refresh")?)
            .send()
            .await?;
        let body: RefreshResponse = Self::check(response).await?.json().await?;

        self.inner
            .session
            .write()
            .await
            .set_access_token(body.access_token.clone());
        debug!("Access token renewed");
        Ok(body.access_token)
    }
}
