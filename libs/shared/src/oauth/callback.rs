//! Loopback HTTP listener that receives the authorization code redirect.

use super::error::{OAuthError, OAuthResult};
use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Notify, oneshot};
use tracing::debug;

pub const LOGIN_SUCCESS_PATH: &str = "/login-successful";

const SUCCESS_PAGE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<OAuthResult<String>>>>,
    success_page: String,
    page_served: Notify,
}

impl CallbackState {
    fn deliver(&self, result: OAuthResult<String>) {
        if let Ok(mut guard) = self.sender.lock()
            && let Some(sender) = guard.take()
        {
            let _ = sender.send(result);
        }
    }
}

/// Listener bound to an ephemeral port on the loopback interface.
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    pub async fn bind() -> OAuthResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    /// Serve until the identity provider redirects back, returning the authorization code.
    pub async fn wait_for_code(
        self,
        expected_state: &str,
        success_page: String,
    ) -> OAuthResult<String> {
        let (sender, receiver) = oneshot::channel();
        let state = Arc::new(CallbackState {
            expected_state: expected_state.to_string(),
            sender: Mutex::new(Some(sender)),
            success_page,
            page_served: Notify::new(),
        });

        let app = Router::new()
            .route("/", get(handle_redirect))
            .route(LOGIN_SUCCESS_PATH, get(handle_success_page))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!("listening for response from authentication server");
        let result = receiver
            .await
            .unwrap_or_else(|_| Err(OAuthError::callback("callback server stopped")));

        if result.is_ok() {
            let _ = tokio::time::timeout(SUCCESS_PAGE_GRACE, state.page_served.notified()).await;
        }
        let _ = shutdown_tx.send(());
        let _ = server.await;

        result
    }
}

async fn handle_redirect(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    debug!("received request from authentication server");

    let outcome = match (params.error, params.code) {
        (Some(error), _) => Err(OAuthError::callback(format!(
            "{}: {}",
            error,
            params.error_description.unwrap_or_default()
        ))),
        (None, None) => Err(OAuthError::callback("could not find 'code' URL parameter")),
        (None, Some(code)) if params.state.as_deref() == Some(state.expected_state.as_str()) => {
            Ok(code)
        }
        (None, Some(_)) => Err(OAuthError::StateMismatch),
    };

    match outcome {
        Ok(code) => {
            state.deliver(Ok(code));
            Redirect::to(LOGIN_SUCCESS_PATH).into_response()
        }
        Err(e) => {
            let body = e.to_string();
            state.deliver(Err(e));
            (axum::http::StatusCode::BAD_REQUEST, body).into_response()
        }
    }
}

async fn handle_success_page(State(state): State<Arc<CallbackState>>) -> Html<String> {
    state.page_served.notify_one();
    Html(state.success_page.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receives_code_and_serves_success_page() {
        let listener = CallbackListener::bind().await.unwrap();
        let port = listener.port();
        assert_eq!(listener.redirect_url(), format!("http://localhost:{port}"));

        let waiter = tokio::spawn(listener.wait_for_code("expected", "<h1>ok</h1>".to_string()));

        let page = reqwest::get(format!(
            "http://127.0.0.1:{port}/?code=the-code&state=expected"
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
        assert_eq!(page, "<h1>ok</h1>");

        assert_eq!(waiter.await.unwrap().unwrap(), "the-code");
    }

    #[tokio::test]
    async fn test_state_mismatch_is_rejected() {
        let listener = CallbackListener::bind().await.unwrap();
        let port = listener.port();
        let waiter = tokio::spawn(listener.wait_for_code("expected", String::new()));

        let status = reqwest::get(format!("http://127.0.0.1:{port}/?code=c&state=forged"))
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 400);
        assert!(matches!(
            waiter.await.unwrap(),
            Err(OAuthError::StateMismatch)
        ));
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected() {
        let listener = CallbackListener::bind().await.unwrap();
        let port = listener.port();
        let waiter = tokio::spawn(listener.wait_for_code("s", String::new()));

        let _ = reqwest::get(format!("http://127.0.0.1:{port}/?state=s")).await;
        assert!(matches!(waiter.await.unwrap(), Err(OAuthError::Callback(_))));
    }
}
