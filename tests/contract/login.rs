use std::sync::{Arc, Mutex};

use bpb_wizard::config::OAuthConfig;
use bpb_wizard::oauth::{AuthError, UrlOpener};
use bpb_wizard::wizard::OAuthLogin;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Plays the browser: follows the authorization URL straight to the callback.
struct CallbackOpener {
    port: u16,
    /// Replaces the issued state when set.
    forced_state: Option<String>,
    status: Arc<Mutex<Option<u16>>>,
}

impl UrlOpener for CallbackOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let issued = url
            .split(['?', '&'])
            .find_map(|kv| kv.strip_prefix("state="))
            .unwrap_or_default()
            .to_string();
        let state = self.forced_state.clone().unwrap_or(issued);
        let callback = format!(
            "http://127.0.0.1:{}/oauth/callback?code=auth-code&state={state}",
            self.port
        );
        let status = self.status.clone();
        tokio::spawn(async move {
            let response = reqwest::get(&callback).await.unwrap();
            *status.lock().unwrap() = Some(response.status().as_u16());
        });
        Ok(())
    }
}

/// The callback response lands shortly after the token is delivered.
async fn wait_for_status(status: &Mutex<Option<u16>>) -> Option<u16> {
    for _ in 0..50 {
        if let Some(code) = *status.lock().unwrap() {
            return Some(code);
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    None
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn oauth_config(token_url: String, port: u16, timeout_secs: u64) -> OAuthConfig {
    OAuthConfig {
        token_url,
        callback_port: port,
        login_timeout_secs: timeout_secs,
        shutdown_timeout_secs: 2,
        ..OAuthConfig::default()
    }
}

#[tokio::test]
async fn test_browser_login_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let port = free_port();
    let config = oauth_config(format!("{}/oauth2/token", server.uri()), port, 10);
    let login = OAuthLogin::start(&config, reqwest::Client::new()).await.unwrap();

    let status = Arc::new(Mutex::new(None));
    let opener = Arc::new(CallbackOpener {
        port,
        forced_state: None,
        status: status.clone(),
    });

    let token = login.login(opener).await.unwrap();
    assert_eq!(token.access_token, "at-1");
    assert_eq!(token.refresh_token.as_deref(), Some("rt-1"));

    assert!(login.shutdown().await);
    assert_eq!(wait_for_status(&status).await, Some(200));
}

#[tokio::test]
async fn test_wrong_state_fails_login_without_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let port = free_port();
    let config = oauth_config(format!("{}/oauth2/token", server.uri()), port, 1);
    let login = OAuthLogin::start(&config, reqwest::Client::new()).await.unwrap();

    let status = Arc::new(Mutex::new(None));
    let opener = Arc::new(CallbackOpener {
        port,
        forced_state: Some("wrong".to_string()),
        status: status.clone(),
    });

    let err = login.login(opener).await.unwrap_err();
    assert!(matches!(err, AuthError::StateMismatch));
    assert_eq!(wait_for_status(&status).await, Some(400));

    assert!(login.shutdown().await);
}

#[tokio::test]
async fn test_port_in_use_is_reported() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let config = oauth_config("http://127.0.0.1:1/token".to_string(), port, 1);

    let err = match OAuthLogin::start(&config, reqwest::Client::new()).await {
        Ok(_) => panic!("listener should not bind an occupied port"),
        Err(e) => e,
    };
    assert!(matches!(err, AuthError::Listener { .. }));
}
