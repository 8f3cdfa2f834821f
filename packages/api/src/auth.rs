//! OAuth2 client-credentials token exchange.
//!
//! One token is fetched per run. There is no refresh and no retry: any
//! failure here is fatal for the run.

use seqfetch_api_models::AccessToken;

use crate::ApiError;

/// Scope requested for every token. The API only supports `item:read`.
pub const TOKEN_SCOPE: &str = "item:read";

/// Exchanges client credentials for a bearer token.
///
/// Sends `POST {base_url}/oauth/token` with HTTP basic auth and a
/// form-encoded `grant_type=client_credentials&scope=item:read` body.
///
/// # Errors
///
/// Returns [`ApiError::Auth`] if the endpoint is unreachable, rejects the
/// credentials, or answers without an `access_token`.
pub async fn acquire_token(
    client: &reqwest::Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AccessToken, ApiError> {
    let url = format!("{}/oauth/token", base_url.trim_end_matches('/'));
    log::debug!("Requesting access token from {url}");

    let resp = client
        .post(&url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials"), ("scope", TOKEN_SCOPE)])
        .send()
        .await
        .map_err(|e| ApiError::Auth {
            message: format!("token endpoint unreachable: {e}"),
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Auth {
            message: format!("token request rejected with HTTP {status}"),
        });
    }

    let body: serde_json::Value = resp.json().await.map_err(|e| ApiError::Auth {
        message: format!("unreadable token response: {e}"),
    })?;

    let token = parse_token_response(&body)?;
    log::info!("Obtained access token");
    Ok(token)
}

/// Extracts the `access_token` field from a token response body.
fn parse_token_response(body: &serde_json::Value) -> Result<AccessToken, ApiError> {
    match body["access_token"].as_str() {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token.to_string())),
        _ => Err(ApiError::Auth {
            message: "token response has no access_token".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_response() {
        let body = serde_json::json!({"access_token": "abc.def", "token_type": "bearer"});
        let token = parse_token_response(&body).unwrap();
        assert_eq!(token.secret(), "abc.def");
    }

    #[test]
    fn rejects_missing_token() {
        let body = serde_json::json!({"error": "invalid_client"});
        assert!(matches!(
            parse_token_response(&body),
            Err(ApiError::Auth { .. })
        ));
    }

    #[test]
    fn rejects_empty_token() {
        let body = serde_json::json!({"access_token": ""});
        assert!(parse_token_response(&body).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_auth_error() {
        let client = reqwest::Client::new();
        let err = acquire_token(&client, "http://127.0.0.1:1", "id", "secret")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth { .. }), "{err}");
    }
}
