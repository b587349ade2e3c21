use colored::*;
use reqwest::{Client, StatusCode};

use crate::logic::client::error::{ClientError, ClientResult};
use crate::logic::client::url_utils::Endpoint;
use crate::logic::client::Outcome;
use crate::logic::types::{HealthStatus, InitialState};

/// GET /api/initial_state
pub async fn fetch_initial_state(
    client: &Client,
    endpoint: &Endpoint,
    token: &str,
) -> ClientResult<InitialState> {
    let resp = client
        .get(endpoint.api_url("/api/initial_state"))
        .bearer_auth(token)
        .send()
        .await?;

    match resp.status() {
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        s if s.is_success() => Ok(resp.json().await?),
        s => Err(ClientError::Status {
            status: s.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        }),
    }
}

/// GET /health
pub async fn fetch_health(client: &Client, endpoint: &Endpoint) -> ClientResult<HealthStatus> {
    let resp = client.get(endpoint.api_url("/health")).send().await?;
    if !resp.status().is_success() {
        return Err(ClientError::Status {
            status: resp.status().as_u16(),
            body: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp.json().await?)
}

/// `tictime state`: print the value a freshly opened display would start from
pub async fn show(endpoint: &Endpoint, token: String) -> anyhow::Result<Outcome> {
    let client = Client::new();
    match fetch_initial_state(&client, endpoint, &token).await {
        Ok(InitialState { current: Some(value) }) => println!("{}", value),
        Ok(InitialState { current: None }) => {
            println!("{}", "No tick has happened yet.".yellow())
        }
        Err(ClientError::Unauthorized) => {
            eprintln!("✗ Session rejected: please run `tictime account login` again");
            return Ok(Outcome::Failed);
        }
        Err(e) => {
            eprintln!("✗ Failed to fetch initial state: {}", e);
            return Ok(Outcome::Failed);
        }
    }
    Ok(Outcome::Done)
}

/// `tictime health`
pub async fn health(endpoint: &Endpoint) -> anyhow::Result<Outcome> {
    match fetch_health(&Client::new(), endpoint).await {
        Ok(h) if h.status == "ok" => {
            println!("✓ {} is {}", endpoint.api_url(""), h.status.green());
            Ok(Outcome::Done)
        }
        Ok(h) => {
            println!("⚠ {} reports {}", endpoint.api_url(""), h.status.yellow());
            Ok(Outcome::Failed)
        }
        Err(e) => {
            eprintln!("✗ {} is unreachable: {}", endpoint.api_url(""), e);
            Ok(Outcome::Failed)
        }
    }
}
