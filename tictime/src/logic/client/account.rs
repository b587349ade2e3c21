use directories::ProjectDirs;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::{fs, io};

use crate::logic::client::url_utils::Endpoint;
use crate::logic::client::Outcome;

#[derive(Serialize)]
struct AccountPayload<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rootpass: Option<&'a str>,
}

fn token_file() -> io::Result<std::path::PathBuf> {
    let pd = ProjectDirs::from("com", "example", "tictime")
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no config dir"))?;
    let dir = pd.config_dir();
    fs::create_dir_all(dir)?;
    Ok(dir.join("token"))
}

pub fn read_token() -> io::Result<String> {
    let p = token_file()?;
    let token = fs::read_to_string(p)?.trim().to_string();
    if token.is_empty() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "empty token file"));
    }
    Ok(token)
}

pub async fn register(
    endpoint: &Endpoint,
    username: String,
    password: String,
    rootpass: Option<String>,
) -> anyhow::Result<Outcome> {
    let url = endpoint.api_url("/api/account/register");
    let payload = AccountPayload {
        username: &username,
        password: &password,
        rootpass: rootpass.as_deref(),
    };
    let resp = Client::new().post(&url).json(&payload).send().await?;
    if resp.status().is_success() {
        println!("✓ Registered `{}`", username);
        return Ok(Outcome::Done);
    }
    if resp.status() == reqwest::StatusCode::CONFLICT {
        eprintln!("✗ Registration failed: `{}` already exists", username);
    } else {
        eprintln!("✗ Registration failed: HTTP {}", resp.status());
    }
    Ok(Outcome::Failed)
}

pub async fn login(endpoint: &Endpoint, username: String, password: String) -> anyhow::Result<Outcome> {
    let url = endpoint.api_url("/api/account/login");
    let payload = AccountPayload {
        username: &username,
        password: &password,
        rootpass: None,
    };
    let resp = Client::new().post(&url).json(&payload).send().await?;

    if resp.status().is_success() {
        let json: Value = resp.json().await?;
        let tok = json["token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("no token in response"))?
            .to_string();
        fs::write(token_file()?, &tok)?;
        match json["expires_at"].as_str() {
            Some(expires) => println!("✓ Logged in (session valid until {})", expires),
            None => println!("✓ Logged in"),
        }
        Ok(Outcome::Done)
    } else {
        eprintln!("✗ Login failed: {}", resp.text().await?);
        Ok(Outcome::Failed)
    }
}

pub async fn logout(endpoint: &Endpoint) -> anyhow::Result<Outcome> {
    let token = match read_token() {
        Ok(t) => t,
        Err(_) => {
            println!("⚠ Not logged in, no local token to clear.");
            return Ok(Outcome::Done);
        }
    };

    let url = endpoint.api_url("/api/account/logout");
    let resp = Client::new().post(&url).bearer_auth(&token).send().await?;

    // A 401 means the server already forgot the token; clearing it locally is still right
    if resp.status().is_success() || resp.status() == reqwest::StatusCode::UNAUTHORIZED {
        match fs::remove_file(token_file()?) {
            Ok(_) => {
                println!("✓ Logged out and local token cleared.");
                Ok(Outcome::Done)
            }
            Err(e) => {
                eprintln!("✓ Logged out from server, but failed to remove local token: {}. Please remove it manually.", e);
                Ok(Outcome::Failed)
            }
        }
    } else {
        let status = resp.status();
        let error_text = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        eprintln!("✗ Logout failed on server (status: {}): {}", status, error_text);
        eprintln!("ℹ Your local token was not cleared.");
        Ok(Outcome::Failed)
    }
}

pub async fn delete(endpoint: &Endpoint, token: String, target: String) -> anyhow::Result<Outcome> {
    let url = endpoint.api_url_segments(&["api", "account", &target])?;
    let resp = Client::new().delete(url).bearer_auth(token).send().await?;
    if resp.status().is_success() {
        println!("✓ Deleted user `{}`", target);
        Ok(Outcome::Done)
    } else {
        eprintln!("✗ Delete failed: {}", resp.status());
        Ok(Outcome::Failed)
    }
}

/// List all users (must be root)
pub async fn list_users(endpoint: &Endpoint, token: String) -> anyhow::Result<Outcome> {
    let url = endpoint.api_url("/api/account/users");
    let resp = Client::new().get(&url).bearer_auth(token).send().await?;

    if !resp.status().is_success() {
        eprintln!("✗ Failed: HTTP {}", resp.status());
        return Ok(Outcome::Failed);
    }

    let users: Vec<Value> = resp.json().await?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(Outcome::Done);
    }

    println!("{:<20} {:<6} CREATED", "USERNAME", "ROLE");
    for u in users {
        let name = u["username"].as_str().unwrap_or("<invalid>");
        let role = u["role"].as_str().unwrap_or("<invalid>");
        let created = u["created_at"].as_str().unwrap_or("");
        println!("{:<20} {:<6} {}", name, role, created);
    }
    Ok(Outcome::Done)
}
