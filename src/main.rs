use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use authsdk::auth::{PassportRefresher, TokenRefresher};
use authsdk::http::{HttpClient, Method, RequestOptions};
use authsdk::{Client, ClientConfig};
use clap::Parser;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// authsdk - authenticated API client
///
/// Sends requests with the configured access token. When the API reports an
/// expired session, the token is refreshed through the passport endpoint and
/// the request is retried once.
///
/// Examples:
///   authsdk call /v1/items                 # GET, print the envelope data
///   authsdk call -X POST /v1/items --json '{"name":"a"}'
///   authsdk refresh                        # print a fresh token pair
#[derive(Parser, Debug)]
#[command(author, version = env!("AUTHSDK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL for relative paths
    #[arg(long, env = "AUTHSDK_BASE_URL", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Access token sent as bearer credential
    #[arg(
        long,
        env = "AUTHSDK_ACCESS_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    access_token: Option<String>,

    /// Refresh token used when the access token expires
    #[arg(
        long,
        env = "AUTHSDK_REFRESH_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    refresh_token: Option<String>,

    /// Passport endpoint that exchanges the refresh token
    #[arg(long, env = "AUTHSDK_REFRESH_URL", value_name = "URL", global = true)]
    refresh_url: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Authenticated call with refresh-and-retry
    Call(CallArgs),

    /// Passport-style call (no token, no retry)
    Passport(CallArgs),

    /// Refresh the access token and print the new token pair
    Refresh,
}

#[derive(clap::Args, Debug)]
struct CallArgs {
    /// Path relative to the base URL, or an absolute URL
    #[arg(value_name = "PATH")]
    path: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    method: String,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE")]
    query: Vec<String>,

    /// Request header, repeatable
    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    header: Vec<String>,

    /// JSON request body
    #[arg(long, value_name = "JSON")]
    json: Option<String>,

    /// Print the whole response body instead of the envelope data
    #[arg(long)]
    raw: bool,
}

impl CallArgs {
    fn method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", self.method))
    }

    fn options(&self) -> Result<RequestOptions> {
        let mut options = RequestOptions::new();

        for pair in &self.query {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Invalid query '{}'. Expected KEY=VALUE.", pair))?;
            options = options.query(key, value);
        }

        for pair in &self.header {
            let (name, value) = pair
                .split_once(':')
                .with_context(|| format!("Invalid header '{}'. Expected NAME:VALUE.", pair))?;
            let name = HeaderName::from_bytes(name.trim().as_bytes())
                .with_context(|| format!("Invalid header name in '{}'", pair))?;
            let value = HeaderValue::from_str(value.trim())
                .with_context(|| format!("Invalid header value in '{}'", pair))?;
            options = options.header(name, value);
        }

        if let Some(json) = &self.json {
            let body: Value = serde_json::from_str(json).context("Invalid --json body")?;
            options = options.json(body);
        }

        Ok(options)
    }
}

/// Used when no refresh token is configured.
struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh_token(&self) -> Result<String> {
        bail!("Access token expired and no refresh token is configured (set AUTHSDK_REFRESH_TOKEN and AUTHSDK_REFRESH_URL)")
    }
}

fn build(cli: &Cli) -> Result<(Client, Option<Arc<PassportRefresher>>)> {
    let config = ClientConfig {
        base_url: cli.base_url.clone(),
        access_token: cli.access_token.clone(),
        timeout: cli.timeout.map(Duration::from_secs),
        ..ClientConfig::default()
    };

    let http = HttpClient::new(config.build_http_client()?);

    let passport = match (&cli.refresh_token, &cli.refresh_url) {
        (Some(token), Some(url)) => Some(Arc::new(PassportRefresher::new(
            http.clone(),
            config.resolve_url(url),
            token.clone(),
        ))),
        _ => None,
    };
    let refresher: Arc<dyn TokenRefresher> = match &passport {
        Some(passport) => passport.clone(),
        None => Arc::new(NoRefresh),
    };

    Ok((Client::with_http(config, http, refresher), passport))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let (client, passport) = build(&cli)?;

    match &cli.command {
        Commands::Call(args) => {
            let (method, options) = (args.method()?, args.options()?);
            let value: Value = if args.raw {
                client.auth_request_raw(method, &args.path, &options).await?
            } else {
                client.auth_request(method, &args.path, &options).await?
            };
            print_json(&value)?;
        }
        Commands::Passport(args) => {
            let (method, options) = (args.method()?, args.options()?);
            if args.raw {
                let response = client.passport_send(method, &args.path, &options).await?;
                println!("{}", response.text());
            } else {
                let value: Value = client.passport_request(method, &args.path, &options).await?;
                print_json(&value)?;
            }
        }
        Commands::Refresh => {
            let Some(passport) = passport else {
                bail!("Refreshing needs --refresh-token and --refresh-url");
            };
            let access_token = client.refresh_token().await?;
            print_json(&serde_json::json!({
                "access_token": access_token,
                "refresh_token": passport.current_refresh_token().await,
            }))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_call_parsing() {
        let cli = Cli::try_parse_from([
            "authsdk", "call", "/v1/items", "-X", "post", "-q", "page=1", "-H", "X-Trace: abc",
            "--json", r#"{"a":1}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.path, "/v1/items");
                assert_eq!(args.method().unwrap(), Method::POST);
                assert_eq!(args.query, vec!["page=1"]);
                assert!(args.options().is_ok());
                assert!(!args.raw);
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_global_args() {
        let cli = Cli::try_parse_from([
            "authsdk",
            "refresh",
            "--base-url",
            "http://localhost",
            "--refresh-token",
            "R1",
            "--refresh-url",
            "/open/refreshToken",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Refresh));
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost"));
        assert_eq!(cli.refresh_token.as_deref(), Some("R1"));
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_invalid_query_rejected() {
        let cli = Cli::try_parse_from(["authsdk", "call", "/x", "-q", "novalue"]).unwrap();
        match cli.command {
            Commands::Call(args) => assert!(args.options().is_err()),
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_invalid_header_rejected() {
        let cli = Cli::try_parse_from(["authsdk", "call", "/x", "-H", "no-colon"]).unwrap();
        match cli.command {
            Commands::Call(args) => assert!(args.options().is_err()),
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["authsdk", "/v1/items"]).is_err());
    }
}
