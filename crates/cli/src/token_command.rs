use std::path::PathBuf;

use {
    anyhow::{Context, Result, anyhow, bail},
    clap::Args,
    mailrun_config::{
        OAuthCredentials, ScopePreset, Settings, env_file, loader::default_redirect_uri,
        scopes::parse_scope_list,
    },
    mailrun_oauth::{AuthorizationSession, OAuthConfig},
    secrecy::ExposeSecret,
    tracing::info,
};

const REFRESH_TOKEN_KEY: &str = "OAUTH_REFRESH_TOKEN";

#[derive(Args)]
pub struct TokenArgs {
    /// Listener port. Overrides OAUTH_PORT; without --redirect-uri the
    /// redirect URI is derived from it.
    #[arg(long)]
    port: Option<u16>,

    /// Redirect URI registered for the app. Overrides OAUTH_REDIRECT_URI.
    #[arg(long)]
    redirect_uri: Option<String>,

    /// Which transport the token should work for.
    #[arg(long, default_value_t = ScopePreset::Smtp)]
    scope_preset: ScopePreset,

    /// Space-separated scopes, replacing the preset.
    #[arg(long)]
    scope: Option<String>,

    /// Force the consent screen even if consent was granted before.
    #[arg(long, default_value_t = false)]
    prompt_consent: bool,

    /// Print the URLs instead of launching a browser.
    #[arg(long, default_value_t = false)]
    no_browser: bool,

    /// Also write OAUTH_REFRESH_TOKEN into this dotenv file.
    #[arg(long)]
    save_env: Option<PathBuf>,
}

fn oauth_config(args: &TokenArgs, creds: &OAuthCredentials) -> Result<(OAuthConfig, u16)> {
    let port = args.port.unwrap_or(creds.port);
    let redirect_uri = match (&args.redirect_uri, args.port) {
        (Some(uri), _) => uri.clone(),
        (None, Some(port)) => default_redirect_uri(port),
        (None, None) => creds.redirect_uri.clone(),
    };

    let scopes = match args.scope {
        Some(ref raw) => parse_scope_list(raw),
        None => args.scope_preset.authorize_scopes(),
    };
    if scopes.is_empty() {
        bail!("--scope must name at least one scope");
    }

    let mut config = OAuthConfig::for_tenant(
        &creds.authority,
        &creds.tenant_id,
        creds.client_id.clone(),
        Some(creds.client_secret.clone()),
        redirect_uri,
        scopes,
    );
    config.prompt_consent = args.prompt_consent;
    Ok((config, port))
}

fn open_or_print(url: &str) {
    if open::that(url).is_err() {
        println!("Could not open browser. Please visit:\n{url}");
    }
}

pub async fn run(args: TokenArgs, settings: &Settings) -> Result<()> {
    // Fail on missing credentials before binding anything.
    let creds = settings.oauth_credentials()?;
    let (config, port) = oauth_config(&args, &creds)?;

    let session = AuthorizationSession::start(config, port)
        .await
        .context("failed to start the authorization session")?;

    println!(
        "Listening on {} - complete sign-in in browser",
        session.redirect_uri()
    );
    if args.no_browser {
        println!("Sign in at:\n{}", session.authorization_url());
    } else {
        println!("Opening browser for authentication...");
        open_or_print(session.redirect_uri());
        open_or_print(session.authorization_url().as_str());
    }

    let tokens = session.complete().await.context("authorization failed")?;
    info!(
        scope = tokens.scope.as_deref().unwrap_or("unknown"),
        expires_at = tokens.expires_at,
        "tokens issued"
    );

    let refresh_token = tokens.refresh_token.ok_or_else(|| {
        anyhow!("no refresh token was issued; request the offline_access scope")
    })?;

    println!("\nAdd this to your .env as {REFRESH_TOKEN_KEY}:\n");
    println!("-----BEGIN REFRESH TOKEN-----");
    println!("{}", refresh_token.expose_secret());
    println!("-----END REFRESH TOKEN-----");

    if let Some(path) = args.save_env {
        env_file::upsert(&path, REFRESH_TOKEN_KEY, refresh_token.expose_secret())?;
        println!("\nSaved {REFRESH_TOKEN_KEY} to {}", path.display());
    }

    Ok(())
}
