//! Application service: resolve the provisioning context.
//!
//! Answers come from the persisted config first and the operator second.
//! Nothing outside the config store is touched.

use anyhow::Result;

use crate::application::ports::{ConfigStore, Prompter};
use crate::domain::config::{
    DEFAULT_DB_NAME, DEFAULT_DB_USER, non_blank, normalize_domain, parse_server_ip,
};
use crate::domain::{DatabaseCredentials, Field, ProvisionConfig, ProvisionError, ProvisioningContext};

/// Keys with no default; every one of them has to be answered.
const REQUIRED: [Field; 4] = [
    Field::Domain,
    Field::ServerIp,
    Field::AdminPassword,
    Field::DbPassword,
];

fn stored_value(cfg: &ProvisionConfig, field: Field) -> Option<&str> {
    let raw = match field {
        Field::Domain => cfg.domain.as_deref(),
        Field::ServerIp => cfg.server_ip.as_deref(),
        Field::AdminPassword => cfg.admin_password.as_deref(),
        Field::DbName => cfg.db_name.as_deref(),
        Field::DbUser => cfg.db_user.as_deref(),
        Field::DbPassword => cfg.db_password.as_deref(),
    };
    non_blank(raw)
}

/// Required keys the stored answers leave empty.
#[must_use]
pub fn missing_fields(cfg: &ProvisionConfig) -> Vec<&'static str> {
    REQUIRED
        .iter()
        .filter(|f| stored_value(cfg, **f).is_none())
        .map(|f| f.key())
        .collect()
}

/// Ask for every absent answer, in fixed order. Returns whether anything was asked.
fn prompt_missing(cfg: &mut ProvisionConfig, prompter: &impl Prompter) -> Result<bool> {
    let mut asked = false;
    if stored_value(cfg, Field::Domain).is_none() {
        cfg.domain = Some(prompter.text("Domain name (e.g. example.com)", None)?);
        asked = true;
    }
    if stored_value(cfg, Field::ServerIp).is_none() {
        cfg.server_ip = Some(prompter.text("Public IP address of this server", None)?);
        asked = true;
    }
    if stored_value(cfg, Field::AdminPassword).is_none() {
        cfg.admin_password = Some(prompter.secret("Administrator password")?);
        asked = true;
    }
    if stored_value(cfg, Field::DbName).is_none() {
        cfg.db_name = Some(prompter.text("Database name", Some(DEFAULT_DB_NAME))?);
        asked = true;
    }
    if stored_value(cfg, Field::DbUser).is_none() {
        cfg.db_user = Some(prompter.text("Database user", Some(DEFAULT_DB_USER))?);
        asked = true;
    }
    if stored_value(cfg, Field::DbPassword).is_none() {
        cfg.db_password = Some(prompter.secret("Database password")?);
        asked = true;
    }
    if cfg.install_ssl.is_none() {
        cfg.install_ssl = Some(prompter.confirm("Request TLS certificates from Let's Encrypt?", true)?);
        asked = true;
    }
    Ok(asked)
}

/// Fill defaults and validate; the config is rewritten in normalized form.
fn finalize(cfg: &mut ProvisionConfig) -> Result<ProvisioningContext, ProvisionError> {
    let missing = missing_fields(cfg);
    if !missing.is_empty() {
        return Err(ProvisionError::MissingInput { fields: missing });
    }
    let domain = normalize_domain(cfg.domain.as_deref().unwrap_or_default())?;
    let server_ip = parse_server_ip(cfg.server_ip.as_deref().unwrap_or_default())?;
    let db_name = stored_value(cfg, Field::DbName).unwrap_or(DEFAULT_DB_NAME).to_string();
    let db_user = stored_value(cfg, Field::DbUser).unwrap_or(DEFAULT_DB_USER).to_string();
    let install_ssl = cfg.install_ssl.unwrap_or(true);

    cfg.domain = Some(domain.clone());
    cfg.server_ip = Some(server_ip.to_string());
    cfg.db_name = Some(db_name.clone());
    cfg.db_user = Some(db_user.clone());
    cfg.install_ssl = Some(install_ssl);

    Ok(ProvisioningContext::new(
        domain,
        server_ip,
        cfg.admin_password.clone().unwrap_or_default(),
        DatabaseCredentials {
            name: db_name,
            user: db_user,
            password: cfg.db_password.clone().unwrap_or_default(),
        },
        install_ssl,
    ))
}

/// Produce the immutable context for a run.
///
/// With `interactive == false` any unanswered required key is an input
/// error naming all of them. Prompted answers live only in the returned
/// context; the stored config is never written.
///
/// # Errors
///
/// Returns a `ProvisionError` of the input class when the stored config is
/// unreadable, an answer is missing, or an answer is invalid.
pub fn resolve_context(
    store: &impl ConfigStore,
    prompter: &impl Prompter,
    interactive: bool,
) -> Result<ProvisioningContext> {
    let mut cfg = store
        .load()
        .map_err(|e| ProvisionError::InvalidInput {
            field: "config",
            reason: format!("{}: {e:#}", store.path().display()),
        })?
        .unwrap_or_default();

    let prompted = if interactive {
        prompt_missing(&mut cfg, prompter).map_err(|e| ProvisionError::InvalidInput {
            field: "answer",
            reason: format!("cannot read from the terminal: {e:#}"),
        })?
    } else {
        false
    };

    let ctx = finalize(&mut cfg)?;
    tracing::info!(domain = ctx.domain(), server_ip = %ctx.server_ip(), prompted, "inputs resolved");
    Ok(ctx)
}
