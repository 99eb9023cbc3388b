//! Utility functions for minipoints

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Percent-encoding set for emails placed in URL paths
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'%')
    .add(b' ')
    .add(b'?')
    .add(b'#')
    .add(b'&')
    .add(b'+');

/// Encode an email for use as a URL path segment
pub fn encode_email(email: &str) -> String {
    utf8_percent_encode(email, PATH_ENCODE_SET).to_string()
}

/// Check an email address: `local@domain`, domain made of dot-separated labels.
pub fn validate_email(email: &str) -> crate::Result<()> {
    let invalid = || crate::Error::InvalidEmail(format!("malformed address '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let local_ok = local
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(is_local_char));
    let domain_ok = domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    if local_ok && domain_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')
}

/// Parse a `name=url` registry entry as given on the command line
pub fn parse_registry_entry(entry: &str) -> crate::Result<(String, String)> {
    match entry.split_once('=') {
        Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
            Ok((name.trim().to_string(), url.trim().to_string()))
        }
        _ => Err(crate::Error::InvalidConfig(format!(
            "registry entry must be name=url, got '{}'",
            entry
        ))),
    }
}

/// Resolves once Ctrl-C is received; used for graceful shutdown.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
