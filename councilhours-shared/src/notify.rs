//! Notification email templates
//!
//! The template is a plain UTF-8 text file. Supported placeholders:
//!
//! - `{name}`: first and last name
//! - `{last_name}`
//! - `{url}`: public URL of the application
//! - `{access_code}`

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::member::Member;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Email template not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not read email template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Expands a leading `~` and resolves relative paths against the working directory
pub fn resolve_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    if expanded.is_absolute() {
        return expanded;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded)
}

/// Subject line used when none is configured
pub fn default_subject(council_title: &str) -> String {
    format!("Notification from {}", council_title)
}

/// Values substituted into a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext<'a> {
    pub name: String,
    pub last_name: &'a str,
    pub url: &'a str,
    pub access_code: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn for_member(member: &'a Member, url: &'a str, access_code: &'a str) -> Self {
        Self {
            name: member.display_name(),
            last_name: member.last_name.as_deref().unwrap_or_default(),
            url,
            access_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailTemplate {
    body: String,
}

impl EmailTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Reads the template at `path`
    pub async fn load(path: &Path) -> Result<Self, TemplateError> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Ok(Self { body }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(TemplateError::NotFound(path.to_path_buf()))
            }
            Err(source) => Err(TemplateError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn render(&self, ctx: &TemplateContext<'_>) -> String {
        self.body
            .replace("{name}", &ctx.name)
            .replace("{last_name}", ctx.last_name)
            .replace("{url}", ctx.url)
            .replace("{access_code}", ctx.access_code)
    }
}
