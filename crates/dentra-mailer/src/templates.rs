//! Email templates and rendering.
//!
//! Templates are HTML files with `{{name}}` placeholders. Parameters come
//! from the message `data` map plus two derived values: `to` (the
//! recipient) and `link` (the frontend URL the email points at). Every
//! substituted value is HTML-escaped.

use std::collections::BTreeMap;

use dentra_models::{EmailMessage, EmailType};

const VERIFICATION_HTML: &str = include_str!("../templates/verification.html");
const PASSWORD_RESET_HTML: &str = include_str!("../templates/password_reset.html");

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template parameter: {0}")]
    MissingParameter(String),

    #[error("Unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

/// A fully rendered email ready for a [`MailTransport`](crate::MailTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

struct Template {
    subject: &'static str,
    html: &'static str,
    text: &'static str,
}

fn template_for(kind: EmailType) -> Template {
    match kind {
        EmailType::Verification => Template {
            subject: "Verify your email address",
            html: VERIFICATION_HTML,
            text: "Please confirm your email address by opening the link below.\n\n\
                   {{link}}\n\n\
                   This link expires in 24 hours.\n\n\
                   The Dentra Team",
        },
        EmailType::PasswordReset => Template {
            subject: "Password Reset Request",
            html: PASSWORD_RESET_HTML,
            text: "We received a request to reset the password for {{email}}.\n\n\
                   Open the link below to choose a new password:\n\
                   {{link}}\n\n\
                   This link expires in 1 hour. If you didn't request this, ignore this email.\n\n\
                   The Dentra Team",
        },
    }
}

/// Builds the frontend link for `message`.
///
/// - verification: `{frontend_url}/verify-email?token=…`
/// - password reset: `{frontend_url}/reset-password?token=…&email=…`
pub fn build_link(message: &EmailMessage, frontend_url: &str) -> Result<String, TemplateError> {
    let token = message
        .get("token")
        .ok_or_else(|| TemplateError::MissingParameter("token".to_string()))?;
    let base = frontend_url.trim_end_matches('/');

    Ok(match message.kind() {
        EmailType::Verification => format!(
            "{}/verify-email?token={}",
            base,
            urlencoding::encode(token)
        ),
        EmailType::PasswordReset => {
            let email = message.get("email").unwrap_or(message.to());
            format!(
                "{}/reset-password?token={}&email={}",
                base,
                urlencoding::encode(token),
                urlencoding::encode(email)
            )
        }
    })
}

/// Renders `message` into subject, HTML and plain-text bodies.
pub fn render_email(
    message: &EmailMessage,
    frontend_url: &str,
) -> Result<RenderedEmail, TemplateError> {
    let template = template_for(message.kind());
    let link = build_link(message, frontend_url)?;

    let mut params: BTreeMap<&str, &str> = message
        .data()
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    params.insert("to", message.to());
    params.insert("link", link.as_str());

    Ok(RenderedEmail {
        to: message.to().to_string(),
        subject: template.subject.to_string(),
        html: render(template.html, &params, escape_html)?,
        text: render(template.text, &params, str::to_string)?,
    })
}

fn render(
    template: &str,
    params: &BTreeMap<&str, &str>,
    encode: fn(&str) -> String,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(TemplateError::Unterminated(offset + start))?;

        let name = after[..end].trim();
        let value = params
            .get(name)
            .ok_or_else(|| TemplateError::MissingParameter(name.to_string()))?;
        out.push_str(&encode(value));

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
