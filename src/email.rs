use anyhow::{anyhow, Context};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

/// Outgoing mail abstraction. The application only ever sends two kinds of
/// message, both carrying a single-use link.
pub trait EmailSender: Send + Sync {
    fn send_verification_link(&self, email: &str, link: &str) -> anyhow::Result<()>;

    fn send_password_reset_link(&self, email: &str, link: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// Reads `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD` and
    /// `SMTP_FROM_EMAIL`; returns `None` unless all four are present.
    /// `SMTP_PORT` (default 465) and `SMTP_FROM_NAME` are optional.
    pub fn from_env() -> Option<Self> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|value| !value.is_empty())
        }

        let host = get_env("SMTP_HOST")?;
        let username = get_env("SMTP_USERNAME")?;
        let password = get_env("SMTP_PASSWORD")?;
        let from_email = get_env("SMTP_FROM_EMAIL")?;

        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(465);

        Some(Self {
            host,
            port,
            username,
            password,
            from_email,
            from_name: get_env("SMTP_FROM_NAME"),
        })
    }
}

pub struct SmtpEmailSender {
    transport: SmtpTransport,
    from_email: String,
    from_name: Option<String>,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(config.username, config.password);

        let transport = SmtpTransport::relay(&config.host)
            .context("failed to create SMTP transport")?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
        })
    }

    fn from_address(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        }
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from_address().parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build email")?;

        self.transport
            .send(&message)
            .map_err(|err| anyhow!("failed to send email: {err}"))?;
        Ok(())
    }
}

impl EmailSender for SmtpEmailSender {
    fn send_verification_link(&self, email: &str, link: &str) -> anyhow::Result<()> {
        let body = format!(
            "Welcome! Please confirm your email address by opening this link:\n\n\
             {link}\n\n\
             The link expires in one hour. If you didn't sign up, you can \
             safely ignore this email."
        );
        self.send_email(email, "Verify your email address", &body)?;
        info!(email = %email, "Verification email sent");
        Ok(())
    }

    fn send_password_reset_link(&self, email: &str, link: &str) -> anyhow::Result<()> {
        let body = format!(
            "A password reset was requested for your account. Open this link \
             to choose a new password:\n\n\
             {link}\n\n\
             The link expires in one hour. If you didn't request this, you \
             can safely ignore this email."
        );
        self.send_email(email, "Reset your password", &body)?;
        info!(email = %email, "Password reset email sent");
        Ok(())
    }
}

/// Development fallback used when SMTP is not configured; also what the
/// integration tests run with.
pub struct ConsoleEmailSender;

impl EmailSender for ConsoleEmailSender {
    fn send_verification_link(&self, email: &str, link: &str) -> anyhow::Result<()> {
        info!(email = %email, link = %link, "Verification link (console sender)");
        Ok(())
    }

    fn send_password_reset_link(&self, email: &str, link: &str) -> anyhow::Result<()> {
        info!(email = %email, link = %link, "Password reset link (console sender)");
        Ok(())
    }
}
