/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: smtp_connector.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-02-12 15:38:23
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-05 16:03:44
 */

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::message::Message;
use crate::traits::Transport;
use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

// Abstract the mailer so we can mock it
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmtpMailer: Send + Sync {
    async fn send(&self, envelope: Envelope, email: &[u8]) -> Result<(), TransportError>;
}

// Wrapper for Real Lettre Transport.
// Built without the connection pool, so every send opens its own session
// and lettre closes it once the send returns, successful or not.
pub struct RealSmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl SmtpMailer for RealSmtpMailer {
    async fn send(&self, envelope: Envelope, email: &[u8]) -> Result<(), TransportError> {
        self.transport
            .send_raw(&envelope, email)
            .await
            .map_err(TransportError::from)
            .map(|_| ())
    }
}

// Factory trait
#[cfg_attr(test, mockall::automock)]
pub trait SmtpMailerFactory: Send + Sync {
    fn create(&self, config: &TransportConfig) -> Result<Box<dyn SmtpMailer>, TransportError>;
}

pub struct RealSmtpMailerFactory;

impl SmtpMailerFactory for RealSmtpMailerFactory {
    fn create(&self, config: &TransportConfig) -> Result<Box<dyn SmtpMailer>, TransportError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        if config.use_ssl || config.use_tls {
            let tls_params = TlsParameters::new(config.host.clone())
                .map_err(|e| TransportError::Fatal(format!("Invalid TLS parameters: {}", e)))?;
            builder = if config.use_ssl {
                builder.tls(Tls::Wrapper(tls_params))
            } else {
                builder.tls(Tls::Required(tls_params))
            };
        } else {
            builder = builder.tls(Tls::None);
        }

        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Some(Duration::from_secs(seconds)));
        }

        let transport = builder.build();

        Ok(Box::new(RealSmtpMailer { transport }))
    }
}

/// Render a message to its SMTP envelope and MIME bytes.
///
/// Everything that can go wrong here is a problem with the message itself,
/// so every error is fatal.
pub fn render(message: &Message) -> Result<(Envelope, Vec<u8>), TransportError> {
    if message.recipients().is_empty() {
        return Err(TransportError::Fatal("message has no recipients".to_string()));
    }

    let mut builder = lettre::Message::builder()
        .from(message.sender().parse::<Mailbox>()?)
        .subject(message.subject());
    for recipient in message.recipients() {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    let alternative =
        MultiPart::alternative_plain_html(message.text_body().to_string(), message.html_body().to_string());

    let body = if message.attachments().is_empty() {
        alternative
    } else {
        let mut mixed = MultiPart::mixed().multipart(alternative);
        for attachment in message.attachments() {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                TransportError::Fatal(format!(
                    "invalid content type {:?} for attachment {}: {}",
                    attachment.content_type, attachment.filename, e
                ))
            })?;
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.data.clone(), content_type),
            );
        }
        mixed
    };

    let email = builder.multipart(body)?;
    Ok((email.envelope().clone(), email.formatted()))
}

#[cfg(test)]
#[path = "./smtp_connector_tests.rs"]
mod smtp_connector_tests;

pub struct SmtpConnector {
    config: TransportConfig,
    factory: Arc<dyn SmtpMailerFactory>,
    mailer: OnceCell<Box<dyn SmtpMailer>>,
}

impl SmtpConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            factory: Arc::new(RealSmtpMailerFactory),
            mailer: OnceCell::new(),
        }
    }

    pub fn new_with_factory(config: TransportConfig, factory: Arc<dyn SmtpMailerFactory>) -> Self {
        Self {
            config,
            factory,
            mailer: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        self.config.endpoint()
    }
}

#[async_trait]
impl Transport for SmtpConnector {
    async fn deliver(&self, message: &Message) -> Result<(), TransportError> {
        // Reject malformed messages before touching the network
        let (envelope, content) = render(message)?;

        let mailer = self
            .mailer
            .get_or_try_init(|| async { self.factory.create(&self.config) })
            .await?;

        mailer.send(envelope, &content).await
    }
}
