use crate::config::TransportConfig;
use crate::error::{ErrorClass, TransportError};
use crate::message::{Attachment, Message};
use crate::smtp_connector::{
    MockSmtpMailer, MockSmtpMailerFactory, RealSmtpMailerFactory, SmtpConnector, render,
};
use crate::traits::Transport;
use std::sync::Arc;

fn test_transport_config() -> TransportConfig {
    TransportConfig {
        host: "smtp.test.com".to_string(),
        port: 465,
        username: Some("sender@test.com".to_string()),
        password: Some("pass".to_string()),
        use_tls: false,
        use_ssl: true,
        timeout_seconds: Some(5),
    }
}

fn test_message() -> Message {
    Message::new(
        "Password reset",
        "noreply@test.com",
        vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
        "Follow the link to reset your password.",
        "<p>Follow the link to reset your password.</p>",
    )
}

#[tokio::test]
async fn test_deliver_success() {
    let config = test_transport_config();

    let mut mock_factory = MockSmtpMailerFactory::new();
    mock_factory.expect_create().times(1).returning(|_| {
        let mut mock_mailer = MockSmtpMailer::new();
        mock_mailer
            .expect_send()
            .times(1)
            .withf(|envelope, content| {
                let content_str = String::from_utf8_lossy(content);
                content_str.contains("Subject: Password reset")
                    && content_str.contains("multipart/alternative")
                    && envelope
                        .from()
                        .is_some_and(|s| s.to_string() == "noreply@test.com")
                    && envelope.to().len() == 2
                    && envelope.to()[0].to_string() == "alice@example.com"
                    && envelope.to()[1].to_string() == "bob@example.com"
            })
            .returning(|_, _| Ok(()));
        Ok(Box::new(mock_mailer))
    });

    let connector = SmtpConnector::new_with_factory(config, Arc::new(mock_factory));
    let result = connector.deliver(&test_message()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_mailer_is_created_once() {
    let mut mock_factory = MockSmtpMailerFactory::new();
    mock_factory.expect_create().times(1).returning(|_| {
        let mut mock_mailer = MockSmtpMailer::new();
        mock_mailer.expect_send().times(2).returning(|_, _| Ok(()));
        Ok(Box::new(mock_mailer))
    });

    let connector = SmtpConnector::new_with_factory(test_transport_config(), Arc::new(mock_factory));
    assert!(connector.deliver(&test_message()).await.is_ok());
    assert!(connector.deliver(&test_message()).await.is_ok());
}

#[tokio::test]
async fn test_deliver_factory_error() {
    let mut mock_factory = MockSmtpMailerFactory::new();
    mock_factory
        .expect_create()
        .returning(|_| Err(TransportError::Fatal("Invalid TLS parameters".to_string())));

    let connector = SmtpConnector::new_with_factory(test_transport_config(), Arc::new(mock_factory));

    let result = connector.deliver(&test_message()).await;
    assert!(result.is_err());
    assert_eq!(
        result.unwrap_err().to_string(),
        "fatal transport error: Invalid TLS parameters"
    );
}

#[tokio::test]
async fn test_deliver_passes_mailer_error_through() {
    let mut mock_factory = MockSmtpMailerFactory::new();
    mock_factory.expect_create().returning(|_| {
        let mut mock_mailer = MockSmtpMailer::new();
        mock_mailer
            .expect_send()
            .returning(|_, _| Err(TransportError::Transient("421 busy".to_string())));
        Ok(Box::new(mock_mailer))
    });

    let connector = SmtpConnector::new_with_factory(test_transport_config(), Arc::new(mock_factory));

    let err = connector.deliver(&test_message()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
}

#[tokio::test]
async fn test_empty_recipients_is_fatal_without_connecting() {
    let mut mock_factory = MockSmtpMailerFactory::new();
    mock_factory.expect_create().never();

    let connector = SmtpConnector::new_with_factory(test_transport_config(), Arc::new(mock_factory));
    let message = Message::new("Hi", "noreply@test.com", vec![], "text", "<p>html</p>");

    let err = connector.deliver(&message).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Fatal);
    assert!(err.to_string().contains("no recipients"));
}

#[test]
fn test_render_rejects_bad_recipient() {
    let message = Message::new(
        "Hi",
        "noreply@test.com",
        vec!["not an address".to_string()],
        "text",
        "<p>html</p>",
    );

    let err = render(&message).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Fatal);
}

#[test]
fn test_render_rejects_bad_content_type() {
    let message = test_message().with_attachment(Attachment::new(
        "report.bin",
        "definitely not a mime type",
        vec![1, 2, 3],
    ));

    let err = render(&message).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Fatal);
    assert!(err.to_string().contains("report.bin"));
}

#[test]
fn test_render_with_attachments() {
    let message = test_message()
        .with_attachment(Attachment::new("notes.txt", "text/plain", b"hello".to_vec()))
        .with_attachment(Attachment::new("data.csv", "text/csv", b"a,b\n1,2".to_vec()));

    let (envelope, content) = render(&message).unwrap();
    let content = String::from_utf8_lossy(&content);

    assert_eq!(envelope.to().len(), 2);
    assert!(content.contains("multipart/mixed"));
    assert!(content.contains("multipart/alternative"));
    assert!(content.contains("notes.txt"));
    assert!(content.contains("data.csv"));
    assert!(content.find("notes.txt") < content.find("data.csv"));
}

#[tokio::test]
async fn test_connection_refused_is_retryable() {
    let config = TransportConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        username: None,
        password: None,
        use_tls: false,
        use_ssl: false,
        timeout_seconds: Some(2),
    };

    let connector = SmtpConnector::new_with_factory(config, Arc::new(RealSmtpMailerFactory));
    assert_eq!(connector.endpoint(), "127.0.0.1:1");

    let err = connector.deliver(&test_message()).await.unwrap_err();
    assert!(err.is_retryable(), "unexpected classification: {:?}", err);
}
