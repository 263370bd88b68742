/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: message.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 10:30:47
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-03 21:02:16
 */

use std::path::Path;

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Reads a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read attachment {}: {}", path.display(), e))?;

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid attachment path: {}", path.display()))?;

        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        Ok(Self::new(filename, content_type.to_string(), data))
    }
}

/// A composed message, ready to be handed to the dispatcher.
///
/// Fields are only readable once built; the dispatcher shares a single
/// instance between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    subject: String,
    sender: String,
    recipients: Vec<String>,
    text_body: String,
    html_body: String,
    attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        recipients: Vec<String>,
        text_body: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
            recipients,
            text_body: text_body.into(),
            html_body: html_body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn text_body(&self) -> &str {
        &self.text_body
    }

    pub fn html_body(&self) -> &str {
        &self.html_body
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}
