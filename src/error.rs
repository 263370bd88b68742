/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: error.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 10:12:05
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 18:40:11
 */

//! Transport failure taxonomy.
//!
//! Every failure coming out of a delivery attempt is one of:
//! - `Transient` - connection refused/dropped, timeouts, 4xx replies. Retried.
//! - `Fatal` - malformed message, permanent 5xx rejection, bad credentials. Never retried.
//! - `Unclassified` - anything else. Retried, but logged apart from known transient errors.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transient transport error: {0}")]
    Transient(String),

    #[error("fatal transport error: {0}")]
    Fatal(String),

    #[error("unclassified transport error: {0}")]
    Unclassified(String),
}

/// Classification attached to every failed attempt in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Fatal,
    Unclassified,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient",
            Self::Fatal => "fatal",
            Self::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

impl TransportError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transient(_) => ErrorClass::Transient,
            Self::Fatal(_) => ErrorClass::Fatal,
            Self::Unclassified(_) => ErrorClass::Unclassified,
        }
    }

    /// Unclassified errors are treated conservatively as retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Fatal(_))
    }
}

impl From<lettre::transport::smtp::Error> for TransportError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        if err.is_permanent() {
            return Self::Fatal(err.to_string());
        }

        if err.is_transient() || err.is_timeout() {
            return Self::Transient(err.to_string());
        }

        // Connection refused, reset or dropped mid-session
        let io_failure = std::error::Error::source(&err)
            .and_then(|source| source.downcast_ref::<std::io::Error>())
            .is_some();
        if io_failure {
            return Self::Transient(err.to_string());
        }

        Self::Unclassified(err.to_string())
    }
}

impl From<lettre::error::Error> for TransportError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Fatal(format!("invalid message: {}", err))
    }
}

impl From<lettre::address::AddressError> for TransportError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::Fatal(format!("invalid address: {}", err))
    }
}
