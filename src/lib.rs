/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: lib.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-03-02 10:05:33
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-06 10:20:51
 */

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod retry;
pub mod smtp_connector;
pub mod traits;

pub use dispatcher::{Completion, DeliveryContext, DeliveryMode, DeliveryOutcome, Dispatcher};
pub use error::{ErrorClass, TransportError};
pub use message::{Attachment, Message};
pub use retry::RetryPolicy;
pub use smtp_connector::SmtpConnector;
pub use traits::Transport;
