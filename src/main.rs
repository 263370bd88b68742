/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: main.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-02-12 15:38:23
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-06 11:02:45
 */

use clap::Parser;
use log::{error, info, warn};
use mail_dispatch::config::AppConfig;
use mail_dispatch::{
    Attachment, DeliveryContext, DeliveryMode, DeliveryOutcome, Dispatcher, Message,
    SmtpConnector,
};
use rustls::crypto;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + 'static>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for w in &mut self.writers {
            let _ = w.write(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for w in &mut self.writers {
            let _ = w.flush();
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    /// Recipient address, repeat for more than one
    #[arg(short, long = "to", required = true)]
    to: Vec<String>,

    /// Sender address, falls back to `default_sender`
    #[arg(short, long)]
    from: Option<String>,

    #[arg(short, long)]
    subject: String,

    #[arg(long, default_value = "")]
    text: String,

    #[arg(long, default_value = "")]
    html: String,

    /// File to attach, repeat for more than one
    #[arg(short, long)]
    attach: Vec<PathBuf>,

    /// Make a single attempt and report the result instead of retrying in the background
    #[arg(long)]
    sync: bool,
}

fn initialize_logger(config: &AppConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();

    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    } else if let Ok(env_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_level);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file, e))?;

        if config.quiet {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            let multi_writer = MultiWriter {
                writers: vec![Box::new(file), Box::new(std::io::stderr())],
            };
            builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
        }
    } else if config.quiet {
        builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
    }

    builder.init();
    Ok(())
}

async fn compose_message(args: Args, config: &AppConfig) -> anyhow::Result<Message> {
    let sender = args
        .from
        .or_else(|| config.default_sender.clone())
        .ok_or_else(|| anyhow::anyhow!("No sender address: pass --from or set default_sender"))?;

    let mut attachments = Vec::with_capacity(args.attach.len());
    for path in &args.attach {
        attachments.push(Attachment::from_path(path).await?);
    }

    Ok(
        Message::new(args.subject, sender, args.to, args.text, args.html)
            .with_attachments(attachments),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = crypto::ring::default_provider().install_default();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::new_from_file(path),
        None => AppConfig::new(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load config: {:?}", e);
        if let Ok(path) = std::env::current_dir() {
            eprintln!("Current search path: {:?}", path);
        }
        eprintln!("Please create a `config.toml` or set MAIL_... environment variables, or specify a config file with --config.");
        std::process::exit(1);
    });

    initialize_logger(&config)?;

    let mode = if args.sync {
        DeliveryMode::Synchronous
    } else {
        DeliveryMode::Asynchronous
    };
    let message = compose_message(args, &config).await?;

    let connector = SmtpConnector::new(config.transport.clone());
    let endpoint = connector.endpoint();
    info!(
        "Sending {:?} to {} recipient(s) via {} ({:?})",
        message.subject(),
        message.recipients().len(),
        endpoint,
        mode
    );

    let context = DeliveryContext::new(Arc::new(connector), config.retry, endpoint);
    let dispatcher = Dispatcher::new(context)?;

    let outcome = dispatcher.send(message, mode).await;
    match outcome {
        Some(DeliveryOutcome::Delivered { .. }) => info!("Message delivered"),
        Some(DeliveryOutcome::Failed { error, .. }) => {
            eprintln!("Email could not be sent: {}", error);
            std::process::exit(1);
        }
        None => {
            info!("Message scheduled for background delivery, waiting for it to finish...");
            tokio::select! {
                _ = dispatcher.shutdown() => info!("Background delivery finished"),
                res = signal::ctrl_c() => match res {
                    Ok(()) => warn!("Shutdown signal received (Ctrl+C). Abandoning in-flight delivery."),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                },
            }
        }
    }

    Ok(())
}
