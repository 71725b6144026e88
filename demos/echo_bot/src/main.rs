//! Echo Bot Demo
//!
//! Runs one Telegram bot and one Max bot on the same webhook, feeds each a
//! handful of sample payloads, then raises named events. Nothing is sent to
//! the real platforms: every outbound call is printed from the service
//! queues instead.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config demos/echo_bot/switchboard.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::{Value, json};
use switchboard::max::MaxAdapter;
use switchboard::prelude::*;
use switchboard::runtime::config::{BotConfig, RouterConfig, ServiceConfig, SwitchboardConfig};
use switchboard::telegram::TelegramAdapter;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(about = "Switchboard echo bot demo")]
struct Args {
    /// Configuration file; without one the built-in demo services are used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn start(bot: BotRef, update: UpdateRef) -> Result<()> {
    let name = update.sender.first_name.as_deref().unwrap_or("there");
    let options = MessageOptions::new()
        .button(Button::callback("Menu", json!({"action": "menu"})))
        .button(Button::request_contact("Share phone"));
    bot.send_message(update.chat_id(), &format!("Hello, <b>{name}</b>!"), &options)
        .await?;
    Ok(())
}

async fn echo(bot: BotRef, update: UpdateRef) -> Result<()> {
    let text = update.text().unwrap_or_default();
    bot.send_message(update.chat_id(), text, &MessageOptions::default())
        .await?;
    Ok(())
}

async fn buy(matches: Matches, bot: BotRef, update: UpdateRef) -> Result<()> {
    let item = matches.name("item").unwrap_or("nothing");
    let Some(message) = &update.message else {
        return Ok(());
    };
    let text = message.text.as_deref().unwrap_or_default();
    bot.add_message_tag(update.chat_id(), &message.id, text, "#ordered", &MessageOptions::default())
        .await?;
    info!(item, "order placed");
    Ok(())
}

async fn contact(bot: BotRef, update: UpdateRef) -> Result<()> {
    let Some(contact) = update.contact() else {
        return Ok(());
    };
    let reply = if contact.is_own {
        format!("Thanks, saved {}", contact.phone)
    } else {
        "Please share your own contact".to_owned()
    };
    bot.send_message(update.chat_id(), &reply, &MessageOptions::default())
        .await?;
    Ok(())
}

async fn fallback(update: UpdateRef) {
    info!(kind = %update.kind(), chat = %update.chat_id(), "no handler matched");
}

fn webhook() -> Result<Webhook> {
    Ok(Webhook::new()
        .name("echo")
        .command("start", start)
        .action(Pattern::regex(r"^buy:(?P<item>\w+)$")?, buy)
        .text(Pattern::regex(r"(?s).+")?, echo)
        .contact(contact)
        .unknown(fallback))
}

// ============================================================================
// Sample traffic
// ============================================================================

fn telegram_samples() -> Vec<Value> {
    let from = json!({"id": 42, "is_bot": false, "first_name": "Ann"});
    let chat = json!({"id": 42, "type": "private"});
    vec![
        json!({"update_id": 1, "message": {
            "message_id": 1, "from": from, "chat": chat, "date": 1, "text": "/start"
        }}),
        json!({"update_id": 2, "message": {
            "message_id": 2, "from": from, "chat": chat, "date": 2, "text": "hello there"
        }}),
        json!({"update_id": 3, "callback_query": {
            "id": "cb1", "from": from, "data": "buy:tea",
            "message": {"message_id": 3, "chat": chat, "date": 3, "text": "Tea menu"}
        }}),
        json!({"update_id": 4, "message": {
            "message_id": 4, "from": from, "chat": chat, "date": 4,
            "contact": {"phone_number": "+100", "first_name": "Ann", "user_id": 42}
        }}),
        json!({"update_id": 5, "message": {
            "message_id": 5, "from": from, "chat": chat, "date": 5,
            "location": {"latitude": 1.0, "longitude": 2.0}
        }}),
    ]
}

fn max_samples() -> Vec<Value> {
    vec![
        json!({"update_type": "bot_started", "timestamp": 1_000, "chat_id": 9,
            "user": {"user_id": 9, "first_name": "Max"}, "payload": "promo"}),
        json!({"update_type": "message_created", "timestamp": 2_000, "message": {
            "sender": {"user_id": 9, "first_name": "Max"},
            "recipient": {"chat_id": -77, "chat_type": "chat"},
            "timestamp": 2_000,
            "body": {"mid": "mid.2", "text": "hi from a group"}
        }}),
    ]
}

fn drain(service: &Service, outbound: &mut switchboard::core::OutboundReceiver) {
    while let Ok(call) = outbound.try_recv() {
        info!(
            service = %service.name(),
            bot = %call.bot,
            method = %call.method,
            params = %call.params,
            upload = ?call.upload,
            "outbound call"
        );
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn demo_config() -> SwitchboardConfig {
    let service = |name: &str, token: &str| ServiceConfig {
        name: name.to_owned(),
        platform: None,
        enabled: true,
        bots: vec![BotConfig {
            name: "main".to_owned(),
            token: token.to_owned(),
            enabled: true,
        }],
    };
    SwitchboardConfig {
        router: RouterConfig {
            default_bot: "main".to_owned(),
        },
        services: vec![service("telegram", "123456:demo"), service("max", "max-demo-token")],
        ..SwitchboardConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = ServiceManager::builder()
        .adapter(Arc::new(TelegramAdapter::new()))
        .adapter(Arc::new(MaxAdapter::new()))
        .merge(demo_config());
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let manager = builder.build()?;

    for service in manager.service_names() {
        manager.start_bot(&service, "main", Some(webhook()?)).await?;

        let announce = event("announce", |bot: BotRef, ctx: EventContext| async move {
            let text = ctx.payload["text"].as_str().unwrap_or("Announcement");
            bot.send_message(&ctx.chat_id, text, &MessageOptions::new().silent())
                .await?;
            anyhow::Ok(())
        });
        manager.register_route(&service, announce.boxed())?;
    }

    for (service, samples) in [("telegram", telegram_samples()), ("max", max_samples())] {
        for raw in samples {
            match manager.handle_webhook(service, "main", raw).await {
                Ok(outcome) => info!(service, ?outcome, "update dispatched"),
                Err(e) => error!(service, error = %e, "update failed"),
            }
        }
    }

    manager
        .emit(
            "telegram",
            EmitRequest::new("announce", json!({"text": "Shop opens at 9"})).chat_id(42),
        )
        .await?;
    if let Err(e) = manager
        .emit("max", EmitRequest::new("announce", json!({})))
        .await
    {
        // No chat id and no default for the event.
        error!(error = %e, "announce failed");
    }

    for name in manager.service_names() {
        let service = manager.get_service(&name)?;
        if let Some(mut outbound) = service.take_outbound() {
            drain(&service, &mut outbound);
        }
    }

    manager.shutdown();
    Ok(())
}
