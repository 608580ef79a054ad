mod commands;

use dotenv::dotenv;
use leetboard::{Config, ContestClient};
use log::{error, info};
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use std::{sync::Arc, time::Duration};

pub struct Data {
    config: Config,
    client: ContestClient,
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command: `{}`: {:?}", ctx.command().name, error);

            let reply = ctx.send(
                ctx.reply_builder(CreateReply::default().ephemeral(true).content(format!(
                    "Error while running command `{}`:\n>>> {}",
                    ctx.command().name,
                    error
                ))),
            )
            .await;

            if let Err(e) = reply {
                error!("Could not report command error: {}", e);
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv().ok();

    env_logger::init();

    let config = Config::from_env()?;
    info!(
        "Tracking {} users against {}",
        config.usernames.len(),
        config.endpoint
    );
    let client = ContestClient::new(config.endpoint.clone());

    let options = poise::FrameworkOptions {
        commands: vec![commands::contest::contest()],

        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some("lc ".into()),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(3600),
            ))),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!("Executing command {}...", ctx.command().qualified_name);
            })
        },
        post_command: |ctx| {
            Box::pin(async move {
                info!("Executed command {}", ctx.command().qualified_name);
            })
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                Ok(Data { config, client })
            })
        })
        .options(options)
        .build();

    let token =
        std::env::var("DISCORD_TOKEN").map_err(|_| "Missing DISCORD_TOKEN environment variable")?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting Discord client...");
    if let Err(why) = client.start().await {
        error!("Client error: {why:?}");
    }

    Ok(())
}
