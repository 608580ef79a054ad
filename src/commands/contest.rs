use leetboard::build_leaderboard_pages;

use crate::{Context, Error};

/// Discord rejects messages longer than this.
const MESSAGE_LIMIT: usize = 2000;

/// Show contest standings for the tracked users.
#[poise::command(slash_command, prefix_command)]
pub async fn contest(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let pages = build_leaderboard_pages(
        &data.client,
        &data.config.usernames,
        data.config.max_concurrency,
        MESSAGE_LIMIT,
    )
    .await;

    for page in pages {
        ctx.say(page).await?;
    }

    Ok(())
}
