use std::{cmp::Ordering, collections::HashMap};

use futures::{stream, StreamExt};
use log::{info, warn};
use poise::serenity_prelude::MessageBuilder;

use crate::contest::{RankResult, RankSource};

/// Fetches every user's rank concurrently and waits for all of them.
///
/// One fetch runs per username unless `max_concurrency` caps how many are in
/// flight at once. A failed fetch only affects its own entry, so the returned
/// map always holds exactly the requested usernames.
pub async fn fetch_all<S>(
    source: &S,
    usernames: &[String],
    max_concurrency: Option<usize>,
) -> HashMap<String, RankResult>
where
    S: RankSource + ?Sized,
{
    let width = max_concurrency.unwrap_or(usernames.len()).max(1);

    info!("Fetching contest ranks for {} users ({} at a time)", usernames.len(), width);

    stream::iter(usernames.iter().cloned())
        .map(|username| async move {
            let result = source.fetch_rank(&username).await;
            if let Err(e) = &result {
                warn!("{e}");
            }
            (username, result)
        })
        .buffer_unordered(width)
        .collect()
        .await
}

/// Ranks ascending, then failures ordered by their error text.
/// Ties fall back to the username so the order never depends on the map.
fn standing_order(a: (&str, &RankResult), b: (&str, &RankResult)) -> Ordering {
    let by_rank = match (a.1, b.1) {
        (Ok(x), Ok(y)) => x.cmp(y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(x), Err(y)) => x.to_string().cmp(&y.to_string()),
    };

    by_rank.then_with(|| a.0.cmp(b.0))
}

pub fn sorted_standings(ranks: &HashMap<String, RankResult>) -> Vec<(&str, &RankResult)> {
    let mut standings: Vec<_> = ranks
        .iter()
        .map(|(username, rank)| (username.as_str(), rank))
        .collect();
    standings.sort_by(|a, b| standing_order(*a, *b));
    standings
}

const HEADER: &str = "```Standings\n";
const FOOTER: &str = "```";
const ELLIPSIS: &str = "...";

fn rank_text(rank: &RankResult) -> String {
    match rank {
        Ok(place) => place.to_string(),
        Err(e) => e.to_string(),
    }
}

fn row(username: &str, rank: &RankResult) -> String {
    format!("{}\t{}", username, rank_text(rank))
}

fn code_block(rows: &str) -> String {
    MessageBuilder::new()
        .push(HEADER)
        .push(rows)
        .push(FOOTER)
        .build()
}

/// Cuts `line` to at most `max_len` bytes, marking the cut with an ellipsis.
fn truncate_line(line: &mut String, max_len: usize) {
    if line.len() <= max_len {
        return;
    }

    let mut end = max_len.saturating_sub(ELLIPSIS.len());
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    line.truncate(end);
    line.push_str(ELLIPSIS);
}

pub fn render_leaderboard(standings: &[(&str, &RankResult)]) -> String {
    let mut builder = MessageBuilder::new();
    builder.push(HEADER);

    for (username, rank) in standings {
        builder.push_line(row(username, rank));
    }

    builder.push(FOOTER).build()
}

/// Splits the leaderboard into code blocks of at most `max_len` bytes each.
///
/// Rows keep their order across pages. A row too long for a page on its own
/// is truncated. An empty leaderboard still yields one bare block.
pub fn render_leaderboard_pages(
    standings: &[(&str, &RankResult)],
    max_len: usize,
) -> Vec<String> {
    let room = max_len.saturating_sub(HEADER.len() + FOOTER.len());
    let mut pages = Vec::new();
    let mut rows = String::new();

    for (username, rank) in standings {
        let mut line = row(username, rank);
        truncate_line(&mut line, room.saturating_sub(1));
        line.push('\n');

        if !rows.is_empty() && rows.len() + line.len() > room {
            pages.push(code_block(&rows));
            rows.clear();
        }
        rows.push_str(&line);
    }

    if !rows.is_empty() || pages.is_empty() {
        pages.push(code_block(&rows));
    }

    pages
}

pub async fn build_leaderboard_message<S>(
    source: &S,
    usernames: &[String],
    max_concurrency: Option<usize>,
) -> String
where
    S: RankSource + ?Sized,
{
    let ranks = fetch_all(source, usernames, max_concurrency).await;
    render_leaderboard(&sorted_standings(&ranks))
}

/// Like [`build_leaderboard_message`], split to fit a message size limit.
pub async fn build_leaderboard_pages<S>(
    source: &S,
    usernames: &[String],
    max_concurrency: Option<usize>,
    max_len: usize,
) -> Vec<String>
where
    S: RankSource + ?Sized,
{
    let ranks = fetch_all(source, usernames, max_concurrency).await;
    render_leaderboard_pages(&sorted_standings(&ranks), max_len)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::contest::{RankError, UNRANKED};

    fn transport(username: &str) -> RankResult {
        Err(RankError::Transport {
            username: username.to_string(),
            status: Some(500),
            reason: "HTTP 500 Internal Server Error".to_string(),
        })
    }

    #[test]
    fn ranks_sort_ascending_with_unranked_last() {
        let ranks = HashMap::from([
            ("alice".to_string(), Ok(50)),
            ("bob".to_string(), Ok(UNRANKED)),
            ("carol".to_string(), Ok(10)),
        ]);

        let order: Vec<_> = sorted_standings(&ranks).into_iter().map(|(u, _)| u).collect();
        assert_eq!(order, ["carol", "alice", "bob"]);
    }

    #[test]
    fn failures_sort_after_every_rank() {
        let ranks = HashMap::from([
            ("zed".to_string(), transport("zed")),
            ("amy".to_string(), Ok(UNRANKED)),
            (
                "bea".to_string(),
                Err(RankError::RemoteApi {
                    username: "bea".to_string(),
                    errors: json!([{"message": "nope"}]),
                }),
            ),
            ("cat".to_string(), Ok(3)),
        ]);

        let order: Vec<_> = sorted_standings(&ranks).into_iter().map(|(u, _)| u).collect();
        // "Error fetching..." < "Failed to fetch..."
        assert_eq!(order, ["cat", "amy", "bea", "zed"]);
    }

    #[test]
    fn equal_ranks_order_by_username() {
        let ranks = HashMap::from([
            ("b".to_string(), Ok(UNRANKED)),
            ("a".to_string(), Ok(UNRANKED)),
        ]);

        let order: Vec<_> = sorted_standings(&ranks).into_iter().map(|(u, _)| u).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn renders_rows_inside_code_block() {
        let ranks = HashMap::from([("a".to_string(), Ok(5)), ("b".to_string(), transport("b"))]);

        let message = render_leaderboard(&sorted_standings(&ranks));
        assert_eq!(
            message,
            "```Standings\n\
             a\t5\n\
             b\tFailed to fetch data for user b: HTTP 500 Internal Server Error\n\
             ```"
        );
    }

    #[test]
    fn empty_leaderboard_has_only_header_and_footer() {
        assert_eq!(render_leaderboard(&[]), "```Standings\n```");
        assert_eq!(render_leaderboard_pages(&[], 2000), ["```Standings\n```"]);
    }

    #[test]
    fn pages_split_between_rows() {
        let ranks = HashMap::from([
            ("alice".to_string(), Ok(50)),
            ("bob".to_string(), Ok(UNRANKED)),
            ("carol".to_string(), Ok(10)),
        ]);

        let pages = render_leaderboard_pages(&sorted_standings(&ranks), 40);
        assert_eq!(
            pages,
            [
                "```Standings\ncarol\t10\nalice\t50\n```",
                "```Standings\nbob\t1000000000\n```",
            ]
        );
    }

    #[test]
    fn single_page_matches_full_render() {
        let ranks = HashMap::from([("a".to_string(), Ok(5)), ("b".to_string(), transport("b"))]);
        let standings = sorted_standings(&ranks);

        assert_eq!(
            render_leaderboard_pages(&standings, 2000),
            [render_leaderboard(&standings)]
        );
    }

    #[test]
    fn long_error_rows_are_truncated_to_fit() {
        let ranks = HashMap::from([(
            "b".to_string(),
            Err(RankError::Transport {
                username: "b".to_string(),
                status: None,
                reason: "x".repeat(100),
            }),
        )]);

        let pages = render_leaderboard_pages(&sorted_standings(&ranks), 40);
        assert_eq!(pages, ["```Standings\nb\tFailed to fetch da...\n```"]);
    }

    #[test]
    fn many_failures_never_exceed_the_limit() {
        let ranks: HashMap<_, _> = (0..60)
            .map(|i| {
                let name = format!("user{i}");
                let err = Err(RankError::RemoteApi {
                    username: name.clone(),
                    errors: json!([{"message": "x".repeat(200)}]),
                });
                (name, err)
            })
            .collect();

        let pages = render_leaderboard_pages(&sorted_standings(&ranks), 2000);
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|p| p.len() <= 2000));

        let rows: usize = pages.iter().map(|p| p.lines().count() - 2).sum();
        assert_eq!(rows, 60);
    }
}
