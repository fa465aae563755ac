//! JSON-lines sensor feed.

use std::io;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::warn;

use hazardwatch_core::RawAlert;

use crate::error::CliError;

/// Stdin placeholder for `--feed`.
pub const STDIN: &str = "-";

/// Open `path` (or stdin for `-`) as a stream of feed records.
pub async fn open(path: &str) -> Result<BoxStream<'static, RawAlert>, CliError> {
    if path == STDIN {
        return Ok(json_lines(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| CliError::FeedUnavailable {
            path: path.into(),
            source,
        })?;
    Ok(json_lines(file))
}

/// One record per line. Blank lines are skipped, malformed ones logged
/// and skipped.
pub fn json_lines<R>(reader: R) -> BoxStream<'static, RawAlert>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    LinesStream::new(BufReader::new(reader).lines())
        .filter_map(|line| futures_util::future::ready(parse_line(line)))
        .boxed()
}

fn parse_line(line: io::Result<String>) -> Option<RawAlert> {
    let line = match line {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, "feed read failed");
            return None;
        }
    };
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!(error = %e, line = trimmed, "skipping malformed feed record");
            None
        }
    }
}
