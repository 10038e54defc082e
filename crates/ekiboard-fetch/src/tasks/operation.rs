use chrono::NaiveDateTime;
use ekiboard_core::time::format_timestamp;
use ekiboard_core::OperationSnapshot;
use ekiboard_extract::extract_delay_board;
use tracing::{error, info};

use super::{FetchContext, TaskReport};
use crate::error::Result;

/// Refresh `operation.json` from the delay board. Any failure writes `null`.
pub async fn fetch_operation(ctx: &FetchContext, now: NaiveDateTime) -> TaskReport {
    info!("updating operation info");
    let snapshot = match load(ctx, now).await {
        Ok(s) => s,
        Err(e) => {
            error!(code = e.code(), "operation info failed: {e}");
            return match ctx.store.write_operation(None) {
                Ok(()) => TaskReport::WrittenFailure,
                Err(e) => {
                    error!("could not write operation snapshot: {e}");
                    TaskReport::Skipped
                }
            };
        }
    };
    match ctx.store.write_operation(Some(&snapshot)) {
        Ok(()) => TaskReport::Written,
        Err(e) => {
            error!("could not write operation snapshot: {e}");
            TaskReport::Skipped
        }
    }
}

async fn load(ctx: &FetchContext, now: NaiveDateTime) -> Result<OperationSnapshot> {
    let html = ctx.upstream.delay_board().await?;
    let board = extract_delay_board(&html)?;
    Ok(OperationSnapshot {
        status: board.status,
        last_updated: format_timestamp(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::stub::{at, context, Reply, StubUpstream};

    fn board(rails: &str) -> Reply {
        Reply::Body(format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"pageProps":{{"troubleRails":[{rails}]}}}}}}</script></body></html>"#
        ))
    }

    fn stub(reply: Reply) -> StubUpstream {
        StubUpstream {
            delay_board: Some(reply),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn one_suspended_one_empty_message() {
        let rails = r#"{"routeInfo":{"property":{"displayName":"ＪＲ埼京線","diainfo":[{"status":"運転見合わせ","message":"人身事故"}]}}},
{"routeInfo":{"property":{"displayName":"京王線","diainfo":[{"status":"列車遅延","message":""}]}}}"#;
        let (_dir, _up, ctx) = context(stub(board(rails)));

        assert_eq!(fetch_operation(&ctx, at(8, 0)).await, TaskReport::Written);
        let snap = ctx.store.read_operation().unwrap();
        assert_eq!(snap.status.suspend.len(), 1);
        assert!(snap.status.delay.is_empty());
        assert!(snap.status.trouble.is_empty());
        assert_eq!(snap.last_updated, "2025-11-07T08:00:00.000000");
    }

    #[tokio::test]
    async fn zero_rails_writes_empty_buckets() {
        let (_dir, _up, ctx) = context(stub(board("")));
        assert_eq!(fetch_operation(&ctx, at(8, 0)).await, TaskReport::Written);
        assert!(ctx.store.read_operation().unwrap().status.is_empty());
    }

    #[tokio::test]
    async fn failures_write_null() {
        for reply in [
            Reply::Down,
            Reply::Status(500),
            Reply::Body("<html><body>maintenance</body></html>".into()),
        ] {
            let (_dir, _up, ctx) = context(stub(reply));
            assert_eq!(
                fetch_operation(&ctx, at(8, 0)).await,
                TaskReport::WrittenFailure
            );
            let raw = std::fs::read_to_string(
                ctx.store.path(ekiboard_store::SnapshotKind::Operation),
            )
            .unwrap();
            assert_eq!(raw.trim(), "null");
        }
    }
}
