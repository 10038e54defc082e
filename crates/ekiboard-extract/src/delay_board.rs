//! Delay-board extraction.
//!
//! The delay-board page ships its data as a single JSON blob in
//! `<script id="__NEXT_DATA__">`. We read `props.pageProps.troubleRails`,
//! take the first diagnostic entry of each line and sort lines into three
//! buckets by status code.

use ekiboard_core::{OperationEntry, OperationStatus};
use scraper::Html;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ExtractError, Result};
use crate::html::selector;
use crate::lexicon::{match_operator, UNKNOWN_OPERATOR};

/// Display name used when an entry carries none.
pub const UNKNOWN_ROUTE: &str = "不明な路線";

/// Summary text for a board with nothing to report.
pub const NO_DELAYS: &str = "現在、遅延情報はありません";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Suspended,
    Delayed,
    Other,
}

/// Status code → bucket. Codes not listed here land in [`Bucket::Other`].
pub const STATUS_BUCKETS: &[(&str, Bucket)] = &[
    ("運転状況", Bucket::Delayed),
    ("運転情報", Bucket::Delayed),
    ("列車遅延", Bucket::Delayed),
    ("運転再開", Bucket::Delayed),
    ("運転見合わせ", Bucket::Suspended),
];

pub fn classify(status: &str) -> Bucket {
    STATUS_BUCKETS
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(Bucket::Other)
}

/// Result of a successful delay-board extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayBoard {
    pub status: OperationStatus,
    /// Human-readable one-line summary for logs.
    pub summary: String,
}

/// A trouble-rail entry before classification.
#[derive(Debug, Clone)]
struct RawEntry {
    name: String,
    status: String,
    detail: String,
    company: String,
}

/// Extract the delay board from the raw page HTML.
///
/// Zero trouble rails is the normal "no delays" state and returns empty
/// buckets. A missing or unparseable JSON blob is an error.
pub fn extract_delay_board(html: &str) -> Result<DelayBoard> {
    let payload = embedded_payload(html)?;
    let data: Value = serde_json::from_str(&payload)?;

    let rails = data
        .pointer("/props/pageProps/troubleRails")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let entries = read_entries(rails);
    let status = categorize(entries);
    let summary = summarize(&status);
    info!(
        suspended = status.suspend.len(),
        delayed = status.delay.len(),
        other = status.trouble.len(),
        "{summary}"
    );
    Ok(DelayBoard { status, summary })
}

fn embedded_payload(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let script_sel = selector("script#__NEXT_DATA__")?;
    let script = document.select(&script_sel).next().ok_or_else(|| {
        ExtractError::PageStructureChanged("__NEXT_DATA__ script not found".to_string())
    })?;
    Ok(script.text().collect())
}

/// Read one raw entry per line. Later entries for the same display name
/// replace earlier ones; entries without diagnostics are skipped.
fn read_entries(rails: &[Value]) -> Vec<RawEntry> {
    let mut entries: Vec<RawEntry> = Vec::new();
    for item in rails {
        let property = item.pointer("/routeInfo/property");
        let name = property
            .and_then(|p| p.get("displayName"))
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ROUTE)
            .to_string();

        let Some(primary) = property
            .and_then(|p| p.get("diainfo"))
            .and_then(Value::as_array)
            .and_then(|list| list.first())
        else {
            debug!(route = %name, "trouble rail without diainfo, skipped");
            continue;
        };

        let entry = RawEntry {
            company: match_operator(&name).unwrap_or(UNKNOWN_OPERATOR).to_string(),
            status: str_field(primary, "status"),
            detail: str_field(primary, "message"),
            name,
        };
        match entries.iter_mut().find(|e| e.name == entry.name) {
            Some(slot) => *slot = entry,
            None => entries.push(entry),
        }
    }
    entries
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn categorize(entries: Vec<RawEntry>) -> OperationStatus {
    let mut status = OperationStatus::default();
    for e in entries {
        if e.detail.is_empty() {
            continue;
        }
        let bucket = classify(&e.status);
        let entry = OperationEntry {
            name: e.name,
            detail: e.detail,
            company: e.company,
        };
        match bucket {
            Bucket::Suspended => status.suspend.push(entry),
            Bucket::Delayed => status.delay.push(entry),
            Bucket::Other => status.trouble.push(entry),
        }
    }
    status
}

fn summarize(status: &OperationStatus) -> String {
    if status.is_empty() {
        return NO_DELAYS.to_string();
    }
    let mut parts = Vec::new();
    for (label, list) in [
        ("運転見合わせ: ", &status.suspend),
        ("遅延情報有り: ", &status.delay),
        ("お知らせ有り: ", &status.trouble),
    ] {
        if !list.is_empty() {
            let names: Vec<&str> = list.iter().map(|e| e.name.as_str()).collect();
            parts.push(format!("{label}{}", names.join(", ")));
        }
    }
    parts.join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(payload: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>運行情報</title></head><body>
<div id="__next"></div>
<script id="__NEXT_DATA__" type="application/json">{payload}</script>
</body></html>"#
        )
    }

    fn rail(name: &str, status: &str, message: &str) -> String {
        format!(
            r#"{{"routeInfo":{{"property":{{"displayName":"{name}","diainfo":[{{"status":"{status}","message":"{message}"}}]}}}}}}"#
        )
    }

    fn board(rails: &[String]) -> String {
        page(&format!(
            r#"{{"props":{{"pageProps":{{"troubleRails":[{}]}}}}}}"#,
            rails.join(",")
        ))
    }

    #[test]
    fn zero_rails_is_no_delays() {
        let out = extract_delay_board(&board(&[])).unwrap();
        assert!(out.status.is_empty());
        assert_eq!(out.summary, NO_DELAYS);
    }

    #[test]
    fn missing_rails_key_is_no_delays() {
        let out = extract_delay_board(&page(r#"{"props":{"pageProps":{}}}"#)).unwrap();
        assert!(out.status.is_empty());
    }

    #[test]
    fn missing_script_is_structure_change() {
        let err = extract_delay_board("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::PageStructureChanged(_)));
    }

    #[test]
    fn malformed_json_is_error() {
        let err = extract_delay_board(&page("{not json")).unwrap_err();
        assert!(matches!(err, ExtractError::Json(_)));
    }

    #[test]
    fn suspended_and_empty_message() {
        let html = board(&[
            rail("ＪＲ埼京線", "運転見合わせ", "人身事故の影響で運転を見合わせています。"),
            rail("京王線", "列車遅延", ""),
        ]);
        let out = extract_delay_board(&html).unwrap();
        assert_eq!(out.status.suspend.len(), 1);
        assert!(out.status.delay.is_empty());
        assert!(out.status.trouble.is_empty());
        assert_eq!(out.status.suspend[0].name, "ＪＲ埼京線");
        assert_eq!(out.status.suspend[0].company, "ＪＲ");
    }

    #[test]
    fn every_code_lands_in_exactly_one_bucket() {
        let codes = [
            ("運転状況", Bucket::Delayed),
            ("運転情報", Bucket::Delayed),
            ("列車遅延", Bucket::Delayed),
            ("運転再開", Bucket::Delayed),
            ("運転見合わせ", Bucket::Suspended),
            ("その他", Bucket::Other),
            ("", Bucket::Other),
        ];
        for (i, (code, expected)) in codes.iter().enumerate() {
            let html = board(&[rail(&format!("路線{i}"), code, "詳細")]);
            let out = extract_delay_board(&html).unwrap();
            assert_eq!(out.status.len(), 1, "code {code:?}");
            let landed = match expected {
                Bucket::Suspended => &out.status.suspend,
                Bucket::Delayed => &out.status.delay,
                Bucket::Other => &out.status.trouble,
            };
            assert_eq!(landed.len(), 1, "code {code:?} in wrong bucket");
        }
    }

    #[test]
    fn unknown_operator_and_route_defaults() {
        let html = board(&[
            rail("りんかい線", "列車遅延", "10分程度の遅れ"),
            r#"{"routeInfo":{"property":{"diainfo":[{"status":"運転再開","message":"再開しました"}]}}}"#
                .to_string(),
        ]);
        let out = extract_delay_board(&html).unwrap();
        assert_eq!(out.status.delay.len(), 2);
        assert_eq!(out.status.delay[0].company, UNKNOWN_OPERATOR);
        assert_eq!(out.status.delay[1].name, UNKNOWN_ROUTE);
    }

    #[test]
    fn rail_without_diainfo_is_skipped() {
        let html = board(&[
            r#"{"routeInfo":{"property":{"displayName":"東急東横線","diainfo":[]}}}"#.to_string(),
            rail("東急田園都市線", "運転情報", "遅れています"),
        ]);
        let out = extract_delay_board(&html).unwrap();
        assert_eq!(out.status.len(), 1);
        assert_eq!(out.status.delay[0].company, "東急");
    }

    #[test]
    fn duplicate_names_keep_last_entry() {
        let html = board(&[
            rail("小田急線", "列車遅延", "遅れ"),
            rail("小田急線", "運転見合わせ", "見合わせ"),
        ]);
        let out = extract_delay_board(&html).unwrap();
        assert_eq!(out.status.len(), 1);
        assert_eq!(out.status.suspend[0].detail, "見合わせ");
    }

    #[test]
    fn summary_lists_names_per_bucket() {
        let html = board(&[
            rail("ＪＲ埼京線", "運転見合わせ", "見合わせ"),
            rail("京王線", "列車遅延", "遅れ"),
        ]);
        let out = extract_delay_board(&html).unwrap();
        assert_eq!(out.summary, "運転見合わせ: ＪＲ埼京線 / 遅延情報有り: 京王線");
    }
}
