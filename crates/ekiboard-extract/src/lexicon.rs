//! Ordered matching lexicons.
//!
//! Order is significant: the first entry that matches wins, so longer or
//! more specific names must come before the shorter names they contain
//! (e.g. "通勤快速" before "快速").

/// Train types, most specific first.
pub const TRAIN_TYPES: &[&str] = &[
    "ホリデー快速おくたま",
    "ホリデー快速あきがわ",
    "エアポート快特",
    "アクセス特急",
    "S-TRAIN",
    "TJライナー",
    "F-LINER",
    "Fライナー",
    "区間快速",
    "通勤快速",
    "中央特快",
    "青梅特快",
    "特別快速",
    "通勤特快",
    "新快速",
    "区間急行",
    "区間準急",
    "通勤準急",
    "快速急行",
    "各駅停車",
    "各停",
    "快速",
    "特快",
    "急行",
    "準急",
    "特急",
    "普通",
];

/// Train type assumed when no lexicon entry matches.
pub const DEFAULT_TRAIN_TYPE: &str = "各駅停車";

/// Operator name prefixes as they appear in line display names.
pub const OPERATORS: &[&str] = &[
    "ＪＲ",
    "JR",
    "東京メトロ",
    "都営",
    "京王",
    "小田急",
    "京急",
    "京成",
    "東武",
    "西武",
    "東急",
];

/// Operator reported when a display name starts with no known prefix.
pub const UNKNOWN_OPERATOR: &str = "社名未定義";

/// First train type (in lexicon order) contained in `raw`.
pub fn match_train_type(raw: &str) -> Option<&'static str> {
    TRAIN_TYPES.iter().copied().find(|t| raw.contains(t))
}

/// First operator (in lexicon order) that `display_name` starts with.
pub fn match_operator(display_name: &str) -> Option<&'static str> {
    OPERATORS.iter().copied().find(|c| display_name.starts_with(c))
}

/// Remove every operator name from `raw`.
///
/// Repeats until nothing changes, so removing one name can never expose
/// another and the result is a fixed point.
pub fn strip_operators(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let mut next = current.clone();
        for op in OPERATORS {
            next = next.replace(op, "");
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Split a raw transport label into `(train type, clean line name)`.
///
/// The matched train type is cut out of the label, then operator names are
/// removed and the remainder trimmed.
pub fn split_train_type_and_line(raw: &str) -> (String, String) {
    let (train_type, without_type) = match match_train_type(raw) {
        Some(t) => (t, raw.replace(t, "")),
        None => (DEFAULT_TRAIN_TYPE, raw.to_string()),
    };
    let line = strip_operators(&without_type).trim().to_string();
    (train_type.to_string(), line)
}

/// Drop the trailing "-bound" marker from a destination label.
pub fn strip_bound_suffix(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('行').unwrap_or(trimmed).to_string()
}
