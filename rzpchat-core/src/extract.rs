// rzpchat-core/src/extract.rs

//! Regex helpers that pull parameters out of free text.
//!
//! Every function here is total: any input yields `None` (or the supplied
//! default) rather than an error.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Default amount, in paise, for call sites that tolerate a missing amount.
pub const DEFAULT_AMOUNT: u64 = 50_000;
/// Default capture amount, in paise.
pub const DEFAULT_CAPTURE_AMOUNT: u64 = 10_000;
/// Amounts at or above this many rupees are assumed to be stray numbers.
pub const MAX_MAJOR_AMOUNT: u64 = 1_000_000;

pub const DEFAULT_LIST_COUNT: u64 = 10;
const MAX_LIST_COUNT: u64 = 100;

/// Prefixes of Razorpay entity IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Order,
    Payment,
    Refund,
    PaymentLink,
    QrCode,
    Customer,
    Settlement,
    Payout,
    Token,
}

impl IdPrefix {
    pub const ALL: [IdPrefix; 9] = [
        IdPrefix::Order,
        IdPrefix::Payment,
        IdPrefix::Refund,
        IdPrefix::PaymentLink,
        IdPrefix::QrCode,
        IdPrefix::Customer,
        IdPrefix::Settlement,
        IdPrefix::Payout,
        IdPrefix::Token,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Order => "order_",
            IdPrefix::Payment => "pay_",
            IdPrefix::Refund => "rfnd_",
            IdPrefix::PaymentLink => "plink_",
            IdPrefix::QrCode => "qr_",
            IdPrefix::Customer => "cust_",
            IdPrefix::Settlement => "setl_",
            IdPrefix::Payout => "pout_",
            IdPrefix::Token => "token_",
        }
    }
}

// Shared numeric capture: digits with optional thousands separators and a decimal part.
// `to_minor_units` rejects fractions longer than two digits.
const NUM: &str = r"(\d[\d,]*(?:\.\d+)?)";

lazy_static! {
    static ref AMOUNT_PATTERNS: Vec<Regex> = [
        // ₹500, $20, rs. 500, INR 500
        format!(r"(?i)(?:₹|\$|\brs\.?|\binr)\s*{}", NUM),
        // 500₹, 500 rupees, 500rs, 500 inr
        format!(r"(?i){}\s*(?:₹|\brupees?\b|rs\b|\binr\b)", NUM),
        // amount: 500, amount of 500, amount = ₹500
        format!(r"(?i)\bamount\s*(?:[:=]|\bof\b|\bis\b)?\s*(?:₹|\$|rs\.?|inr)?\s*{}", NUM),
        // for 500
        format!(r"(?i)\bfor\s+{}\b", NUM),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("amount pattern is valid"))
    .collect();

    static ref ID_PATTERNS: HashMap<IdPrefix, Regex> = IdPrefix::ALL
        .iter()
        .map(|prefix| {
            let pattern = format!(r"(?i)\b{}\w+", regex::escape(prefix.as_str()));
            (*prefix, Regex::new(&pattern).expect("id pattern is valid"))
        })
        .collect();

    static ref EMAIL: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid");
    static ref PHONE: Regex =
        Regex::new(r"(?:^|[^\w+])(?:\+?91[\s-]?)?([6-9]\d{9})(?:$|\W)").expect("phone pattern is valid");
    static ref COUNT_PATTERNS: Vec<Regex> = [
        r"(?i)\b(?:last|latest|recent|top|first)\s+(\d{1,3})\b",
        r"(?i)\bcount\s*[:=]?\s*(\d{1,3})\b",
        r"(?i)\b(\d{1,3})\s+(?:recent\s+|latest\s+)?(?:orders|payments|refunds|links|payment links|settlements|payouts|qr codes|qrs)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("count pattern is valid"))
    .collect();
    static ref CURRENCY_CODE: Regex = Regex::new(r"(?i)\b(inr|usd|eur|gbp|sgd|aed)\b").expect("currency pattern is valid");
    static ref RECEIPT: Regex = Regex::new(r"(?i)\breceipt\s*[:#=]?\s*([\w-]+)").expect("receipt pattern is valid");
    static ref NOTES: Regex =
        Regex::new(r"(?i)\b(?:notes?|description|desc|reason)\s*[:=]\s*(.+)$").expect("notes pattern is valid");
    static ref YEAR: Regex = Regex::new(r"\b(20\d{2})\b").expect("year pattern is valid");
    static ref NUMERIC_MONTH: Regex =
        Regex::new(r"\b(20\d{2})[-/](\d{1,2})\b|\b(\d{1,2})[-/](20\d{2})\b").expect("month pattern is valid");
    static ref ACCOUNT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:account|acc|a/c)(?:\s*(?:number|no\.?|#))?\s*[:#]?\s*(\d{9,18})\b"
    )
    .expect("account pattern is valid");
}

const MONTHS: [(&str, u32); 12] = [
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

/// Converts a captured decimal string in major units to minor units.
/// `None` when the value is out of range or malformed.
fn to_minor_units(raw: &str) -> Option<u64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    let major: u64 = whole.parse().ok()?;
    if major >= MAX_MAJOR_AMOUNT {
        return None;
    }
    let minor: u64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>().ok()? * 10,
        2 => fraction.parse().ok()?,
        _ => return None,
    };
    Some(major * 100 + minor)
}

/// Extracts an amount in minor units (paise).
///
/// Patterns are tried in a fixed order; the first match whose value is below
/// [`MAX_MAJOR_AMOUNT`] wins.
pub fn extract_amount(text: &str) -> Option<u64> {
    AMOUNT_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| to_minor_units(m.as_str()))
    })
}

pub fn extract_amount_or(text: &str, default: u64) -> u64 {
    extract_amount(text).unwrap_or(default)
}

/// Finds an entity ID such as `order_ABC123`, keeping its original casing.
pub fn extract_entity_id(text: &str, prefix: IdPrefix) -> Option<String> {
    ID_PATTERNS
        .get(&prefix)
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Extracts an Indian mobile number, normalised to `+91XXXXXXXXXX`.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("+91{}", m.as_str()))
}

/// Page size requested for list commands ("last 5 orders", "count: 20").
pub fn extract_count(text: &str, default: u64) -> u64 {
    COUNT_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
        .map(|n| n.clamp(1, MAX_LIST_COUNT))
        .unwrap_or(default)
}

/// ISO currency code mentioned in the text, `INR` otherwise.
pub fn extract_currency(text: &str) -> String {
    if let Some(caps) = CURRENCY_CODE.captures(text) {
        return caps[1].to_uppercase();
    }
    if text.contains('$') {
        "USD".to_string()
    } else if text.contains('€') {
        "EUR".to_string()
    } else {
        "INR".to_string()
    }
}

pub fn extract_receipt(text: &str) -> Option<String> {
    RECEIPT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Free text following `notes:`, `description:` or `reason:`.
pub fn extract_notes(text: &str) -> Option<String> {
    NOTES
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_year(text: &str) -> Option<u32> {
    YEAR.captures(text).and_then(|caps| caps[1].parse().ok())
}

/// Month by name ("march", "Mar") or numeric form ("2024-03", "03/2024").
pub fn extract_month(text: &str) -> Option<u32> {
    if let Some(caps) = NUMERIC_MONTH.captures(text) {
        let month = caps
            .get(2)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if let Some(m) = month.filter(|m| (1..=12).contains(m)) {
            return Some(m);
        }
    }
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| word.len() >= 3)
        .find_map(|word| {
            MONTHS
                .iter()
                .find(|(abbr, _)| word.starts_with(abbr) && is_month_word(word))
                .map(|(_, n)| *n)
        })
}

fn is_month_word(word: &str) -> bool {
    const NAMES: [&str; 13] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december", "sept",
    ];
    word.len() == 3 || NAMES.contains(&word)
}

pub fn extract_account_number(text: &str) -> Option<String> {
    ACCOUNT_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Notification channel for payment links: `sms` or `email`.
pub fn extract_notify_medium(lower: &str) -> Option<&'static str> {
    if lower.contains("email") || lower.contains("mail") {
        Some("email")
    } else if lower.contains("sms") || lower.contains("text message") {
        Some("sms")
    } else {
        None
    }
}
