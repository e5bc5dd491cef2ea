// rzpchat-core/src/classifier.rs

//! Maps free-text chat commands to a single MCP tool invocation.
//!
//! Classification is an ordered table of [`Rule`]s evaluated first-match-wins.
//! The order carries meaning: for example "create payment for order_X" must
//! reach the payment-link rule before the order-creation rule sees "order".
//! Every candidate is validated against the tool's schema in [`crate::catalog`];
//! a missing required argument turns into [`ClassifiedRequest::NeedInput`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, trace, warn};

use crate::catalog::{self, ToolSpec};
use crate::extract::{self, IdPrefix};

/// Outcome of classifying one chat command.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClassifiedRequest {
    ListTools,
    CallTool {
        tool: String,
        params: Map<String, Value>,
    },
    NeedInput {
        tool: String,
        missing: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ClassifiedRequest {
    pub fn tool(&self) -> Option<&str> {
        match self {
            ClassifiedRequest::ListTools => None,
            ClassifiedRequest::CallTool { tool, .. } | ClassifiedRequest::NeedInput { tool, .. } => {
                Some(tool)
            }
        }
    }
}

/// A chat command prepared for rule evaluation.
///
/// `text` keeps the original casing for ID extraction; `stripped` has every
/// entity ID blanked out so keyword and amount tests cannot fire on ID
/// fragments such as `order_refund1`.
pub struct Command<'a> {
    text: &'a str,
    stripped: String,
    keywords: String,
}

lazy_static! {
    static ref ANY_ID: Regex =
        Regex::new(r"(?i)\b(?:order|pay|rfnd|plink|qr|cust|setl|pout|token)_\w+").expect("id pattern is valid");
}

const CREATE_WORDS: &[&str] = &["create", "generate", "make"];
// Only count as a create verb when no fetch verb is present: "get the new order order_X".
const WEAK_CREATE_WORDS: &[&str] = &["new", "raise"];
const FETCH_WORDS: &[&str] = &["fetch", "get", "show", "view", "check", "status", "details", "find"];
const QUESTION_WORDS: &[&str] = &[
    "how", "what", "why", "when", "where", "who", "which", "is", "are", "does", "do", "can", "should", "explain",
];
const COMMAND_VERBS: &[&str] = &[
    "list", "show", "get", "fetch", "find", "view", "check", "create", "generate", "make", "refund", "capture",
    "update", "close", "revoke", "send", "resend", "notify", "remind",
];
const POLITE_PREFIXES: &[&str] = &["please ", "can you ", "could you ", "would you "];
const HELP_PHRASES: &[&str] = &[
    "list tools",
    "list all tools",
    "show tools",
    "available tools",
    "what tools",
    "which tools",
    "what can you do",
    "show commands",
    "list commands",
];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl<'a> Command<'a> {
    pub fn new(text: &'a str) -> Self {
        let stripped = ANY_ID.replace_all(text, " ").into_owned();
        let keywords = stripped.to_lowercase();
        Self {
            text,
            stripped,
            keywords,
        }
    }

    fn id(&self, prefix: IdPrefix) -> Option<String> {
        extract::extract_entity_id(self.text, prefix)
    }

    fn has_id(&self, prefix: IdPrefix) -> bool {
        self.id(prefix).is_some()
    }

    /// Whole-word match against the lower-cased keyword text.
    fn word(&self, word: &str) -> bool {
        let hay = self.keywords.as_str();
        hay.match_indices(word).any(|(i, _)| {
            let before = hay[..i].chars().next_back();
            let after = hay[i + word.len()..].chars().next();
            !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char)
        })
    }

    fn any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.word(w))
    }

    /// Substring match against the lower-cased keyword text.
    fn mentions(&self, needle: &str) -> bool {
        self.keywords.contains(needle)
    }

    fn wants_fetch(&self) -> bool {
        self.any_word(FETCH_WORDS)
    }

    fn wants_create(&self) -> bool {
        self.any_word(CREATE_WORDS) || (self.any_word(WEAK_CREATE_WORDS) && !self.wants_fetch())
    }

    fn wants_update(&self) -> bool {
        self.any_word(&["update", "edit", "modify", "change"])
    }

    fn amount(&self) -> Option<u64> {
        extract::extract_amount(&self.stripped)
    }

    fn currency(&self) -> String {
        extract::extract_currency(&self.stripped)
    }

    fn count(&self) -> u64 {
        extract::extract_count(&self.stripped, extract::DEFAULT_LIST_COUNT)
    }

    fn notes(&self) -> Option<String> {
        extract::extract_notes(self.text)
    }

    fn is_help(&self) -> bool {
        let trimmed = self.keywords.trim().trim_end_matches(['?', '!', '.']);
        matches!(trimmed, "help" | "tools" | "commands" | "menu")
            || HELP_PHRASES.iter().any(|p| self.mentions(p))
    }

    /// Reads as a question rather than an instruction, and names no entity.
    fn is_question(&self) -> bool {
        if ANY_ID.is_match(self.text) {
            return false;
        }
        let mut sentence = self.keywords.trim();
        for prefix in POLITE_PREFIXES {
            if let Some(rest) = sentence.strip_prefix(prefix) {
                sentence = rest.trim_start();
            }
        }
        let first = sentence.split(|ch: char| !is_word_char(ch)).next().unwrap_or_default();
        if COMMAND_VERBS.contains(&first) {
            return false;
        }
        QUESTION_WORDS.contains(&first) || sentence.ends_with('?')
    }
}

/// One entry of the classification table.
pub struct Rule {
    pub name: &'static str,
    pub tool: &'static str,
    matches: fn(&Command) -> bool,
    build: fn(&Command) -> Map<String, Value>,
}

impl Rule {
    pub fn matches(&self, command: &Command) -> bool {
        (self.matches)(command)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("tool", &self.tool)
            .finish()
    }
}

fn put<V: Into<Value>>(params: &mut Map<String, Value>, key: &str, value: Option<V>) {
    if let Some(v) = value {
        params.insert(key.to_string(), v.into());
    }
}

fn notes_object(c: &Command) -> Option<Value> {
    c.notes().map(|n| json!({ "note": n }))
}

fn with_count(c: &Command) -> Map<String, Value> {
    let mut p = Map::new();
    p.insert("count".into(), json!(c.count()));
    p
}

fn link_params(c: &Command) -> Map<String, Value> {
    let mut p = Map::new();
    put(&mut p, "amount", c.amount());
    p.insert("currency".into(), json!(c.currency()));
    let order_id = c.id(IdPrefix::Order);
    let description = c
        .notes()
        .or_else(|| order_id.as_ref().map(|id| format!("Payment for {}", id)));
    put(&mut p, "description", description);
    put(&mut p, "reference_id", order_id);
    put(&mut p, "customer_email", extract::extract_email(c.text));
    put(&mut p, "customer_contact", extract::extract_phone(&c.stripped));
    p
}

lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        // --- Notifications ---
        Rule {
            name: "notify_payment_link",
            tool: "payment_link_notify",
            matches: |c| {
                (c.has_id(IdPrefix::PaymentLink) && c.any_word(&["send", "resend", "notify", "remind", "share"]))
                    || (c.any_word(&["resend", "notify", "remind"]) && c.mentions("link") && !c.wants_create())
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_link_id", c.id(IdPrefix::PaymentLink));
                put(&mut p, "medium", extract::extract_notify_medium(&c.keywords));
                p
            },
        },
        // --- Creation intents. Refund and QR phrasing can contain "payment",
        // so both sit ahead of payment links, which sit ahead of orders. ---
        Rule {
            name: "create_qr_code",
            tool: "create_qr_code",
            matches: |c| c.wants_create() && (c.word("qr") || c.mentions("qr code")),
            build: |c| {
                let mut p = Map::new();
                p.insert("type".into(), json!("upi_qr"));
                let usage = if c.any_word(&["multiple", "reusable", "multi", "static"]) {
                    "multiple_use"
                } else {
                    "single_use"
                };
                p.insert("usage".into(), json!(usage));
                let amount = c.amount().or_else(|| {
                    (c.word("fixed") || usage == "single_use").then_some(extract::DEFAULT_AMOUNT)
                });
                if let Some(amount) = amount {
                    p.insert("fixed_amount".into(), json!(true));
                    p.insert("payment_amount".into(), json!(amount));
                }
                put(&mut p, "description", c.notes());
                put(&mut p, "customer_id", c.id(IdPrefix::Customer));
                p
            },
        },
        Rule {
            name: "fetch_specific_refund_for_payment",
            tool: "fetch_specific_refund_for_payment",
            matches: |c| c.has_id(IdPrefix::Refund) && c.has_id(IdPrefix::Payment),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                put(&mut p, "refund_id", c.id(IdPrefix::Refund));
                p
            },
        },
        Rule {
            name: "update_refund",
            tool: "update_refund",
            matches: |c| c.wants_update() && c.has_id(IdPrefix::Refund),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "refund_id", c.id(IdPrefix::Refund));
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        Rule {
            name: "fetch_refund",
            tool: "fetch_refund",
            matches: |c| c.has_id(IdPrefix::Refund),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "refund_id", c.id(IdPrefix::Refund));
                p
            },
        },
        Rule {
            name: "fetch_refunds_for_payment",
            tool: "fetch_multiple_refunds_for_payment",
            matches: |c| {
                c.has_id(IdPrefix::Payment)
                    && (c.mentions("refunds")
                        || (c.mentions("refund")
                            && c.any_word(&["fetch", "get", "show", "list", "view", "check", "status"])
                            && !c.wants_create()))
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                p
            },
        },
        Rule {
            name: "create_refund",
            tool: "create_refund",
            matches: |c| {
                c.word("refund")
                    && (c.wants_create()
                        || c.has_id(IdPrefix::Payment)
                        || c.any_word(&["issue", "initiate", "process"]))
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                put(&mut p, "amount", c.amount());
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        Rule {
            name: "fetch_all_refunds",
            tool: "fetch_all_refunds",
            matches: |c| c.mentions("refund"),
            build: with_count,
        },
        Rule {
            name: "create_instant_settlement",
            tool: "create_instant_settlement",
            matches: |c| {
                c.word("instant")
                    && c.mentions("settle")
                    && (c.wants_create() || c.any_word(&["request", "initiate", "settle"]))
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "amount", c.amount());
                put(&mut p, "description", c.notes());
                p
            },
        },
        Rule {
            name: "create_upi_payment_link",
            tool: "create_payment_link_upi",
            matches: |c| c.wants_create() && c.word("upi") && (c.mentions("link") || c.mentions("pay")),
            build: link_params,
        },
        Rule {
            name: "create_payment_link",
            tool: "create_payment_link",
            matches: |c| {
                c.wants_create() && (c.mentions("link") || c.mentions("payment") || c.mentions("pay for"))
            },
            build: link_params,
        },
        Rule {
            name: "create_order",
            tool: "create_order",
            matches: |c| c.wants_create() && c.mentions("order"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "amount", c.amount());
                p.insert("currency".into(), json!(c.currency()));
                put(&mut p, "receipt", extract::extract_receipt(c.text));
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        // --- Payments ---
        Rule {
            name: "capture_payment",
            tool: "capture_payment",
            matches: |c| c.word("capture"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                p.insert(
                    "amount".into(),
                    json!(extract::extract_amount_or(&c.stripped, extract::DEFAULT_CAPTURE_AMOUNT)),
                );
                p.insert("currency".into(), json!(c.currency()));
                p
            },
        },
        Rule {
            name: "fetch_payment_card_details",
            tool: "fetch_payment_card_details",
            matches: |c| c.has_id(IdPrefix::Payment) && c.mentions("card"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                p
            },
        },
        Rule {
            name: "fetch_qr_codes_by_payment_id",
            tool: "fetch_qr_codes_by_payment_id",
            matches: |c| c.has_id(IdPrefix::Payment) && c.word("qr"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                p
            },
        },
        Rule {
            name: "update_payment",
            tool: "update_payment",
            matches: |c| c.wants_update() && c.has_id(IdPrefix::Payment),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        Rule {
            name: "fetch_payment",
            tool: "fetch_payment",
            matches: |c| c.has_id(IdPrefix::Payment),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_id", c.id(IdPrefix::Payment));
                p
            },
        },
        // --- Orders ---
        Rule {
            name: "fetch_order_payments",
            tool: "fetch_order_payments",
            matches: |c| c.has_id(IdPrefix::Order) && c.mentions("payment"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "order_id", c.id(IdPrefix::Order));
                p
            },
        },
        Rule {
            name: "update_order",
            tool: "update_order",
            matches: |c| c.wants_update() && c.has_id(IdPrefix::Order),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "order_id", c.id(IdPrefix::Order));
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        Rule {
            name: "fetch_order",
            tool: "fetch_order",
            matches: |c| c.has_id(IdPrefix::Order),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "order_id", c.id(IdPrefix::Order));
                p
            },
        },
        // --- Payment links ---
        Rule {
            name: "update_payment_link",
            tool: "update_payment_link",
            matches: |c| c.wants_update() && c.has_id(IdPrefix::PaymentLink),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_link_id", c.id(IdPrefix::PaymentLink));
                put(&mut p, "notes", notes_object(c));
                p
            },
        },
        Rule {
            name: "fetch_payment_link",
            tool: "fetch_payment_link",
            matches: |c| c.has_id(IdPrefix::PaymentLink),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payment_link_id", c.id(IdPrefix::PaymentLink));
                p
            },
        },
        // --- QR codes ---
        Rule {
            name: "close_qr_code",
            tool: "close_qr_code",
            matches: |c| c.has_id(IdPrefix::QrCode) && c.any_word(&["close", "deactivate", "disable"]),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "qr_code_id", c.id(IdPrefix::QrCode));
                p
            },
        },
        Rule {
            name: "fetch_payments_for_qr_code",
            tool: "fetch_payments_for_qr_code",
            matches: |c| c.has_id(IdPrefix::QrCode) && c.mentions("payment"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "qr_code_id", c.id(IdPrefix::QrCode));
                p.insert("count".into(), json!(c.count()));
                p
            },
        },
        Rule {
            name: "fetch_qr_code",
            tool: "fetch_qr_code",
            matches: |c| c.has_id(IdPrefix::QrCode),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "qr_code_id", c.id(IdPrefix::QrCode));
                p
            },
        },
        Rule {
            name: "fetch_qr_codes_by_customer_id",
            tool: "fetch_qr_codes_by_customer_id",
            matches: |c| c.has_id(IdPrefix::Customer) && c.word("qr"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "customer_id", c.id(IdPrefix::Customer));
                p
            },
        },
        // --- Tokens ---
        Rule {
            name: "revoke_token",
            tool: "revoke_token",
            matches: |c| {
                c.any_word(&["revoke", "delete", "remove"])
                    && (c.has_id(IdPrefix::Token) || c.mentions("token") || c.mentions("saved card"))
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "customer_id", c.id(IdPrefix::Customer));
                put(&mut p, "token_id", c.id(IdPrefix::Token));
                p
            },
        },
        Rule {
            name: "fetch_tokens",
            tool: "fetch_tokens",
            matches: |c| {
                c.mentions("token")
                    || c.mentions("saved card")
                    || c.mentions("saved payment method")
                    || (c.has_id(IdPrefix::Customer) && c.mentions("card"))
            },
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "customer_id", c.id(IdPrefix::Customer));
                p
            },
        },
        // --- Settlements ---
        Rule {
            name: "fetch_instant_settlement_with_id",
            tool: "fetch_instant_settlement_with_id",
            matches: |c| c.has_id(IdPrefix::Settlement) && c.word("instant"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "settlement_id", c.id(IdPrefix::Settlement));
                p
            },
        },
        Rule {
            name: "fetch_settlement_with_id",
            tool: "fetch_settlement_with_id",
            matches: |c| c.has_id(IdPrefix::Settlement),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "settlement_id", c.id(IdPrefix::Settlement));
                p
            },
        },
        Rule {
            name: "fetch_settlement_recon_details",
            tool: "fetch_settlement_recon_details",
            matches: |c| c.mentions("recon"),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "year", extract::extract_year(&c.stripped));
                put(&mut p, "month", extract::extract_month(&c.stripped));
                p
            },
        },
        Rule {
            name: "fetch_all_instant_settlements",
            tool: "fetch_all_instant_settlements",
            matches: |c| c.word("instant") && c.mentions("settlement"),
            build: with_count,
        },
        Rule {
            name: "fetch_all_settlements",
            tool: "fetch_all_settlements",
            matches: |c| c.mentions("settlement"),
            build: with_count,
        },
        // --- Payouts ---
        Rule {
            name: "fetch_payout_with_id",
            tool: "fetch_payout_with_id",
            matches: |c| c.has_id(IdPrefix::Payout),
            build: |c| {
                let mut p = Map::new();
                put(&mut p, "payout_id", c.id(IdPrefix::Payout));
                p
            },
        },
        Rule {
            name: "fetch_all_payouts",
            tool: "fetch_all_payouts",
            matches: |c| c.mentions("payout"),
            build: |c| {
                let mut p = with_count(c);
                put(&mut p, "account_number", extract::extract_account_number(&c.stripped));
                p
            },
        },
        // --- Collections. Payment links before payments: "payment links" mentions both. ---
        Rule {
            name: "fetch_all_payment_links",
            tool: "fetch_all_payment_links",
            matches: |c| c.mentions("link"),
            build: with_count,
        },
        Rule {
            name: "fetch_all_qr_codes",
            tool: "fetch_all_qr_codes",
            matches: |c| c.word("qr") || c.mentions("qr code") || c.word("qrs"),
            build: with_count,
        },
        Rule {
            name: "fetch_all_orders",
            tool: "fetch_all_orders",
            matches: |c| c.word("orders") || c.word("order"),
            build: with_count,
        },
        Rule {
            name: "fetch_all_payments",
            tool: "fetch_all_payments",
            matches: |c| c.word("payments") || c.word("payment") || c.word("transactions"),
            build: with_count,
        },
    ];
}

/// The classification table, in evaluation order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Position of a rule in the table; lower positions win.
pub fn rule_position(name: &str) -> Option<usize> {
    RULES.iter().position(|r| r.name == name)
}

pub fn is_help_request(text: &str) -> bool {
    Command::new(text).is_help()
}

/// Whether `text` is phrased as a question ("How do refunds work?") with no entity ID.
pub fn is_question(text: &str) -> bool {
    Command::new(text).is_question()
}

/// Runs the rule table without the help check or the fallback.
pub fn match_rule(text: &str) -> Option<(&'static Rule, ClassifiedRequest)> {
    let command = Command::new(text);
    let rule = RULES.iter().find(|rule| rule.matches(&command))?;
    trace!(rule = rule.name, "Rule matched.");
    let params = (rule.build)(&command);
    Some((rule, validate(rule, params)))
}

/// Classifies a chat command. Never fails: unmatched text yields `ListTools`.
pub fn classify(text: &str) -> ClassifiedRequest {
    if is_help_request(text) {
        debug!("Help phrase detected; listing tools.");
        return ClassifiedRequest::ListTools;
    }
    match match_rule(text) {
        Some((rule, request)) => {
            debug!(rule = rule.name, tool = rule.tool, "Classified command.");
            request
        }
        None => {
            debug!("No rule matched; falling back to tool listing.");
            ClassifiedRequest::ListTools
        }
    }
}

fn validate(rule: &Rule, params: Map<String, Value>) -> ClassifiedRequest {
    let Some(spec) = catalog::lookup(rule.tool) else {
        warn!(rule = rule.name, tool = rule.tool, "Rule targets a tool missing from the catalog.");
        return ClassifiedRequest::ListTools;
    };
    match spec.missing_required(&params) {
        Some(missing) => ClassifiedRequest::NeedInput {
            tool: spec.name.to_string(),
            missing: missing.to_string(),
            message: Some(need_input_message(spec, missing)),
        },
        None => ClassifiedRequest::CallTool {
            tool: spec.name.to_string(),
            params,
        },
    }
}

fn describe_field(field: &str) -> String {
    match field {
        "amount" => "amount (for example ₹500)".into(),
        "order_id" => "order ID (order_...)".into(),
        "payment_id" => "payment ID (pay_...)".into(),
        "refund_id" => "refund ID (rfnd_...)".into(),
        "payment_link_id" => "payment link ID (plink_...)".into(),
        "qr_code_id" => "QR code ID (qr_...)".into(),
        "customer_id" => "customer ID (cust_...)".into(),
        "settlement_id" => "settlement ID (setl_...)".into(),
        "payout_id" => "payout ID (pout_...)".into(),
        "token_id" => "token ID (token_...)".into(),
        "notes" => "notes (for example \"notes: gift wrap\")".into(),
        "year" | "month" => "month and year (for example March 2024)".into(),
        "account_number" => "RazorpayX account number".into(),
        "medium" => "delivery channel (sms or email)".into(),
        other => other.replace('_', " "),
    }
}

fn need_input_message(spec: &ToolSpec, missing: &str) -> String {
    let mut action = spec.description.to_string();
    if let Some(first) = action.get_mut(0..1) {
        first.make_ascii_lowercase();
    }
    format!(
        "I need the {} to {}. Try something like: \"{}\"",
        describe_field(missing),
        action,
        spec.usage
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn call(tool: &str, params: Value) -> ClassifiedRequest {
        ClassifiedRequest::CallTool {
            tool: tool.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    fn tool_of(text: &str) -> Option<String> {
        classify(text).tool().map(str::to_string)
    }

    fn missing_of(text: &str) -> Option<String> {
        match classify(text) {
            ClassifiedRequest::NeedInput { missing, .. } => Some(missing),
            _ => None,
        }
    }

    #[test]
    fn test_list_orders() {
        assert_eq!(classify("list orders"), call("fetch_all_orders", json!({"count": 10})));
    }

    #[test]
    fn test_fetch_refund() {
        assert_eq!(
            classify("fetch refund rfnd_9XA7b2"),
            call("fetch_refund", json!({"refund_id": "rfnd_9XA7b2"}))
        );
    }

    #[test]
    fn test_payment_for_order_is_payment_link() {
        let request = classify("create payment for order_ABC123 for 500");
        match request {
            ClassifiedRequest::CallTool { tool, params } => {
                assert_eq!(tool, "create_payment_link");
                assert_eq!(params["amount"], json!(50_000));
                assert_eq!(params["reference_id"], json!("order_ABC123"));
                assert_eq!(params["currency"], json!("INR"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_payment_for_order_without_amount_needs_input() {
        match classify("create payment for order_ABC123") {
            ClassifiedRequest::NeedInput { tool, missing, message } => {
                assert_eq!(tool, "create_payment_link");
                assert_eq!(missing, "amount");
                assert!(message.unwrap().contains("create payment link for ₹500"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_rule_order_payment_link_before_order() {
        let link = rule_position("create_payment_link").unwrap();
        let order = rule_position("create_order").unwrap();
        let refund = rule_position("create_refund").unwrap();
        assert!(link < order);
        assert!(refund < link);
        assert!(rule_position("fetch_all_payment_links").unwrap() < rule_position("fetch_all_payments").unwrap());
    }

    #[test]
    fn test_help_takes_precedence() {
        assert_eq!(classify("help"), ClassifiedRequest::ListTools);
        assert_eq!(classify("What can you do?"), ClassifiedRequest::ListTools);
        assert_eq!(classify("list tools for order_ABC"), ClassifiedRequest::ListTools);
        assert!(!is_help_request("helpful order_ABC"));
    }

    #[test]
    fn test_unmatched_falls_back_to_list_tools() {
        assert_eq!(classify("how do webhooks work?"), ClassifiedRequest::ListTools);
        assert_eq!(classify(""), ClassifiedRequest::ListTools);
        assert!(match_rule("how do webhooks work?").is_none());
    }

    #[test]
    fn test_create_order() {
        assert_eq!(
            classify("create order for ₹750 receipt rcpt_9"),
            call(
                "create_order",
                json!({"amount": 75_000, "currency": "INR", "receipt": "rcpt_9"})
            )
        );
        assert_eq!(missing_of("create a new order").as_deref(), Some("amount"));
    }

    #[test]
    fn test_payment_link_with_customer_details() {
        match classify("generate payment link for ₹99 to jane@example.com 9876543210") {
            ClassifiedRequest::CallTool { tool, params } => {
                assert_eq!(tool, "create_payment_link");
                assert_eq!(params["amount"], json!(9_900));
                assert_eq!(params["customer_email"], json!("jane@example.com"));
                assert_eq!(params["customer_contact"], json!("+919876543210"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
        assert_eq!(tool_of("make upi link for ₹10").as_deref(), Some("create_payment_link_upi"));
    }

    #[test]
    fn test_payments() {
        assert_eq!(
            classify("get payment pay_ABC123"),
            call("fetch_payment", json!({"payment_id": "pay_ABC123"}))
        );
        assert_eq!(
            classify("capture payment pay_ABC123"),
            call(
                "capture_payment",
                json!({"payment_id": "pay_ABC123", "amount": 10_000, "currency": "INR"})
            )
        );
        assert_eq!(missing_of("capture the payment").as_deref(), Some("payment_id"));
        assert_eq!(tool_of("card used for pay_ABC").as_deref(), Some("fetch_payment_card_details"));
        assert_eq!(tool_of("show last 5 payments").as_deref(), Some("fetch_all_payments"));
        assert_eq!(missing_of("update payment pay_A").as_deref(), Some("notes"));
    }

    #[test]
    fn test_orders() {
        assert_eq!(
            classify("status of order_Xy9"),
            call("fetch_order", json!({"order_id": "order_Xy9"}))
        );
        assert_eq!(tool_of("payments for order_Xy9").as_deref(), Some("fetch_order_payments"));
        assert_eq!(
            classify("update order order_Xy9 notes: gift wrap"),
            call("update_order", json!({"order_id": "order_Xy9", "notes": {"note": "gift wrap"}}))
        );
    }

    #[test]
    fn test_refunds() {
        assert_eq!(
            classify("refund pay_ABC ₹100"),
            call("create_refund", json!({"payment_id": "pay_ABC", "amount": 10_000}))
        );
        assert_eq!(
            classify("create refund for payment pay_ABC"),
            call("create_refund", json!({"payment_id": "pay_ABC"}))
        );
        assert_eq!(missing_of("create a refund").as_deref(), Some("payment_id"));
        assert_eq!(
            tool_of("list refunds for pay_ABC").as_deref(),
            Some("fetch_multiple_refunds_for_payment")
        );
        assert_eq!(
            tool_of("refund rfnd_1 of pay_ABC").as_deref(),
            Some("fetch_specific_refund_for_payment")
        );
        assert_eq!(classify("list refunds"), call("fetch_all_refunds", json!({"count": 10})));
    }

    #[test]
    fn test_payment_links_and_notifications() {
        assert_eq!(
            classify("fetch link plink_Q1"),
            call("fetch_payment_link", json!({"payment_link_id": "plink_Q1"}))
        );
        assert_eq!(
            classify("resend plink_Q1 via email"),
            call("payment_link_notify", json!({"payment_link_id": "plink_Q1", "medium": "email"}))
        );
        assert_eq!(missing_of("send plink_Q1").as_deref(), Some("medium"));
        assert_eq!(missing_of("remind the customer about the link").as_deref(), Some("payment_link_id"));
        assert_eq!(tool_of("list payment links").as_deref(), Some("fetch_all_payment_links"));
    }

    #[test]
    fn test_qr_codes() {
        match classify("create qr code for ₹250") {
            ClassifiedRequest::CallTool { tool, params } => {
                assert_eq!(tool, "create_qr_code");
                assert_eq!(params["payment_amount"], json!(25_000));
                assert_eq!(params["usage"], json!("single_use"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
        assert_eq!(tool_of("close qr qr_77").as_deref(), Some("close_qr_code"));
        assert_eq!(tool_of("payments on qr_77").as_deref(), Some("fetch_payments_for_qr_code"));
        assert_eq!(tool_of("qr_77").as_deref(), Some("fetch_qr_code"));
        assert_eq!(tool_of("qr codes for cust_1").as_deref(), Some("fetch_qr_codes_by_customer_id"));
        assert_eq!(tool_of("qr for pay_1").as_deref(), Some("fetch_qr_codes_by_payment_id"));
        assert_eq!(tool_of("list qr codes").as_deref(), Some("fetch_all_qr_codes"));
    }

    #[test]
    fn test_settlements_payouts_tokens() {
        assert_eq!(tool_of("list settlements").as_deref(), Some("fetch_all_settlements"));
        assert_eq!(tool_of("show instant settlements").as_deref(), Some("fetch_all_instant_settlements"));
        assert_eq!(tool_of("settlement setl_5").as_deref(), Some("fetch_settlement_with_id"));
        assert_eq!(tool_of("instant settlement setl_5").as_deref(), Some("fetch_instant_settlement_with_id"));
        assert_eq!(
            classify("settlement recon for March 2024"),
            call("fetch_settlement_recon_details", json!({"year": 2024, "month": 3}))
        );
        assert_eq!(missing_of("settlement recon").as_deref(), Some("year"));
        assert_eq!(missing_of("create instant settlement").as_deref(), Some("amount"));
        assert_eq!(
            classify("list payouts for account 7878780080316316"),
            call("fetch_all_payouts", json!({"count": 10, "account_number": "7878780080316316"}))
        );
        assert_eq!(missing_of("list payouts").as_deref(), Some("account_number"));
        assert_eq!(tool_of("payout pout_1").as_deref(), Some("fetch_payout_with_id"));
        assert_eq!(
            classify("saved cards for cust_9"),
            call("fetch_tokens", json!({"customer_id": "cust_9"}))
        );
        assert_eq!(
            classify("revoke token_3 for cust_9"),
            call("revoke_token", json!({"customer_id": "cust_9", "token_id": "token_3"}))
        );
    }

    #[test]
    fn test_new_is_not_a_create_verb_next_to_fetch_verbs() {
        assert_eq!(
            classify("get the new order order_Xy9"),
            call("fetch_order", json!({"order_id": "order_Xy9"}))
        );
        assert_eq!(
            classify("show new refund rfnd_9XA7b2"),
            call("fetch_refund", json!({"refund_id": "rfnd_9XA7b2"}))
        );
        assert_eq!(missing_of("new order").as_deref(), Some("amount"));
        assert_eq!(tool_of("raise a refund for pay_ABC").as_deref(), Some("create_refund"));
    }

    #[test]
    fn test_creation_mentioning_notification_stays_creation() {
        match classify("create payment link for ₹500 and notify the customer") {
            ClassifiedRequest::CallTool { tool, params } => {
                assert_eq!(tool, "create_payment_link");
                assert_eq!(params["amount"], json!(50_000));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
        match classify("create payment for order_ABC123 for 500 and remind me with the link") {
            ClassifiedRequest::CallTool { tool, params } => {
                assert_eq!(tool, "create_payment_link");
                assert_eq!(params["amount"], json!(50_000));
                assert_eq!(params["reference_id"], json!("order_ABC123"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
        assert_eq!(tool_of("notify customer about plink_Q1 by sms").as_deref(), Some("payment_link_notify"));
    }

    #[test]
    fn test_is_question() {
        assert!(is_question("How do refunds work?"));
        assert!(is_question("what is a settlement"));
        assert!(is_question("How do I create a payment link?"));
        assert!(is_question("Payment link expiry?"));
        assert!(!is_question("list orders?"));
        assert!(!is_question("can you list orders?"));
        assert!(!is_question("what is the status of order_Xy9"));
        assert!(!is_question("create payment link for ₹500"));
        assert!(!is_question(""));
    }

    #[test]
    fn test_built_params_are_accepted_by_schema() {
        let commands = [
            "create qr code for ₹250 notes: stall 4",
            "create payment for order_ABC123 for 500 to jane@example.com 9876543210",
            "make upi link for ₹10",
            "create order for ₹750 receipt rcpt_9 notes: gift",
            "refund pay_ABC ₹100 notes: damaged",
            "capture payment pay_ABC123",
            "payments on qr_77 last 5",
            "revoke token_3 for cust_9",
            "settlement recon for March 2024",
            "list payouts for account 7878780080316316",
            "resend plink_Q1 via email",
            "create instant settlement for ₹2000 description: weekend",
        ];
        for text in commands {
            let Some((_, ClassifiedRequest::CallTool { tool, params })) = match_rule(text) else {
                panic!("{} did not produce a tool call", text);
            };
            let spec = catalog::lookup(&tool).unwrap();
            for key in params.keys() {
                assert!(spec.accepts(key), "{} does not accept {} (from {:?})", tool, key, text);
            }
        }
    }

    #[test]
    fn test_keywords_inside_ids_are_ignored() {
        assert_eq!(
            classify("get order_refund1"),
            call("fetch_order", json!({"order_id": "order_refund1"}))
        );
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(classify("list orders")).unwrap();
        assert_eq!(
            value,
            json!({"action": "call_tool", "tool": "fetch_all_orders", "params": {"count": 10}})
        );
        let value = serde_json::to_value(classify("help")).unwrap();
        assert_eq!(value, json!({"action": "list_tools"}));
        let value = serde_json::to_value(classify("create order")).unwrap();
        assert_eq!(value["action"], json!("need_input"));
        assert_eq!(value["missing"], json!("amount"));
    }

    #[test]
    fn test_every_rule_targets_catalog_tool() {
        for rule in rules() {
            assert!(catalog::lookup(rule.tool).is_some(), "rule {} targets unknown tool", rule.name);
        }
    }

    proptest! {
        #[test]
        fn prop_fetch_order_keeps_exact_id(
            verb in prop::sample::select(vec!["fetch", "get", "status of", "show", "details for"]),
            filler in prop::sample::select(vec!["", "the ", "the new ", "latest ", "my new "]),
            suffix in "[A-Za-z0-9]{1,14}",
        ) {
            let id = format!("order_{}", suffix);
            let text = format!("{} {}order {}", verb, filler, id);
            let expected = call("fetch_order", json!({ "order_id": id }));
            prop_assert_eq!(classify(&text), expected);
        }

        #[test]
        fn prop_payment_for_order_is_payment_link(
            verb in prop::sample::select(vec!["create", "generate", "make"]),
            noun in prop::sample::select(vec!["payment", "pay for"]),
            suffix in "[A-Za-z0-9]{1,14}",
            amount in proptest::option::of(1u64..1_000_000),
        ) {
            let id = format!("order_{}", suffix);
            let text = match amount {
                Some(n) => format!("{} {} {} for {}", verb, noun, id, n),
                None => format!("{} {} {}", verb, noun, id),
            };
            match (classify(&text), amount) {
                (ClassifiedRequest::CallTool { tool, params }, Some(n)) => {
                    prop_assert_eq!(tool, "create_payment_link");
                    prop_assert_eq!(&params["amount"], &json!(n * 100));
                    prop_assert_eq!(&params["reference_id"], &json!(id));
                }
                (ClassifiedRequest::NeedInput { tool, missing, .. }, None) => {
                    prop_assert_eq!(tool, "create_payment_link");
                    prop_assert_eq!(missing, "amount");
                }
                (other, _) => prop_assert!(false, "unexpected classification for {:?}: {:?}", text, other),
            }
        }

        #[test]
        fn prop_call_tool_satisfies_schema(text in "[a-z_ ₹0-9]{0,40}") {
            if let ClassifiedRequest::CallTool { tool, params } = classify(&text) {
                let spec = catalog::lookup(&tool).unwrap();
                prop_assert!(spec.missing_required(&params).is_none());
                for key in params.keys() {
                    prop_assert!(spec.accepts(key), "{} does not accept {}", tool, key);
                }
            }
        }
    }
}
