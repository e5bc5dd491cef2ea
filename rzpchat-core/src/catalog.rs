// rzpchat-core/src/catalog.rs

//! Static catalog of the Razorpay MCP tools and their argument schemas.

use serde_json::{Map, Value};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    Orders,
    Payments,
    PaymentLinks,
    QrCodes,
    Refunds,
    Settlements,
    Payouts,
    Tokens,
    Notifications,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 9] = [
        ToolGroup::Orders,
        ToolGroup::Payments,
        ToolGroup::PaymentLinks,
        ToolGroup::QrCodes,
        ToolGroup::Refunds,
        ToolGroup::Settlements,
        ToolGroup::Payouts,
        ToolGroup::Tokens,
        ToolGroup::Notifications,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ToolGroup::Orders => "Orders",
            ToolGroup::Payments => "Payments",
            ToolGroup::PaymentLinks => "Payment Links",
            ToolGroup::QrCodes => "QR Codes",
            ToolGroup::Refunds => "Refunds",
            ToolGroup::Settlements => "Settlements",
            ToolGroup::Payouts => "Payouts",
            ToolGroup::Tokens => "Tokens",
            ToolGroup::Notifications => "Notifications",
        }
    }
}

/// Schema of one remote tool: which arguments it cannot run without.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub group: ToolGroup,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// A chat phrasing that triggers this tool.
    pub usage: &'static str,
}

impl ToolSpec {
    /// First required argument that is absent or null in `params`.
    pub fn missing_required(&self, params: &Map<String, Value>) -> Option<&'static str> {
        self.required
            .iter()
            .copied()
            .find(|field| params.get(*field).map_or(true, Value::is_null))
    }

    pub fn accepts(&self, field: &str) -> bool {
        self.required.contains(&field) || self.optional.contains(&field)
    }
}

macro_rules! tool {
    ($name:literal, $group:ident, $desc:literal, [$($req:literal),*], [$($opt:literal),*], $usage:literal) => {
        ToolSpec {
            name: $name,
            group: ToolGroup::$group,
            description: $desc,
            required: &[$($req),*],
            optional: &[$($opt),*],
            usage: $usage,
        }
    };
}

pub static TOOLS: &[ToolSpec] = &[
    // Orders
    tool!("create_order", Orders, "Create a new order",
        ["amount", "currency"], ["receipt", "notes"],
        "create order for ₹500 receipt rcpt_42"),
    tool!("fetch_order", Orders, "Fetch an order by ID",
        ["order_id"], [], "fetch order order_ABC123"),
    tool!("fetch_all_orders", Orders, "List recent orders",
        [], ["count", "skip"], "list orders"),
    tool!("fetch_order_payments", Orders, "List payments made against an order",
        ["order_id"], [], "show payments for order_ABC123"),
    tool!("update_order", Orders, "Update the notes on an order",
        ["order_id", "notes"], [], "update order order_ABC123 notes: gift wrap"),
    // Payments
    tool!("fetch_payment", Payments, "Fetch a payment by ID",
        ["payment_id"], [], "fetch payment pay_ABC123"),
    tool!("fetch_payment_card_details", Payments, "Fetch card details used for a payment",
        ["payment_id"], [], "card details for pay_ABC123"),
    tool!("fetch_all_payments", Payments, "List recent payments",
        [], ["count", "skip"], "list payments"),
    tool!("capture_payment", Payments, "Capture an authorized payment",
        ["payment_id", "amount", "currency"], [], "capture payment pay_ABC123 for ₹100"),
    tool!("update_payment", Payments, "Update the notes on a payment",
        ["payment_id", "notes"], [], "update payment pay_ABC123 notes: priority customer"),
    // Payment links
    tool!("create_payment_link", PaymentLinks, "Create a standard payment link",
        ["amount", "currency"], ["description", "reference_id", "customer_name", "customer_email", "customer_contact"],
        "create payment link for ₹500"),
    tool!("create_payment_link_upi", PaymentLinks, "Create a UPI payment link",
        ["amount", "currency"], ["description", "reference_id", "customer_email", "customer_contact"],
        "create upi payment link for ₹500"),
    tool!("fetch_payment_link", PaymentLinks, "Fetch a payment link by ID",
        ["payment_link_id"], [], "fetch payment link plink_ABC123"),
    tool!("fetch_all_payment_links", PaymentLinks, "List payment links",
        [], ["count"], "list payment links"),
    tool!("update_payment_link", PaymentLinks, "Update the notes on a payment link",
        ["payment_link_id", "notes"], [], "update link plink_ABC123 notes: follow up"),
    // QR codes
    tool!("create_qr_code", QrCodes, "Create a UPI QR code",
        ["type", "usage"], ["fixed_amount", "payment_amount", "description", "customer_id"],
        "create qr code for ₹250"),
    tool!("fetch_qr_code", QrCodes, "Fetch a QR code by ID",
        ["qr_code_id"], [], "fetch qr qr_ABC123"),
    tool!("fetch_all_qr_codes", QrCodes, "List QR codes",
        [], ["count"], "list qr codes"),
    tool!("fetch_qr_codes_by_customer_id", QrCodes, "List QR codes for a customer",
        ["customer_id"], [], "qr codes for cust_ABC123"),
    tool!("fetch_qr_codes_by_payment_id", QrCodes, "Find the QR code a payment came through",
        ["payment_id"], [], "qr code for pay_ABC123"),
    tool!("fetch_payments_for_qr_code", QrCodes, "List payments received on a QR code",
        ["qr_code_id"], ["count"], "payments for qr_ABC123"),
    tool!("close_qr_code", QrCodes, "Close a QR code",
        ["qr_code_id"], [], "close qr qr_ABC123"),
    // Refunds
    tool!("create_refund", Refunds, "Refund a payment fully or partially",
        ["payment_id"], ["amount", "notes"], "refund pay_ABC123 ₹100"),
    tool!("fetch_refund", Refunds, "Fetch a refund by ID",
        ["refund_id"], [], "fetch refund rfnd_ABC123"),
    tool!("fetch_multiple_refunds_for_payment", Refunds, "List refunds issued for a payment",
        ["payment_id"], ["count"], "list refunds for pay_ABC123"),
    tool!("fetch_specific_refund_for_payment", Refunds, "Fetch one refund of a payment",
        ["payment_id", "refund_id"], [], "refund rfnd_ABC123 of pay_ABC123"),
    tool!("fetch_all_refunds", Refunds, "List recent refunds",
        [], ["count"], "list refunds"),
    tool!("update_refund", Refunds, "Update the notes on a refund",
        ["refund_id", "notes"], [], "update refund rfnd_ABC123 notes: duplicate charge"),
    // Settlements
    tool!("fetch_all_settlements", Settlements, "List settlements",
        [], ["count"], "list settlements"),
    tool!("fetch_settlement_with_id", Settlements, "Fetch a settlement by ID",
        ["settlement_id"], [], "fetch settlement setl_ABC123"),
    tool!("fetch_settlement_recon_details", Settlements, "Settlement reconciliation report for a month",
        ["year", "month"], ["day", "count"], "settlement recon for march 2024"),
    tool!("create_instant_settlement", Settlements, "Request an instant settlement",
        ["amount"], ["description"], "create instant settlement for ₹2000"),
    tool!("fetch_all_instant_settlements", Settlements, "List instant settlements",
        [], ["count"], "list instant settlements"),
    tool!("fetch_instant_settlement_with_id", Settlements, "Fetch an instant settlement by ID",
        ["settlement_id"], [], "fetch instant settlement setl_ABC123"),
    // Payouts
    tool!("fetch_all_payouts", Payouts, "List payouts from a RazorpayX account",
        ["account_number"], ["count"], "list payouts for account 7878780080316316"),
    tool!("fetch_payout_with_id", Payouts, "Fetch a payout by ID",
        ["payout_id"], [], "fetch payout pout_ABC123"),
    // Tokens
    tool!("fetch_tokens", Tokens, "List saved payment methods of a customer",
        ["customer_id"], [], "saved cards for cust_ABC123"),
    tool!("revoke_token", Tokens, "Revoke a customer's saved token",
        ["customer_id", "token_id"], [], "revoke token token_ABC123 for cust_ABC123"),
    // Notifications
    tool!("payment_link_notify", Notifications, "Resend a payment link by SMS or email",
        ["payment_link_id", "medium"], [], "send link plink_ABC123 via sms"),
];

pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

pub fn tools_in(group: ToolGroup) -> impl Iterator<Item = &'static ToolSpec> {
    TOOLS.iter().filter(move |spec| spec.group == group)
}

/// Markdown listing of every tool, grouped. Shown when the remote list is unavailable.
pub fn catalog_help_text() -> String {
    let mut out = String::from("**Available Razorpay tools**\n");
    for group in ToolGroup::ALL {
        let _ = write!(out, "\n**{}**\n", group.title());
        for spec in tools_in(group) {
            let _ = writeln!(out, "- `{}`: {} (try: _{}_)", spec.name, spec.description, spec.usage);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_tool_names_unique() {
        let names: HashSet<_> = TOOLS.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TOOLS.len());
    }

    #[test]
    fn test_every_group_has_tools() {
        for group in ToolGroup::ALL {
            assert!(tools_in(group).count() > 0, "{} has no tools", group.title());
        }
    }

    #[test]
    fn test_missing_required() {
        let spec = lookup("capture_payment").unwrap();
        let params = json!({"payment_id": "pay_1", "amount": null});
        assert_eq!(spec.missing_required(params.as_object().unwrap()), Some("amount"));

        let params = json!({"payment_id": "pay_1", "amount": 100, "currency": "INR"});
        assert_eq!(spec.missing_required(params.as_object().unwrap()), None);
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup("transfer_funds").is_none());
        assert!(lookup("fetch_order").is_some());
    }

    #[test]
    fn test_help_text_lists_all_groups() {
        let text = catalog_help_text();
        for group in ToolGroup::ALL {
            assert!(text.contains(group.title()));
        }
        assert!(text.contains("`create_payment_link`"));
    }
}
