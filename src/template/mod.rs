//! Email rendering.
//!
//! Pure functions that turn a [`JobPayload`] into a subject and an
//! inline-styled HTML body. Rendering never fails: every missing field
//! has a fallback ("there" for the recipient, "A user" for the sender,
//! placeholder images, and so on), so a sparse document can not take
//! down a whole fan-out.

use crate::config::EmailConfig;
use crate::notification::{DigestPayload, JobPayload, MessagePayload, PriceDropPayload};

/// Maximum characters of message text shown in the preview box.
const PREVIEW_CHARS: usize = 100;

const FALLBACK_RECIPIENT: &str = "there";
const FALLBACK_SENDER: &str = "A user";
const FALLBACK_LISTING_TITLE: &str = "a listing";
const FALLBACK_LOCATION: &str = "Unknown";

const PRICE_IMAGE_PLACEHOLDER: &str = "https://via.placeholder.com/400x300?text=No+Image";
const DIGEST_IMAGE_PLACEHOLDER: &str = "https://via.placeholder.com/300x200?text=No+Image";

/// Site identity baked into every email.
#[derive(Debug, Clone)]
pub struct Branding {
    pub site_name: String,
    pub base_url: String,
}

impl Branding {
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            site_name: config.site_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// A rendered email ready to wrap into an outbound message.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Render the email for a job payload.
pub fn render_email(
    payload: &JobPayload,
    recipient_name: Option<&str>,
    branding: &Branding,
) -> RenderedEmail {
    match payload {
        JobPayload::Message(p) => render_message(p, recipient_name, branding),
        JobPayload::PriceDrop(p) => render_price_drop(p, recipient_name, branding),
        JobPayload::Digest(p) => render_digest(p, recipient_name, branding),
    }
}

fn render_message(
    payload: &MessagePayload,
    recipient_name: Option<&str>,
    branding: &Branding,
) -> RenderedEmail {
    let recipient = recipient_name.unwrap_or(FALLBACK_RECIPIENT);
    let sender = payload.sender_name.as_deref().unwrap_or(FALLBACK_SENDER);
    let title = payload
        .listing_title
        .as_deref()
        .unwrap_or(FALLBACK_LISTING_TITLE);
    let preview = preview_text(&payload.message_text);
    let conversation_url = format!(
        "{}/pages/messages/conversation.html?id={}",
        branding.base_url, payload.conversation_id
    );

    let subject = format!("\u{1f4ac} New message from {sender} about \"{title}\"");

    let body = format!(
        r#"<p style="font-size: 16px; color: #333;">Hi {recipient},</p>
<p style="font-size: 16px; color: #333;"><strong>{sender}</strong> sent you a message about "<strong>{title}</strong>":</p>
<div style="background-color: #f8f9fa; border-left: 4px solid #4A90E2; padding: 15px; margin: 20px 0; font-style: italic; color: #555;">"{preview}..."</div>
{button}"#,
        button = cta_button(&conversation_url, "View Message", "#4A90E2"),
    );

    RenderedEmail {
        subject,
        html: wrap_shell(
            branding,
            ("#4A90E2", "#357ABD"),
            &format!("\u{1f341} {}", branding.site_name),
            &body,
            "Don't want these emails?",
            "Manage preferences",
        ),
    }
}

fn render_price_drop(
    payload: &PriceDropPayload,
    recipient_name: Option<&str>,
    branding: &Branding,
) -> RenderedEmail {
    let recipient = recipient_name.unwrap_or(FALLBACK_RECIPIENT);
    let title = payload
        .listing_title
        .as_deref()
        .unwrap_or(FALLBACK_LISTING_TITLE);
    let image = payload
        .image_url
        .as_deref()
        .unwrap_or(PRICE_IMAGE_PLACEHOLDER);
    let new_price = format_price(payload.new_price);
    let old_price = format_price(payload.old_price);
    let amount = format_price(payload.drop_amount);
    let percent = payload.drop_percent;
    let listing_url = format!(
        "{}/pages/listing-detail.html?id={}",
        branding.base_url, payload.listing_id
    );

    let subject = format!(
        "\u{1f4b0} Price drop alert: {title} is now {new_price} ({percent}% off!)"
    );

    let body = format!(
        r#"<p style="font-size: 16px; color: #333;">Hi {recipient},</p>
<p style="font-size: 16px; color: #333;">Great news! An item you favorited just dropped in price:</p>
<div style="border: 1px solid #e9ecef; border-radius: 8px; overflow: hidden; margin: 20px 0;">
<img src="{image}" alt="{title}" width="100%" style="display: block; max-height: 250px; object-fit: cover;">
<div style="padding: 20px;">
<h2 style="margin: 0 0 10px 0; color: #333; font-size: 20px;">{title}</h2>
<p style="margin: 0 0 10px 0;"><span style="color: #10b981; font-size: 24px; font-weight: bold;">{new_price}</span> <span style="color: #999; text-decoration: line-through; font-size: 16px; margin-left: 10px;">{old_price}</span></p>
<span style="display: inline-block; background-color: #d1fae5; color: #059669; padding: 5px 12px; border-radius: 20px; font-size: 14px; font-weight: bold;">Save {amount} ({percent}% off!)</span>
</div>
</div>
{button}"#,
        button = cta_button(&listing_url, "View Listing", "#10b981"),
    );

    RenderedEmail {
        subject,
        html: wrap_shell(
            branding,
            ("#10b981", "#059669"),
            "\u{1f4b0} Price Drop Alert!",
            &body,
            "Don't want price alerts?",
            "Manage preferences",
        ),
    }
}

fn render_digest(
    payload: &DigestPayload,
    recipient_name: Option<&str>,
    branding: &Branding,
) -> RenderedEmail {
    let recipient = recipient_name.unwrap_or(FALLBACK_RECIPIENT);
    let total = payload.listings.len();
    let browse_url = format!("{}/pages/browse-listings.html", branding.base_url);

    let subject = format!(
        "\u{1f4ec} Your weekly digest: {total} new listings this week"
    );

    let mut cards = String::new();
    for listing in &payload.listings {
        let image = listing
            .image_url
            .as_deref()
            .unwrap_or(DIGEST_IMAGE_PLACEHOLDER);
        let price = format_price(listing.price);
        let city = listing.city.as_deref().unwrap_or(FALLBACK_LOCATION);
        let province = listing.province.as_deref().unwrap_or(FALLBACK_LOCATION);
        cards.push_str(&format!(
            r#"<div style="border: 1px solid #e9ecef; border-radius: 8px; overflow: hidden; margin: 15px 0;">
<img src="{image}" alt="{title}" width="100%" style="display: block; max-height: 180px; object-fit: cover;">
<div style="padding: 15px;">
<h3 style="margin: 0 0 8px 0; color: #333; font-size: 16px;">{title}</h3>
<p style="margin: 0 0 5px 0; color: #10b981; font-weight: bold; font-size: 18px;">{price}</p>
<p style="margin: 0; color: #6c757d; font-size: 14px;">{pin} {city}, {province}</p>
</div>
</div>
"#,
            title = listing.title,
            pin = '\u{1f4cd}',
        ));
    }

    let body = format!(
        r#"<p style="font-size: 16px; color: #333;">Hi {recipient},</p>
<p style="font-size: 16px; color: #333;">Here are {total} new listings from this week that might interest you:</p>
{cards}{button}"#,
        button = cta_button(&browse_url, "Browse All Listings", "#6366f1"),
    );

    RenderedEmail {
        subject,
        html: wrap_shell(
            branding,
            ("#6366f1", "#4f46e5"),
            "\u{1f4ec} Your Weekly Digest",
            &body,
            "Don't want weekly digests?",
            "Unsubscribe",
        ),
    }
}

/// First [`PREVIEW_CHARS`] characters of the message text.
///
/// Counts characters, not bytes, so multi-byte text never splits mid
/// character.
fn preview_text(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Format a dollar amount with thousands separators.
///
/// Whole amounts render without cents (`$1,200`), fractional amounts
/// with two decimals (`$1,199.99`).
fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    let whole = group_thousands(&(cents / 100).to_string());
    let frac = cents % 100;

    if frac == 0 {
        format!("{sign}${whole}")
    } else {
        format!("{sign}${whole}.{frac:02}")
    }
}

fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

fn cta_button(url: &str, label: &str, color: &str) -> String {
    format!(
        r#"<table role="presentation" cellpadding="0" cellspacing="0" align="center" style="margin: 30px auto;">
<tr><td style="border-radius: 6px; background: {color};">
<a href="{url}" style="display: inline-block; padding: 14px 30px; color: #ffffff; text-decoration: none; font-weight: bold;">{label}</a>
</td></tr>
</table>"#
    )
}

fn wrap_shell(
    branding: &Branding,
    gradient: (&str, &str),
    header: &str,
    body: &str,
    footer_prompt: &str,
    footer_link_label: &str,
) -> String {
    let settings_url = format!("{}/pages/notification-settings.html", branding.base_url);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0">
<tr><td align="center" style="padding: 20px 0;">
<table role="presentation" width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px; overflow: hidden;">
<tr><td style="background: linear-gradient(135deg, {g0} 0%, {g1} 100%); padding: 30px; text-align: center;">
<h1 style="color: #ffffff; margin: 0; font-size: 24px;">{header}</h1>
</td></tr>
<tr><td style="padding: 30px;">
{body}
</td></tr>
<tr><td style="padding: 20px 30px; background-color: #f8f9fa; text-align: center; border-top: 1px solid #e9ecef;">
<p style="color: #6c757d; font-size: 12px; margin: 0 0 10px 0;">{footer_prompt} <a href="{settings_url}" style="color: #4A90E2;">{footer_link_label}</a></p>
<p style="color: #adb5bd; font-size: 11px; margin: 0;">© {site_name}. All rights reserved.</p>
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#,
        g0 = gradient.0,
        g1 = gradient.1,
        site_name = branding.site_name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::DigestListing;

    fn branding() -> Branding {
        Branding {
            site_name: "Canadian AI Classifieds".to_string(),
            base_url: "https://canadian-ai-classifieds.web.app".to_string(),
        }
    }

    fn message_payload(text: &str) -> JobPayload {
        JobPayload::Message(MessagePayload {
            conversation_id: "conv-1".to_string(),
            sender_name: Some("Alice".to_string()),
            listing_title: Some("Vintage Canoe".to_string()),
            message_text: text.to_string(),
        })
    }

    #[test]
    fn test_message_subject_and_links() {
        let email = render_email(&message_payload("Still available?"), Some("Bob"), &branding());
        assert_eq!(
            email.subject,
            "\u{1f4ac} New message from Alice about \"Vintage Canoe\""
        );
        assert!(email.html.contains("Hi Bob,"));
        assert!(email.html.contains("\"Still available?...\""));
        assert!(email
            .html
            .contains("/pages/messages/conversation.html?id=conv-1"));
        assert!(email.html.contains("View Message"));
    }

    #[test]
    fn test_message_fallbacks() {
        let payload = JobPayload::Message(MessagePayload {
            conversation_id: "conv-2".to_string(),
            sender_name: None,
            listing_title: None,
            message_text: "hello".to_string(),
        });
        let email = render_email(&payload, None, &branding());
        assert_eq!(
            email.subject,
            "\u{1f4ac} New message from A user about \"a listing\""
        );
        assert!(email.html.contains("Hi there,"));
    }

    #[test]
    fn test_preview_truncates_at_hundred_chars() {
        let long = "x".repeat(250);
        let email = render_email(&message_payload(&long), None, &branding());
        let expected = format!("\"{}...\"", "x".repeat(100));
        assert!(email.html.contains(&expected));
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        let long = "é".repeat(150);
        let email = render_email(&message_payload(&long), None, &branding());
        let expected = format!("\"{}...\"", "é".repeat(100));
        assert!(email.html.contains(&expected));
    }

    #[test]
    fn test_price_drop_subject_and_badge() {
        let payload = JobPayload::PriceDrop(PriceDropPayload {
            listing_id: "l1".to_string(),
            listing_title: Some("Sedan".to_string()),
            image_url: None,
            old_price: 400_000.0,
            new_price: 340_000.0,
            drop_amount: 60_000.0,
            drop_percent: 15,
        });
        let email = render_email(&payload, Some("Carol"), &branding());
        assert_eq!(
            email.subject,
            "\u{1f4b0} Price drop alert: Sedan is now $340,000 (15% off!)"
        );
        assert!(email.html.contains("Save $60,000 (15% off!)"));
        assert!(email.html.contains("$400,000"));
        assert!(email.html.contains(PRICE_IMAGE_PLACEHOLDER));
        assert!(email.html.contains("/pages/listing-detail.html?id=l1"));
    }

    #[test]
    fn test_digest_cards_and_location_fallback() {
        let payload = JobPayload::Digest(DigestPayload {
            listings: vec![
                DigestListing {
                    id: "l1".to_string(),
                    title: "Kayak".to_string(),
                    price: 550.0,
                    image_url: Some("https://img.example/kayak.jpg".to_string()),
                    city: Some("Halifax".to_string()),
                    province: Some("NS".to_string()),
                },
                DigestListing {
                    id: "l2".to_string(),
                    title: "Drill press".to_string(),
                    price: 1_199.99,
                    image_url: None,
                    city: None,
                    province: None,
                },
            ],
        });
        let email = render_email(&payload, None, &branding());
        assert_eq!(
            email.subject,
            "\u{1f4ec} Your weekly digest: 2 new listings this week"
        );
        assert!(email.html.contains("Halifax, NS"));
        assert!(email.html.contains("Unknown, Unknown"));
        assert!(email.html.contains("$1,199.99"));
        assert!(email.html.contains(DIGEST_IMAGE_PLACEHOLDER));
        assert!(email.html.contains("/pages/browse-listings.html"));
        assert!(email.html.contains("Unsubscribe"));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "$0");
        assert_eq!(format_price(95.0), "$95");
        assert_eq!(format_price(1_050.5), "$1,050.50");
        assert_eq!(format_price(400_000.0), "$400,000");
        assert_eq!(format_price(1_234_567.0), "$1,234,567");
        assert_eq!(format_price(949.99), "$949.99");
    }

    #[test]
    fn test_branding_trims_trailing_slash() {
        let config = EmailConfig {
            base_url: "https://example.com/".to_string(),
            ..EmailConfig::default()
        };
        let branding = Branding::from_config(&config);
        assert_eq!(branding.base_url, "https://example.com");
    }
}
