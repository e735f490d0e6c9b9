use crate::domain::subscription::SubscriptionTier;
use chrono::{DateTime, Utc};

const BRAND_NAME: &str = "MegaPDF";

fn primary_button(url: &str, label: &str) -> String {
    format!(
        r#"<a href="{url}" style="display:inline-block;padding:12px 18px;background-color:#2563eb;color:#ffffff;text-decoration:none;border-radius:8px;font-weight:600;">{label}</a>"#
    )
}

fn wrap_email(headline: &str, greeting: &str, lead: &str, body: &str) -> String {
    format!(
        r#"<div style="font-family:Arial,sans-serif;max-width:600px;margin:0 auto;color:#111827;">
<h1 style="font-size:22px;margin:0 0 16px;">{headline}</h1>
<p style="margin:0 0 12px;">{greeting}</p>
<p style="margin:0 0 12px;color:#374151;">{lead}</p>
{body}
<p style="margin:24px 0 0;color:#6b7280;font-size:12px;">{BRAND_NAME} Billing</p>
</div>"#
    )
}

fn greeting(name: &str) -> String {
    if name.is_empty() {
        "Hello,".to_string()
    } else {
        format!("Hello {},", name)
    }
}

fn plan_label(tier: SubscriptionTier) -> String {
    let name = tier.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Subject and HTML for the renewal reminder sent before a paid period ends
pub fn renewal_reminder_email(
    app_url: &str,
    name: &str,
    tier: SubscriptionTier,
    period_end: DateTime<Utc>,
) -> (String, String) {
    let plan = plan_label(tier);
    let subject = format!("Your {} {} subscription renews soon", BRAND_NAME, plan);
    let lead = format!(
        "Your <strong>{}</strong> plan ends on <strong>{}</strong>. Make sure your payment method is up to date to keep your access.",
        plan,
        period_end.format("%B %-d, %Y")
    );
    let body = primary_button(&format!("{}/en/dashboard", app_url), "Manage subscription");

    let html = wrap_email("Subscription renewal reminder", &greeting(name), &lead, &body);
    (subject, html)
}

/// Subject and HTML for the notice sent when a paid period lapsed
pub fn subscription_expired_email(app_url: &str, name: &str, tier: SubscriptionTier) -> (String, String) {
    let plan = plan_label(tier);
    let subject = format!("Your {} {} subscription has expired", BRAND_NAME, plan);
    let lead = format!(
        "Your <strong>{}</strong> plan has expired and your account is now on the Free plan.",
        plan
    );
    let body = primary_button(&format!("{}/en/pricing", app_url), "Renew subscription");

    let html = wrap_email("Subscription expired", &greeting(name), &lead, &body);
    (subject, html)
}
