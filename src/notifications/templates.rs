use askama::Template;

use super::OutgoingEmail;
use crate::{dto::orders::OrderDto, models::OrderDetail};

#[derive(Template)]
#[template(path = "email/registration_otp.html")]
struct RegistrationOtpHtml<'a> {
    full_name: &'a str,
    code: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    full_name: &'a str,
    reset_link: &'a str,
    ttl_minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_changed.html")]
struct PasswordChangedHtml<'a> {
    full_name: &'a str,
    changed_at: &'a str,
}

struct CancelledLine {
    product_name: String,
    variant: String,
    quantity: i32,
    unit_price: String,
    line_total: String,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledHtml<'a> {
    invoice_number: &'a str,
    order_date: String,
    full_name: &'a str,
    payment_method: &'a str,
    shipping_address: &'a str,
    lines: Vec<CancelledLine>,
    shipping_cost: String,
    total_amount: String,
    reason: Option<&'a str>,
}

pub fn registration_otp(
    to: &str,
    full_name: &str,
    code: &str,
    ttl_minutes: i64,
) -> Result<OutgoingEmail, askama::Error> {
    let html_body = RegistrationOtpHtml {
        full_name,
        code,
        ttl_minutes,
    }
    .render()?;
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Mã xác thực đăng ký PetCare".to_string(),
        html_body,
    })
}

pub fn password_reset(
    to: &str,
    full_name: &str,
    reset_link: &str,
    ttl_minutes: i64,
) -> Result<OutgoingEmail, askama::Error> {
    let html_body = PasswordResetHtml {
        full_name,
        reset_link,
        ttl_minutes,
    }
    .render()?;
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Đặt lại mật khẩu PetCare".to_string(),
        html_body,
    })
}

pub fn password_changed(
    to: &str,
    full_name: &str,
    changed_at: &str,
) -> Result<OutgoingEmail, askama::Error> {
    let html_body = PasswordChangedHtml {
        full_name,
        changed_at,
    }
    .render()?;
    Ok(OutgoingEmail {
        to: to.to_string(),
        subject: "Mật khẩu của bạn đã được thay đổi".to_string(),
        html_body,
    })
}

pub fn order_cancelled(
    order: &OrderDto,
    details: &[OrderDetail],
    reason: Option<&str>,
) -> Result<OutgoingEmail, askama::Error> {
    let lines = details
        .iter()
        .map(|detail| CancelledLine {
            product_name: detail.product_name.clone(),
            variant: variant_label(detail),
            quantity: detail.quantity,
            unit_price: format_vnd(detail.price),
            line_total: format_vnd(detail.price * i64::from(detail.quantity)),
        })
        .collect();

    let html_body = OrderCancelledHtml {
        invoice_number: &order.invoice_number,
        order_date: order.order_date.format("%d/%m/%Y %H:%M").to_string(),
        full_name: &order.full_name,
        payment_method: &order.payment_method,
        shipping_address: &order.shipping_address,
        lines,
        shipping_cost: format_vnd(order.shipping_cost),
        total_amount: format_vnd(order.total_amount),
        reason: reason.map(str::trim).filter(|r| !r.is_empty()),
    }
    .render()?;

    Ok(OutgoingEmail {
        to: order.email.clone(),
        subject: format!("Đơn hàng {} đã bị hủy", order.invoice_number),
        html_body,
    })
}

fn variant_label(detail: &OrderDetail) -> String {
    [&detail.color_name, &detail.size_name, &detail.weight_name]
        .into_iter()
        .filter_map(|name| name.as_deref())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// `1250000` -> `1.250.000 ₫`
pub fn format_vnd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} ₫")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample_order() -> OrderDto {
        OrderDto {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            invoice_number: "INV-20241101-abcdef12".into(),
            order_date: Utc.with_ymd_and_hms(2024, 11, 1, 9, 30, 0).unwrap(),
            payment_method: "Thanh toán khi nhận hàng".into(),
            payment_status: "Chưa thanh toán".into(),
            shipping_address: "12 Lê Lợi, Bến Nghé, Quận 1, Hồ Chí Minh".into(),
            shipping_cost: 30_000,
            total_amount: 280_000,
            point_earned: 0,
            point_used: 0,
            status_id: 5,
            status_name: "Hủy".into(),
            voucher_id: None,
            full_name: "Nguyen <Van> A".into(),
            phone: Some("0901234567".into()),
            email: "buyer@example.com".into(),
        }
    }

    fn sample_detail() -> OrderDetail {
        OrderDetail {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_detail_id: Uuid::new_v4(),
            product_name: "Royal Canin Kitten".into(),
            brand_name: Some("Royal Canin".into()),
            category_name: Some("Cat food".into()),
            color_name: None,
            size_name: None,
            weight_name: Some("2kg".into()),
            quantity: 2,
            price: 125_000,
        }
    }

    #[test]
    fn vnd_amounts_are_grouped_by_thousands() {
        assert_eq!(format_vnd(0), "0 ₫");
        assert_eq!(format_vnd(999), "999 ₫");
        assert_eq!(format_vnd(1_000), "1.000 ₫");
        assert_eq!(format_vnd(1_250_000), "1.250.000 ₫");
        assert_eq!(format_vnd(-45_000), "-45.000 ₫");
    }

    #[test]
    fn cancellation_email_lists_lines_total_and_reason() {
        let email = order_cancelled(&sample_order(), &[sample_detail()], Some("Out of stock"))
            .unwrap();

        assert_eq!(email.to, "buyer@example.com");
        assert!(email.subject.contains("INV-20241101-abcdef12"));
        assert!(email.html_body.contains("Royal Canin Kitten"));
        assert!(email.html_body.contains("2kg"));
        assert!(email.html_body.contains("250.000 ₫"));
        assert!(email.html_body.contains("280.000 ₫"));
        assert!(email.html_body.contains("Out of stock"));
        assert!(email.html_body.contains("2024 09:30"));
    }

    #[test]
    fn customer_name_is_html_escaped() {
        let email = order_cancelled(&sample_order(), &[], None).unwrap();
        assert!(!email.html_body.contains("<Van>"));
    }

    #[test]
    fn otp_and_reset_emails_carry_their_secret() {
        let otp = registration_otp("a@b.c", "Lan", "482913", 10).unwrap();
        assert!(otp.html_body.contains("482913"));

        let reset = password_reset(
            "a@b.c",
            "Lan",
            "http://localhost:5173/reset-password?token=abc",
            30,
        )
        .unwrap();
        assert!(reset.html_body.contains("reset-password?token=abc"));
    }
}
